mod pool;
mod storage;
mod any_storage;

pub use pool::*;
pub use storage::*;
pub use any_storage::*;
