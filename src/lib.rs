extern crate self as tessera_ecs;

pub mod data_structures;
pub mod components;
pub mod archetypes;
pub mod identity;
pub mod entities;
mod context;
mod error;

pub use context::{World, WorldConfig};
pub use error::{EcsError, EcsResult};

pub mod prelude {
	pub use crate::components::*;
	pub use crate::identity::{Identity, Key};
	pub use crate::context::{World, WorldConfig};
	pub use crate::error::{EcsError, EcsResult};
	pub use crate::archetypes::{Archetype, Read, Write};
	pub use crate::entities::{Commands, EntityRegistry, Query, QueryBuilder, WorldLock};
}

#[cfg(test)]
mod tests;
