//! Compact 64-bit handles.
//!
//! An [Identity] names a live entity; a [Key] is the secondary discriminator of a
//! [type expression](crate::components::TypeExpression): plain, a relation targeting
//! another entity, a link targeting an external object, or a wildcard used by queries.
//!
//! Both are bit-packed into a `u64`; the layouts are documented on the encode/decode
//! functions so the representation does not depend on the struct layout.

mod identity;
mod key;

pub use identity::*;
pub use key::*;
