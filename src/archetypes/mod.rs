//! [Archetypes](Archetype) group every entity sharing one exact
//! [Signature](crate::components::Signature) into a table of columns.
//!
//! Tables are linked by memoized add/remove edges, and [streams](Stream) read their
//! columns as typed slices.

mod archetype_stream;
mod archetype_instance;
mod archetype_registry;

pub use archetype_stream::*;
pub use archetype_instance::{Archetype, ArchetypeInstance, Edge};
pub(crate) use archetype_instance::EnumerationGuard;

pub(crate) use archetype_registry::*;
