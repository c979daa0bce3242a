//! Entities are plain [identities](crate::identity::Identity); the [EntityRegistry] decides
//! which archetype row holds their components.
//!
//! Structural changes made while the registry is [locked](EntityRegistry::lock) are queued
//! and applied in call order when the last lock is released.

mod deferred;
mod entity_query;
mod entity_registry;
mod entity_instance;

pub use deferred::{Commands, WorldLock};
pub use entity_query::*;
pub use entity_registry::*;

pub(crate) use deferred::{check_concrete, DeferredOperation};
pub(crate) use entity_instance::*;
