//! Component types and the expressions that compose an archetype.
//!
//! A [Component] is any `'static + Send + Sync + Clone` type marked with
//! `#[derive(Component)]`. Each world assigns its component types a [ComponentId]
//! on first use; pairing that id with a [Key](crate::identity::Key) yields a
//! [TypeExpression], and a sorted set of expressions is a [Signature].

mod signature;
mod component_id;
mod component_type;
mod type_expression;

pub use signature::*;
pub use component_id::*;
pub use component_type::*;
pub use type_expression::*;
pub use tessera_ecs_derive::Component;
