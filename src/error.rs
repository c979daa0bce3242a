use crate::components::TypeExpression;
use crate::identity::{Identity, Key};
use thiserror::Error;

pub type EcsResult<T> = Result<T, EcsError>;

/// Errors reported by structural mutations, reads and query compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
	/// The entity's archetype already contains the expression.
	#[error("entity {entity} already has component {expression}")]
	DuplicateComponent { entity: Identity, expression: TypeExpression },

	/// The entity's archetype does not contain the expression.
	#[error("entity {entity} does not have component {expression}")]
	MissingComponent { entity: Identity, expression: TypeExpression },

	#[error("index {index} out of range (length {len})")]
	IndexOutOfRange { index: usize, len: usize },

	/// The handle's generation no longer matches the live entity at its index.
	#[error("stale or dead entity handle {0}")]
	StaleHandle(Identity),

	/// A structural change was attempted on an archetype that is being enumerated.
	#[error("archetype {archetype} is being enumerated; lock the world to defer structural changes")]
	IteratorInvalidated { archetype: usize },

	/// Components can only be stored under concrete keys.
	#[error("cannot store a component under wildcard key {0}")]
	WildcardKey(Key),

	/// A mask lists the same expression twice, or in both `has` and `not`.
	#[error("conflicting query term {0}")]
	ConflictingTerm(TypeExpression),

	/// Two stream terms resolved to the same column and at least one of them writes.
	#[error("stream terms alias column {0}")]
	AliasedColumn(TypeExpression),

	/// The component type has never been used by this world.
	#[error("component type {0} is not registered with this world")]
	UnknownComponent(String),

	#[error("query handle has been disposed")]
	StaleQuery,

	/// A boxed value did not match the element type of its column.
	#[error("value does not match the element type of column {expected}")]
	TypeMismatch { expected: &'static str },
}
