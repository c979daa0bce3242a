use crate::components::ComponentId;
use crate::identity::{Identity, Key};
use std::hash::{Hash, Hasher};
use std::fmt;

/// A component type paired with a [Key]; the unit archetypes are composed of.
///
/// Two expressions are equal only if both the type and the key match exactly.
/// Wildcard keys are only meaningful as query patterns, see [TypeExpression::matches].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct TypeExpression {
	id: ComponentId,
	key: Key,
}

impl TypeExpression {
	#[inline(always)]
	pub const fn new(id: ComponentId, key: Key) -> Self {
		Self { id, key }
	}

	#[inline(always)]
	pub const fn plain(id: ComponentId) -> Self {
		Self::new(id, Key::PLAIN)
	}

	#[inline(always)]
	pub const fn relation(id: ComponentId, target: Identity) -> Self {
		Self::new(id, Key::entity(target))
	}

	#[inline(always)]
	pub const fn id(&self) -> ComponentId {
		self.id
	}

	#[inline(always)]
	pub const fn key(&self) -> Key {
		self.key
	}

	pub const fn with_key(&self, key: Key) -> Self {
		Self::new(self.id, key)
	}

	pub const fn is_plain(&self) -> bool {
		self.key.is_plain()
	}

	pub const fn is_relation(&self) -> bool {
		self.key.is_relation()
	}

	pub const fn is_link(&self) -> bool {
		self.key.is_link()
	}

	pub const fn is_wildcard(&self) -> bool {
		self.key.is_wildcard()
	}

	/// Whether `candidate` satisfies `self` used as a pattern.
	pub const fn matches(&self, candidate: TypeExpression) -> bool {
		self.id.value() == candidate.id.value() && self.key.matches(candidate.key)
	}

	/// A well-mixed 64-bit digest, also used as the expression's hash.
	#[inline(always)]
	pub(crate) const fn digest(&self) -> u64 {
		let key = self.key.raw().wrapping_mul(0x9E37_79B9_7F4A_7C15);
		(key ^ (key >> 29)) ^ (self.id.value() as u64 + 1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
	}
}

impl Hash for TypeExpression {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.digest())
	}
}

impl fmt::Display for TypeExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}<{}>", self.id, self.key)
	}
}

impl fmt::Debug for TypeExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeExpression({self})")
	}
}
