use std::collections::hash_map::DefaultHasher;
use crate::components::ComponentId;
use crate::identity::Identity;
use std::hash::{Hash, Hasher};
use std::fmt;

const CATEGORY_SHIFT: u32 = 60;
const PAYLOAD_MASK: u64 = (1 << CATEGORY_SHIFT) - 1;

const CATEGORY_PLAIN: u64 = 0x0;
const CATEGORY_ENTITY: u64 = 0x1;
const CATEGORY_LINK: u64 = 0x2;
const CATEGORY_WILDCARD: u64 = 0xF;

const WILDCARD_ANY: u64 = 1;
const WILDCARD_TARGET: u64 = 2;
const WILDCARD_ENTITY: u64 = 3;
const WILDCARD_LINK: u64 = 4;

const LINK_HASH_MASK: u64 = 0xFFFF_FFFF;
const LINK_BACKING_SHIFT: u32 = 32;

/// The category of a [Key], stored in bits 60..64.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyCategory {
	Plain,
	Entity,
	Link,
	Wildcard,
}

/// A decoded [Key].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyKind {
	Plain,
	/// A relation targeting an entity.
	Entity(Identity),
	/// A link to an external object, identified by its hash and the component type backing it.
	Link { hash: u32, backing: ComponentId },
	/// Wildcard: every key.
	Any,
	/// Wildcard: every key except [KeyKind::Plain].
	Target,
	/// Wildcard: every relation key.
	AnyEntity,
	/// Wildcard: every link key.
	AnyLink,
}

/// Packs a category and a 60-bit payload.
///
/// | category | payload                                                   |
/// |----------|-----------------------------------------------------------|
/// | `0x0`    | none, the raw value is zero                               |
/// | `0x1`    | the target's identity bits (index 0..32, generation 32..48) |
/// | `0x2`    | object hash in 0..32, backing component id in 32..48       |
/// | `0xF`    | 1 = Any, 2 = Target, 3 = Entity, 4 = Link                 |
#[inline(always)]
pub const fn encode_key(category: u64, payload: u64) -> u64 {
	(category << CATEGORY_SHIFT) | (payload & PAYLOAD_MASK)
}

/// Splits a raw key into its category bits and payload.
#[inline(always)]
pub const fn decode_key(raw: u64) -> (u64, u64) {
	(raw >> CATEGORY_SHIFT, raw & PAYLOAD_MASK)
}

/// Secondary discriminator of a [TypeExpression](crate::components::TypeExpression).
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Key {
	raw: u64,
}

impl Key {
	pub const PLAIN: Key = Key { raw: 0 };
	/// Matches every key, plain or targeted.
	pub const ANY: Key = Key::wildcard(WILDCARD_ANY);
	/// Matches every key that has a target.
	pub const TARGET: Key = Key::wildcard(WILDCARD_TARGET);
	/// Matches every entity relation.
	pub const ENTITY: Key = Key::wildcard(WILDCARD_ENTITY);
	/// Matches every object link.
	pub const LINK: Key = Key::wildcard(WILDCARD_LINK);

	const fn wildcard(which: u64) -> Self {
		Self {
			raw: encode_key(CATEGORY_WILDCARD, which),
		}
	}

	/// A relation key targeting `target`.
	#[inline(always)]
	pub const fn entity(target: Identity) -> Self {
		Self {
			raw: encode_key(CATEGORY_ENTITY, target.raw()),
		}
	}

	/// A link key for `object`, stored in a column of component type `backing`.
	pub fn link<O: Hash + ?Sized>(object: &O, backing: ComponentId) -> Self {
		let mut hasher = DefaultHasher::new();
		object.hash(&mut hasher);
		let hash = hasher.finish();
		Self::link_from_hash((hash ^ (hash >> 32)) as u32, backing)
	}

	pub const fn link_from_hash(hash: u32, backing: ComponentId) -> Self {
		let payload = (hash as u64) | ((backing.value() as u64) << LINK_BACKING_SHIFT);
		Self {
			raw: encode_key(CATEGORY_LINK, payload),
		}
	}

	#[inline(always)]
	pub const fn raw(&self) -> u64 {
		self.raw
	}

	pub const fn category(&self) -> KeyCategory {
		match decode_key(self.raw).0 {
			CATEGORY_PLAIN => KeyCategory::Plain,
			CATEGORY_ENTITY => KeyCategory::Entity,
			CATEGORY_LINK => KeyCategory::Link,
			_ => KeyCategory::Wildcard,
		}
	}

	/// Decodes the key into its category and payload.
	pub fn decode(&self) -> KeyKind {
		let (category, payload) = decode_key(self.raw);
		match category {
			CATEGORY_ENTITY => KeyKind::Entity(Identity::from_raw(payload)),
			CATEGORY_LINK => KeyKind::Link {
				hash: (payload & LINK_HASH_MASK) as u32,
				backing: ComponentId::new((payload >> LINK_BACKING_SHIFT) as u16),
			},
			CATEGORY_WILDCARD => match payload {
				WILDCARD_ANY => KeyKind::Any,
				WILDCARD_TARGET => KeyKind::Target,
				WILDCARD_ENTITY => KeyKind::AnyEntity,
				_ => KeyKind::AnyLink,
			},
			_ => KeyKind::Plain,
		}
	}

	#[inline(always)]
	pub const fn is_plain(&self) -> bool {
		self.raw == 0
	}

	#[inline(always)]
	pub const fn is_relation(&self) -> bool {
		decode_key(self.raw).0 == CATEGORY_ENTITY
	}

	#[inline(always)]
	pub const fn is_link(&self) -> bool {
		decode_key(self.raw).0 == CATEGORY_LINK
	}

	#[inline(always)]
	pub const fn is_wildcard(&self) -> bool {
		decode_key(self.raw).0 == CATEGORY_WILDCARD
	}

	/// The entity targeted by a relation key.
	pub const fn target(&self) -> Option<Identity> {
		match self.is_relation() {
			true => Some(Identity::from_raw(decode_key(self.raw).1)),
			false => None,
		}
	}

	/// Whether `candidate` satisfies `self` used as a pattern.
	/// Matching is not commutative: wildcards only act on the pattern side.
	pub const fn matches(&self, candidate: Key) -> bool {
		match self.raw {
			raw if raw == Key::ANY.raw => true,
			raw if raw == Key::TARGET.raw => !candidate.is_plain(),
			raw if raw == Key::ENTITY.raw => candidate.is_relation(),
			raw if raw == Key::LINK.raw => candidate.is_link(),
			raw => raw == candidate.raw,
		}
	}
}

impl From<Identity> for Key {
	fn from(target: Identity) -> Self {
		Key::entity(target)
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.decode() {
			KeyKind::Plain => f.write_str("plain"),
			KeyKind::Entity(target) => write!(f, "{target}"),
			KeyKind::Link { hash, backing } => write!(f, "L{hash:08x}:{}", backing.value()),
			KeyKind::Any => f.write_str("*any"),
			KeyKind::Target => f.write_str("*target"),
			KeyKind::AnyEntity => f.write_str("*entity"),
			KeyKind::AnyLink => f.write_str("*link"),
		}
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Key({self})")
	}
}
