use std::fmt;

const INDEX_MASK: u64 = 0xFFFF_FFFF;
const GENERATION_SHIFT: u32 = 32;
const GENERATION_MASK: u64 = 0xFFFF << GENERATION_SHIFT;

/// Packs an entity index and generation.
///
/// | bits   | field      |
/// |--------|------------|
/// | 0..32  | index      |
/// | 32..48 | generation |
/// | 48..64 | zero       |
#[inline(always)]
pub const fn encode_identity(index: u32, generation: u16) -> u64 {
	(index as u64) | ((generation as u64) << GENERATION_SHIFT)
}

/// Inverse of [encode_identity]. Bits above 48 are ignored.
#[inline(always)]
pub const fn decode_identity(raw: u64) -> (u32, u16) {
	((raw & INDEX_MASK) as u32, ((raw & GENERATION_MASK) >> GENERATION_SHIFT) as u16)
}

/// A unique handle to an entity.
///
/// Handles stay valid until the entity is despawned; the index is then recycled with
/// an advanced generation, which invalidates every handle still holding the old one.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Identity {
	raw: u64,
}

impl Identity {
	/// The null handle. Generation zero is never handed out, so it never refers to a live entity.
	pub const NONE: Identity = Identity { raw: 0 };

	#[inline(always)]
	pub const fn new(index: u32, generation: u16) -> Self {
		Self {
			raw: encode_identity(index, generation),
		}
	}

	#[inline(always)]
	pub(crate) const fn from_raw(raw: u64) -> Self {
		Self {
			raw: raw & (INDEX_MASK | GENERATION_MASK),
		}
	}

	#[inline(always)]
	pub const fn raw(&self) -> u64 {
		self.raw
	}

	#[inline(always)]
	pub const fn index(&self) -> u32 {
		decode_identity(self.raw).0
	}

	#[inline(always)]
	pub const fn generation(&self) -> u16 {
		decode_identity(self.raw).1
	}

	pub const fn is_none(&self) -> bool {
		self.generation() == 0
	}

	/// The handle that will be issued next for this index.
	/// Generations wrap around but skip zero.
	pub const fn successor(&self) -> Self {
		Self::new(self.index(), next_generation(self.generation()))
	}
}

#[inline(always)]
pub(crate) const fn next_generation(generation: u16) -> u16 {
	match generation.wrapping_add(1) {
		0 => 1,
		next => next,
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "E{}v{}", self.index(), self.generation())
	}
}

impl fmt::Debug for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Identity({self})")
	}
}
