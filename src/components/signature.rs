use crate::components::TypeExpression;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use std::fmt;

/// An immutable, sorted and de-duplicated set of [type expressions](TypeExpression).
///
/// A signature is the identity of an archetype. Every operation returns a new signature;
/// clones share the underlying buffer. The hash is a wrapping sum of the element digests,
/// so equal sets hash the same no matter how they were assembled.
#[derive(Clone)]
pub struct Signature {
	hash: u64,
	expressions: Arc<[TypeExpression]>,
}

impl Signature {
	pub fn empty() -> Self {
		Self::from_sorted(Vec::new())
	}

	pub fn new(expressions: impl IntoIterator<Item = TypeExpression>) -> Self {
		let mut expressions = Vec::from_iter(expressions);
		expressions.sort_unstable();
		expressions.dedup();
		Self::from_sorted(expressions)
	}

	fn from_sorted(expressions: Vec<TypeExpression>) -> Self {
		let hash = expressions.iter().fold(0u64, |hash, e| hash.wrapping_add(e.digest()));
		Self {
			hash,
			expressions: expressions.into(),
		}
	}

	pub fn as_slice(&self) -> &[TypeExpression] {
		&self.expressions
	}

	pub fn contains(&self, expression: &TypeExpression) -> bool {
		self.expressions.binary_search(expression).is_ok()
	}

	/// The position of `expression` in sort order, which is also its column index.
	pub fn position(&self, expression: &TypeExpression) -> Option<usize> {
		self.expressions.binary_search(expression).ok()
	}

	/// Whether any element satisfies `pattern`, which may carry a wildcard key.
	pub fn matches(&self, pattern: &TypeExpression) -> bool {
		self.first_match(pattern).is_some()
	}

	/// The position of the first element satisfying `pattern`.
	pub fn first_match(&self, pattern: &TypeExpression) -> Option<usize> {
		if !pattern.is_wildcard() {
			return self.position(pattern);
		}

		let start = self.expressions.partition_point(|e| e.id() < pattern.id());
		self.expressions[start..]
			.iter()
			.take_while(|e| e.id() == pattern.id())
			.position(|e| pattern.matches(*e))
			.map(|i| start + i)
	}

	pub fn add(&self, expression: TypeExpression) -> Self {
		match self.expressions.binary_search(&expression) {
			Ok(_) => self.clone(),
			Err(index) => {
				let mut expressions = self.expressions.to_vec();
				expressions.insert(index, expression);
				Self::from_sorted(expressions)
			},
		}
	}

	pub fn remove(&self, expression: &TypeExpression) -> Self {
		match self.expressions.binary_search(expression) {
			Err(_) => self.clone(),
			Ok(index) => {
				let mut expressions = self.expressions.to_vec();
				expressions.remove(index);
				Self::from_sorted(expressions)
			},
		}
	}

	pub fn union(&self, other: &[TypeExpression]) -> Self {
		Self::new(self.expressions.iter().chain(other.iter()).copied())
	}

	pub fn except(&self, other: &[TypeExpression]) -> Self {
		let expressions = self.expressions.iter().filter(|e| !other.contains(e)).copied();
		Self::from_sorted(expressions.collect())
	}

	pub fn is_subset_of(&self, other: &[TypeExpression]) -> bool {
		self.expressions.iter().all(|e| other.contains(e))
	}

	pub fn is_superset_of(&self, other: &[TypeExpression]) -> bool {
		other.iter().all(|e| self.contains(e))
	}

	pub fn overlaps(&self, other: &[TypeExpression]) -> bool {
		other.iter().any(|e| self.contains(e))
	}
}

impl Default for Signature {
	fn default() -> Self {
		Self::empty()
	}
}

impl Deref for Signature {
	type Target = [TypeExpression];

	#[inline(always)]
	fn deref(&self) -> &Self::Target {
		&self.expressions
	}
}

impl Eq for Signature {}

impl PartialEq<Self> for Signature {
	fn eq(&self, other: &Self) -> bool {
		(self.hash == other.hash) && (self.expressions == other.expressions)
	}
}

impl Hash for Signature {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.hash)
	}
}

impl FromIterator<TypeExpression> for Signature {
	fn from_iter<I: IntoIterator<Item = TypeExpression>>(iter: I) -> Self {
		Self::new(iter)
	}
}

impl fmt::Debug for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.expressions.iter()).finish()
	}
}
