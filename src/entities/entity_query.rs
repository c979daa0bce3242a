use crate::components::{Component, TypeExpression};
use crate::error::{EcsError, EcsResult};
use crate::entities::EntityRegistry;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use crate::archetypes::Archetype;
use nohash_hasher::NoHashHasher;
use std::collections::HashMap;
use crate::identity::Key;
use std::fmt;

type NoHash = BuildHasherDefault<NoHashHasher<u64>>;

/// The structural filter of a query.
///
/// An archetype matches if it contains every `has` expression, none of the `not`
/// expressions and, when `any` is non-empty, at least one `any` expression.
/// Entries may carry wildcard keys.
#[derive(Clone, Eq, PartialEq)]
pub struct Mask {
	hash: u64,
	has: Vec<TypeExpression>,
	not: Vec<TypeExpression>,
	any: Vec<TypeExpression>,
}

impl Mask {
	pub fn new(
		has: impl IntoIterator<Item = TypeExpression>, not: impl IntoIterator<Item = TypeExpression>,
		any: impl IntoIterator<Item = TypeExpression>,
	) -> Self {
		let has = normalize(has);
		let not = normalize(not);
		let any = normalize(any);

		let hash = fold(0x243F_6A88_85A3_08D3, &has) ^ fold(0x1319_8A2E_0370_7344, &not).rotate_left(21)
			^ fold(0xA409_3822_299F_31D0, &any).rotate_left(42);

		Self { hash, has, not, any }
	}

	pub fn has(&self) -> &[TypeExpression] {
		&self.has
	}

	pub fn not(&self) -> &[TypeExpression] {
		&self.not
	}

	pub fn any(&self) -> &[TypeExpression] {
		&self.any
	}
}

fn normalize(expressions: impl IntoIterator<Item = TypeExpression>) -> Vec<TypeExpression> {
	let mut expressions = Vec::from_iter(expressions);
	expressions.sort_unstable();
	expressions.dedup();
	expressions
}

fn fold(salt: u64, expressions: &[TypeExpression]) -> u64 {
	expressions
		.iter()
		.fold(salt, |hash, e| (hash.rotate_left(5) ^ e.digest()).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

impl Hash for Mask {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.hash)
	}
}

impl fmt::Debug for Mask {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mask")
			.field("has", &self.has)
			.field("not", &self.not)
			.field("any", &self.any)
			.finish()
	}
}

/// A handle to a compiled query.
///
/// The query's archetype list is kept up to date as new archetypes are created,
/// until the handle is [disposed](EntityRegistry::dispose_query).
#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq)]
pub struct Query {
	index: u32,
	generation: u32,
}

pub(crate) struct QueryData {
	pub(crate) mask: Mask,
	pub(crate) cached: bool,
	/// Matching archetypes in creation order.
	pub(crate) archetypes: Vec<Archetype>,
}

#[derive(Default)]
pub(crate) struct QueryStore {
	slots: Vec<Option<QueryData>>,
	generations: Vec<u32>,
	free: Vec<u32>,
	cache: HashMap<Mask, Query, NoHash>,
}

impl QueryStore {
	pub fn cached(&self, mask: &Mask) -> Option<Query> {
		self.cache.get(mask).copied()
	}

	pub fn insert(&mut self, data: QueryData) -> Query {
		let index = match self.free.pop() {
			Some(index) => index as usize,
			None => {
				self.slots.push(None);
				self.generations.push(0);
				self.slots.len() - 1
			},
		};

		let query = Query {
			index: index as u32,
			generation: self.generations[index],
		};

		if data.cached {
			self.cache.insert(data.mask.clone(), query);
		}

		self.slots[index] = Some(data);
		query
	}

	pub fn get(&self, query: Query) -> EcsResult<&QueryData> {
		let index = query.index as usize;
		match self.generations.get(index) {
			Some(generation) if *generation == query.generation => {
				self.slots[index].as_ref().ok_or(EcsError::StaleQuery)
			},
			_ => Err(EcsError::StaleQuery),
		}
	}

	pub fn remove(&mut self, query: Query) -> EcsResult<QueryData> {
		self.get(query)?;

		let index = query.index as usize;
		let data = self.slots[index].take().ok_or(EcsError::StaleQuery)?;
		if data.cached {
			self.cache.remove(&data.mask);
		}

		self.generations[index] = self.generations[index].wrapping_add(1);
		self.free.push(query.index);
		Ok(data)
	}

	pub fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueryData> {
		self.slots.iter_mut().flatten()
	}
}

/// A utility structure to build [queries](Query).
///
/// The builder validates its terms as they are added: listing an expression twice, or
/// in both `has` and `not`, is recorded as a [ConflictingTerm](EcsError::ConflictingTerm)
/// and reported by [compile](QueryBuilder::compile) or [unique](QueryBuilder::unique).
pub struct QueryBuilder<'l> {
	registry: &'l mut EntityRegistry,
	has: Vec<TypeExpression>,
	not: Vec<TypeExpression>,
	any: Vec<TypeExpression>,
	checked: bool,
	error: Option<EcsError>,
}

impl<'l> QueryBuilder<'l> {
	pub(crate) fn new(registry: &'l mut EntityRegistry) -> Self {
		Self {
			registry,
			has: Vec::new(),
			not: Vec::new(),
			any: Vec::new(),
			checked: true,
			error: None,
		}
	}

	/// Disables term validation; duplicates are silently merged.
	pub fn unchecked(mut self) -> Self {
		self.checked = false;
		self.error = None;
		self
	}

	/// Requires a component of type `T` under `key`, which may be a wildcard.
	pub fn has<T: Component>(mut self, key: Key) -> Self {
		let expression = self.expression::<T>(key);
		self.has_expression(expression)
	}

	/// Excludes archetypes with a component of type `T` under `key`.
	pub fn not<T: Component>(mut self, key: Key) -> Self {
		let expression = self.expression::<T>(key);
		self.not_expression(expression)
	}

	/// Requires at least one of the `any` terms to be present.
	pub fn any<T: Component>(mut self, key: Key) -> Self {
		let expression = self.expression::<T>(key);
		self.any_expression(expression)
	}

	pub fn has_expression(mut self, expression: TypeExpression) -> Self {
		let conflict = self.has.contains(&expression) || self.not.contains(&expression);
		self.check(conflict, expression);
		self.has.push(expression);
		self
	}

	pub fn not_expression(mut self, expression: TypeExpression) -> Self {
		let conflict = self.not.contains(&expression) || self.has.contains(&expression);
		self.check(conflict, expression);
		self.not.push(expression);
		self
	}

	pub fn any_expression(mut self, expression: TypeExpression) -> Self {
		let conflict = self.any.contains(&expression);
		self.check(conflict, expression);
		self.any.push(expression);
		self
	}

	/// Compiles the query, returning the existing handle if an identical one was compiled before.
	pub fn compile(self) -> EcsResult<Query> {
		self.finish(true)
	}

	/// Compiles the query into a new handle that is never shared.
	pub fn unique(self) -> EcsResult<Query> {
		self.finish(false)
	}

	fn expression<T: Component>(&mut self, key: Key) -> TypeExpression {
		TypeExpression::new(self.registry.register::<T>(), key)
	}

	fn check(&mut self, conflict: bool, expression: TypeExpression) {
		if conflict && self.checked && self.error.is_none() {
			self.error = Some(EcsError::ConflictingTerm(expression));
		}
	}

	fn finish(self, cached: bool) -> EcsResult<Query> {
		if let Some(error) = self.error {
			return Err(error);
		}

		let mask = Mask::new(self.has, self.not, self.any);
		Ok(self.registry.archetypes.compile(mask, cached))
	}
}
