use crate::components::{ComponentId, Signature, TypeExpression, TypeRegistry};
use crate::archetypes::{Archetype, ArchetypeInstance};
use crate::entities::{Mask, Query, QueryData, QueryStore};
use crate::data_structures::StoragePools;
use std::hash::BuildHasherDefault;
use nohash_hasher::NoHashHasher;
use std::collections::{HashMap, HashSet};
use crate::identity::Key;

type Hasher = BuildHasherDefault<NoHashHasher<u64>>;
type Targeted = HashMap<ComponentId, HashSet<TypeExpression, Hasher>, Hasher>;

#[repr(usize)]
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) enum ArchetypeTransitionKind {
	Add = 0,
	Remove = 1,
}

/// Owns every archetype of a world, together with the indices used to find them.
pub(crate) struct ArchetypeStore {
	vec: Vec<ArchetypeInstance>,
	map: HashMap<Signature, Archetype, Hasher>,
	/// Archetypes containing at least one expression of a component type.
	by_type: HashMap<ComponentId, Vec<Archetype>, Hasher>,
	/// Every expression with a relation or link key seen so far, per component type.
	targeted: Targeted,
	/// Archetypes containing a relation to an entity, keyed by the relation key.
	by_target: HashMap<Key, Vec<Archetype>, Hasher>,
	pub(crate) queries: QueryStore,
	pub(crate) types: TypeRegistry,
	pools: StoragePools,
}

impl ArchetypeStore {
	pub fn new(storage_floor: usize) -> Self {
		let mut store = Self {
			vec: Vec::new(),
			map: HashMap::default(),
			by_type: HashMap::default(),
			targeted: HashMap::default(),
			by_target: HashMap::default(),
			queries: QueryStore::default(),
			types: TypeRegistry::new(),
			pools: StoragePools::new(storage_floor),
		};

		let root = store.create(Signature::empty());
		debug_assert_eq!(root, Archetype::ROOT);
		store
	}

	pub fn len(&self) -> usize {
		self.vec.len()
	}

	pub fn get(&self, archetype: Archetype) -> &ArchetypeInstance {
		&self.vec[archetype.index]
	}

	pub fn get_mut(&mut self, archetype: Archetype) -> &mut ArchetypeInstance {
		&mut self.vec[archetype.index]
	}

	pub fn iter(&self) -> impl Iterator<Item = &ArchetypeInstance> {
		self.vec.iter()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ArchetypeInstance> {
		self.vec.iter_mut()
	}

	pub fn find(&self, signature: &Signature) -> Option<Archetype> {
		self.map.get(signature).copied()
	}

	/// Returns the archetype for `signature`, creating it if it doesn't exist yet.
	pub fn get_or_create(&mut self, signature: Signature) -> Archetype {
		match self.find(&signature) {
			Some(archetype) => archetype,
			None => self.create(signature),
		}
	}

	#[inline(never)]
	fn create(&mut self, signature: Signature) -> Archetype {
		let archetype = Archetype { index: self.vec.len() };
		let instance = ArchetypeInstance::new(archetype, signature.clone(), &self.types, &mut self.pools);

		for expression in signature.iter() {
			let tables = self.by_type.entry(expression.id()).or_default();
			if tables.last() != Some(&archetype) {
				tables.push(archetype);
			}

			if !expression.is_plain() {
				self.targeted.entry(expression.id()).or_default().insert(*expression);
			}

			if expression.is_relation() {
				let tables = self.by_target.entry(expression.key()).or_default();
				if tables.last() != Some(&archetype) {
					tables.push(archetype);
				}
			}
		}

		// Match archetype against all queries
		for data in self.queries.iter_mut() {
			if matches(&self.targeted, &data.mask, &signature) {
				data.archetypes.push(archetype);
			}
		}

		log::trace!("created archetype {} with signature {:?}", archetype.index, signature);
		self.map.insert(signature, archetype);
		self.vec.push(instance);
		archetype
	}

	/// Resolves the archetype that differs from `from` by exactly `expression`,
	/// memoizing the result on both archetypes' edges.
	pub fn transition(
		&mut self, from: Archetype, expression: TypeExpression, kind: ArchetypeTransitionKind,
	) -> Archetype {
		let edge = self.vec[from.index].edge(&expression);
		let cached = match kind {
			ArchetypeTransitionKind::Add => edge.add,
			ArchetypeTransitionKind::Remove => edge.remove,
		};

		if let Some(archetype) = cached {
			return archetype;
		}

		let source = self.vec[from.index].signature();
		let signature = match kind {
			ArchetypeTransitionKind::Add => source.add(expression),
			ArchetypeTransitionKind::Remove => source.remove(&expression),
		};

		let to = self.get_or_create(signature);
		match kind {
			ArchetypeTransitionKind::Add => {
				self.vec[from.index].set_edge_add(expression, to);
				self.vec[to.index].set_edge_remove(expression, from);
			},
			ArchetypeTransitionKind::Remove => {
				self.vec[from.index].set_edge_remove(expression, to);
				self.vec[to.index].set_edge_add(expression, from);
			},
		}

		log::trace!("edge {} --{kind:?} {expression}--> {}", from.index, to.index);
		to
	}

	/// Borrows two distinct archetypes mutably.
	pub fn pair_mut(&mut self, a: Archetype, b: Archetype) -> (&mut ArchetypeInstance, &mut ArchetypeInstance) {
		assert_ne!(a, b, "cannot borrow an archetype twice");
		if a.index < b.index {
			let (left, right) = self.vec.split_at_mut(b.index);
			(&mut left[a.index], &mut right[0])
		} else {
			let (left, right) = self.vec.split_at_mut(a.index);
			(&mut right[0], &mut left[b.index])
		}
	}

	/// Borrows an archetype together with the type registry.
	pub fn split_types(&mut self, archetype: Archetype) -> (&mut ArchetypeInstance, &mut TypeRegistry) {
		(&mut self.vec[archetype.index], &mut self.types)
	}

	/// Removes and returns the archetypes registered under the relation key `target`,
	/// forgetting the expressions that carried it.
	pub fn take_target(&mut self, target: Key) -> Vec<Archetype> {
		let tables = self.by_target.remove(&target).unwrap_or_default();
		for archetype in &tables {
			let signature = self.vec[archetype.index].signature();
			for expression in signature.iter().filter(|e| e.key() == target) {
				if let Some(seen) = self.targeted.get_mut(&expression.id()) {
					seen.remove(expression);
				}
			}
		}
		tables
	}

	/// The number of distinct relation and link expressions seen for `id`.
	#[cfg(test)]
	pub fn targeted_len(&self, id: ComponentId) -> usize {
		self.targeted.get(&id).map_or(0, HashSet::len)
	}

	pub fn matches(&self, mask: &Mask, signature: &Signature) -> bool {
		matches(&self.targeted, mask, signature)
	}

	/// Compiles `mask` into a query. Cached compilation returns the existing query for an
	/// equal mask; otherwise a new query is registered and kept up to date.
	#[inline(never)]
	pub fn compile(&mut self, mask: Mask, cached: bool) -> Query {
		if cached {
			if let Some(query) = self.queries.cached(&mask) {
				return query;
			}
		}

		let archetypes = self.collect_matching(&mask);
		log::debug!("compiled query {:?} matching {} archetypes", mask, archetypes.len());
		self.queries.insert(QueryData {
			mask,
			cached,
			archetypes,
		})
	}

	fn collect_matching(&self, mask: &Mask) -> Vec<Archetype> {
		let candidates: Box<dyn Iterator<Item = Archetype> + '_> = match mask.has().first() {
			Some(first) => match self.by_type.get(&first.id()) {
				Some(tables) => Box::new(tables.iter().copied()),
				None => return Vec::new(),
			},
			None => Box::new((0..self.vec.len()).map(|index| Archetype { index })),
		};

		candidates.filter(|a| self.matches(mask, self.vec[a.index].signature())).collect()
	}
}

/// Whether `signature` satisfies `mask`.
///
/// Concrete entries are tested directly. Wildcard entries are expanded through the
/// reverse index of targeted expressions (plus the plain expression when the wildcard
/// admits plain keys), and the signature must overlap that expansion.
fn matches(targeted: &Targeted, mask: &Mask, signature: &Signature) -> bool {
	let overlaps = |pattern: &TypeExpression| match pattern.is_wildcard() {
		false => signature.contains(pattern),
		true => wildcard_candidates(targeted, *pattern).any(|e| signature.contains(&e)),
	};

	mask.has().iter().all(overlaps)
		&& !mask.not().iter().any(overlaps)
		&& (mask.any().is_empty() || mask.any().iter().any(overlaps))
}

fn wildcard_candidates(
	targeted: &Targeted, pattern: TypeExpression,
) -> impl Iterator<Item = TypeExpression> + '_ {
	let key = pattern.key();
	let plain = key.matches(Key::PLAIN).then_some(TypeExpression::plain(pattern.id()));
	let seen = targeted.get(&pattern.id()).into_iter().flatten();

	plain.into_iter().chain(seen.copied().filter(move |e| key.matches(e.key())))
}
