use crate::components::{Component, Signature, TypeExpression, TypeRegistry};
use crate::data_structures::{AnyStorage, Storage, StoragePools};
use crate::error::{EcsError, EcsResult};
use std::hash::BuildHasherDefault;
use nohash_hasher::NoHashHasher;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use crate::identity::Identity;

type Hasher = BuildHasherDefault<NoHashHasher<u64>>;

/// A handle to an [archetype](ArchetypeInstance) owned by a world.
#[derive(Default, Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone, Debug)]
pub struct Archetype {
	pub(crate) index: usize,
}

impl Archetype {
	/// The archetype with an empty signature; every entity is spawned into it.
	pub const ROOT: Archetype = Archetype { index: 0 };

	pub const fn index(&self) -> usize {
		self.index
	}
}

/// Cached transitions to the archetypes that differ by exactly one type expression.
#[derive(Default, Copy, Clone, Debug)]
pub struct Edge {
	pub add: Option<Archetype>,
	pub remove: Option<Archetype>,
}

/// The storage of every entity sharing one exact [Signature].
///
/// Holds the entity identities and one column per type expression, in signature order.
/// Row `i` of every column belongs to `entities()[i]`.
pub struct ArchetypeInstance {
	id: Archetype,
	signature: Signature,
	floor: usize,
	capacity: usize,
	enumerators: u32,
	entities: Vec<Identity>,
	columns: Vec<Box<dyn AnyStorage>>,
	edges: HashMap<TypeExpression, Edge, Hasher>,
}

impl ArchetypeInstance {
	pub(crate) fn new(
		id: Archetype, signature: Signature, types: &TypeRegistry, pools: &mut StoragePools,
	) -> Self {
		let columns = signature
			.iter()
			.map(|e| match types.get(e.id()) {
				Some(t) => t.make_storage(pools),
				None => unreachable!("archetype column {e} has no registered component type"),
			})
			.collect();

		let floor = pools.floor();
		Self {
			id,
			floor,
			columns,
			signature,
			capacity: floor,
			enumerators: 0,
			edges: HashMap::default(),
			entities: Vec::with_capacity(floor),
		}
	}

	pub fn id(&self) -> Archetype {
		self.id
	}

	pub fn signature(&self) -> &Signature {
		&self.signature
	}

	pub fn entities(&self) -> &[Identity] {
		&self.entities
	}

	pub fn len(&self) -> usize {
		self.entities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Marks the archetype as being enumerated; structural changes fail until the
	/// matching [ArchetypeInstance::end_enumeration].
	pub fn begin_enumeration(&mut self) {
		self.enumerators += 1;
	}

	pub fn end_enumeration(&mut self) {
		debug_assert!(self.enumerators > 0, "unbalanced end_enumeration");
		self.enumerators = self.enumerators.saturating_sub(1);
	}

	pub fn is_enumerating(&self) -> bool {
		self.enumerators > 0
	}

	fn check_mutable(&self) -> EcsResult<()> {
		match self.is_enumerating() {
			true => Err(EcsError::IteratorInvalidated { archetype: self.id.index }),
			false => Ok(()),
		}
	}

	fn check_row(&self, row: usize) -> EcsResult<()> {
		match row < self.len() {
			true => Ok(()),
			false => Err(EcsError::IndexOutOfRange {
				index: row,
				len: self.len(),
			}),
		}
	}

	/// Grows the identity vector and every column together.
	pub fn ensure_capacity(&mut self, capacity: usize) {
		if capacity <= self.capacity {
			return;
		}

		let capacity = capacity.next_power_of_two();
		self.entities.reserve_exact(capacity - self.entities.len());
		for column in self.columns.iter_mut() {
			column.ensure_capacity(capacity);
		}
		self.capacity = capacity;
	}

	/// Shrinks the identity vector and every column to the smallest fitting power of two.
	pub fn compact(&mut self) {
		let capacity = usize::max(self.floor, self.len()).next_power_of_two();
		if capacity >= self.capacity {
			return;
		}

		self.entities.shrink_to(capacity);
		for column in self.columns.iter_mut() {
			column.compact();
		}
		self.capacity = capacity;
	}

	/// Appends `identity` and returns its row.
	/// The caller must populate every column for the new row before anyone observes it.
	pub fn add_row(&mut self, identity: Identity) -> EcsResult<usize> {
		self.check_mutable()?;
		let row = self.entities.len();
		if row == self.capacity {
			self.ensure_capacity(self.capacity * 2);
		}

		self.entities.push(identity);
		Ok(row)
	}

	/// Swap-fills `row` from the last row across identities and columns.
	/// Returns the identity that now occupies `row`, if any entity was moved.
	pub fn remove_row(&mut self, row: usize) -> EcsResult<Option<Identity>> {
		self.check_mutable()?;
		self.check_row(row)?;

		for column in self.columns.iter_mut() {
			column.delete(row, 1);
		}
		self.entities.swap_remove(row);
		Ok(self.entities.get(row).copied())
	}

	/// Moves `row` into `into`, carrying over every column both archetypes share and
	/// dropping the ones `into` lacks.
	///
	/// Returns the row in `into` and the identity that was swapped into `row` here.
	/// Columns present only in `into` are left one entry short and must be written next.
	pub fn move_row(
		&mut self, row: usize, into: &mut ArchetypeInstance,
	) -> EcsResult<(usize, Option<Identity>)> {
		self.check_mutable()?;
		into.check_mutable()?;
		self.check_row(row)?;

		let new_row = into.add_row(self.entities[row])?;
		for (expression, column) in self.signature.iter().zip(self.columns.iter_mut()) {
			match into.signature.position(expression) {
				Some(i) => column.move_one(row, into.columns[i].as_mut())?,
				None => column.delete(row, 1),
			}
		}

		self.entities.swap_remove(row);
		Ok((new_row, self.entities.get(row).copied()))
	}

	/// Moves every row into `into`, whose signature must be a subset of this one.
	/// This archetype is left empty and shrunk back to its floor capacity.
	/// Returns the first row the moved entities occupy in `into`.
	pub fn migrate(&mut self, into: &mut ArchetypeInstance) -> EcsResult<usize> {
		self.check_mutable()?;
		into.check_mutable()?;
		debug_assert!(into.signature.is_subset_of(&self.signature));

		let start = into.len();
		into.ensure_capacity(start + self.len());
		for (expression, column) in self.signature.iter().zip(self.columns.iter_mut()) {
			match into.signature.position(expression) {
				Some(i) => column.migrate(into.columns[i].as_mut())?,
				None => column.clear(),
			}
		}

		into.entities.append(&mut self.entities);
		self.entities = Vec::with_capacity(self.floor);
		self.capacity = self.floor;
		Ok(start)
	}

	pub fn edge(&self, expression: &TypeExpression) -> Edge {
		self.edges.get(expression).copied().unwrap_or_default()
	}

	pub(crate) fn set_edge_add(&mut self, expression: TypeExpression, archetype: Archetype) {
		self.edges.entry(expression).or_default().add = Some(archetype);
	}

	pub(crate) fn set_edge_remove(&mut self, expression: TypeExpression, archetype: Archetype) {
		self.edges.entry(expression).or_default().remove = Some(archetype);
	}

	pub fn column<T: Component>(&self, expression: &TypeExpression) -> Option<&[T]> {
		Some(self.storage::<T>(expression)?.as_slice())
	}

	pub fn column_mut<T: Component>(&mut self, expression: &TypeExpression) -> Option<&mut [T]> {
		Some(self.storage_mut::<T>(expression)?.as_mut_slice())
	}

	/// The column of the first expression satisfying `pattern`, which may use a wildcard key.
	pub fn storage<T: Component>(&self, pattern: &TypeExpression) -> Option<&Storage<T>> {
		let index = self.signature.first_match(pattern)?;
		self.columns[index].as_any().downcast_ref::<Storage<T>>()
	}

	pub fn storage_mut<T: Component>(&mut self, pattern: &TypeExpression) -> Option<&mut Storage<T>> {
		let index = self.signature.first_match(pattern)?;
		self.columns[index].as_any_mut().downcast_mut::<Storage<T>>()
	}

	pub(crate) fn column_at_mut(&mut self, index: usize) -> &mut dyn AnyStorage {
		self.columns[index].as_mut()
	}

	pub(crate) fn columns_ptr(&mut self) -> *mut Box<dyn AnyStorage> {
		self.columns.as_mut_ptr()
	}

	pub fn get_component<T: Component>(&self, pattern: &TypeExpression, row: usize) -> Option<&T> {
		self.storage::<T>(pattern)?.as_slice().get(row)
	}

	pub fn get_component_mut<T: Component>(&mut self, pattern: &TypeExpression, row: usize) -> Option<&mut T> {
		self.storage_mut::<T>(pattern)?.as_mut_slice().get_mut(row)
	}

	/// Whether every column holds exactly one entry per entity.
	pub fn is_consistent(&self) -> bool {
		self.columns.iter().all(|c| c.len() == self.entities.len())
	}
}

/// Keeps an archetype marked as enumerated until dropped, unwinding included.
pub(crate) struct EnumerationGuard<'t> {
	table: &'t mut ArchetypeInstance,
}

impl<'t> EnumerationGuard<'t> {
	pub fn new(table: &'t mut ArchetypeInstance) -> Self {
		table.begin_enumeration();
		Self { table }
	}
}

impl Deref for EnumerationGuard<'_> {
	type Target = ArchetypeInstance;

	#[inline(always)]
	fn deref(&self) -> &Self::Target {
		self.table
	}
}

impl DerefMut for EnumerationGuard<'_> {
	#[inline(always)]
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.table
	}
}

impl Drop for EnumerationGuard<'_> {
	fn drop(&mut self) {
		self.table.end_enumeration();
	}
}
