use crate::archetypes::{check_aliasing, Access, Archetype, ArchetypeInstance, ArchetypeStore, ArchetypeTransitionKind, EnumerationGuard, Stream};
use crate::components::{Component, ComponentId, Signature, TypeExpression};
use crate::entities::{check_concrete, Commands, DeferredOperation, EntityInstanceVec, Query, QueryBuilder, WorldLock};
use crate::data_structures::{AnyStorage, Storage, DEFAULT_STORAGE_FLOOR};
use crate::error::{EcsError, EcsResult};
use crate::identity::{Identity, Key};
use std::collections::VecDeque;
use std::any::{Any, TypeId};
use rayon::prelude::*;
use std::hash::Hash;

/// A container for entities and their associated [components](Component).
///
/// Every entity lives in exactly one [archetype](ArchetypeInstance), the one whose signature
/// equals the set of type expressions attached to it. Adding or removing an expression moves
/// the entity's row to the neighbouring archetype.
pub struct EntityRegistry {
	entities: EntityInstanceVec,
	pub(crate) archetypes: ArchetypeStore,
	locks: u32,
	deferred: VecDeque<DeferredOperation>,
}

impl EntityRegistry {
	pub fn new() -> Self {
		Self::with_capacity(0, DEFAULT_STORAGE_FLOOR)
	}

	/// Creates a registry with room for `entity_capacity` entities and columns no smaller
	/// than `storage_floor` (rounded up to a power of two).
	pub fn with_capacity(entity_capacity: usize, storage_floor: usize) -> Self {
		Self {
			entities: EntityInstanceVec::with_capacity(entity_capacity),
			archetypes: ArchetypeStore::new(storage_floor),
			locks: 0,
			deferred: VecDeque::new(),
		}
	}

	/// The number of live entities.
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_alive(&self, entity: Identity) -> bool {
		self.entities.is_alive(entity)
	}

	pub fn archetype_of(&self, entity: Identity) -> Option<Archetype> {
		Some(self.entities.get(entity)?.archetype)
	}

	/// The archetype and row holding `entity`'s components.
	pub fn location(&self, entity: Identity) -> Option<(Archetype, usize)> {
		let instance = self.entities.get(entity)?;
		Some((instance.archetype, instance.row))
	}

	pub fn signature_of(&self, entity: Identity) -> Option<&Signature> {
		Some(self.archetypes.get(self.archetype_of(entity)?).signature())
	}

	pub fn archetype(&self, archetype: Archetype) -> &ArchetypeInstance {
		self.archetypes.get(archetype)
	}

	pub fn archetype_count(&self) -> usize {
		self.archetypes.len()
	}

	pub fn archetypes(&self) -> impl Iterator<Item = &ArchetypeInstance> {
		self.archetypes.iter()
	}

	/// Assigns `T` a [ComponentId] in this registry, or returns the one it already has.
	pub fn register<T: Component>(&mut self) -> ComponentId {
		self.archetypes.types.register::<T>()
	}

	pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
		self.archetypes.types.id_of::<T>()
	}

	fn known_id<T: Component>(&self) -> EcsResult<ComponentId> {
		self.component_id::<T>()
			.ok_or_else(|| EcsError::UnknownComponent(std::any::type_name::<T>().to_string()))
	}

	/// Creates an entity with no components.
	/// Spawning is never deferred; the entity starts out in the root archetype.
	pub fn spawn(&mut self) -> Identity {
		let entity = self.entities.allocate();
		let row = self.spawn_row(entity);
		self.entities.place(entity, Archetype::ROOT, row);
		entity
	}

	/// Creates `count` entities with no components.
	#[inline(never)]
	pub fn spawn_many(&mut self, count: usize) -> Vec<Identity> {
		self.entities.reserve(count);
		let root = self.archetypes.get_mut(Archetype::ROOT);
		root.ensure_capacity(root.len() + count);
		(0..count).map(|_| self.spawn()).collect()
	}

	fn spawn_row(&mut self, entity: Identity) -> usize {
		match self.archetypes.get_mut(Archetype::ROOT).add_row(entity) {
			Ok(row) => row,
			Err(_) => unreachable!("the root archetype is never enumerated"),
		}
	}

	/// Destroys `entity` and removes every relation other entities hold towards it.
	/// Despawning a dead or stale handle does nothing.
	pub fn despawn(&mut self, entity: Identity) -> EcsResult<()> {
		match self.is_locked() {
			true => self.defer(DeferredOperation::Despawn(entity)),
			false => self.despawn_now(entity),
		}
	}

	#[inline(never)]
	fn despawn_now(&mut self, entity: Identity) -> EcsResult<()> {
		let instance = match self.entities.get(entity) {
			Some(instance) => instance,
			None => return Ok(()),
		};

		let table = self.archetypes.get_mut(instance.archetype);
		if let Some(moved) = table.remove_row(instance.row)? {
			self.entities.set_row(moved, instance.row);
		}

		self.entities.release(entity);
		self.cascade(entity)
	}

	/// Strips every relation targeting `target` from the archetypes that hold one,
	/// moving their rows in bulk.
	fn cascade(&mut self, target: Identity) -> EcsResult<()> {
		let key = Key::entity(target);
		let tables = self.archetypes.take_target(key);
		if tables.is_empty() {
			return Ok(());
		}

		log::debug!("despawn of {target} cascades into {} archetypes", tables.len());
		for source in tables {
			let table = self.archetypes.get(source);
			if table.is_empty() {
				continue;
			}

			let doomed: Vec<TypeExpression> = table.signature().iter().filter(|e| e.key() == key).copied().collect();
			let destination = match doomed.as_slice() {
				[single] => self.archetypes.transition(source, *single, ArchetypeTransitionKind::Remove),
				_ => {
					let signature = table.signature().except(&doomed);
					self.archetypes.get_or_create(signature)
				},
			};

			let (from, into) = self.archetypes.pair_mut(source, destination);
			let start = from.migrate(into)?;
			for (offset, entity) in into.entities()[start..].iter().enumerate() {
				self.entities.place(*entity, destination, start + offset);
			}
		}

		Ok(())
	}

	/// Attaches a boxed `value` to `entity` under `expression`.
	///
	/// The box must hold the expression's component type. Relations may only target
	/// live entities. Stale handles are ignored.
	pub fn add_expression(
		&mut self, expression: TypeExpression, entity: Identity, value: Box<dyn Any + Send>,
	) -> EcsResult<()> {
		check_concrete(expression)?;
		match self.is_locked() {
			true => self.defer(DeferredOperation::Add {
				expression,
				entity,
				value,
			}),
			false => {
				let value_type = (*value).type_id();
				self.insert(expression, entity, value_type, |column| column.append_boxed(value, 1))
			},
		}
	}

	/// Detaches the component stored under `expression` from `entity`. Stale handles are ignored.
	pub fn remove_expression(&mut self, expression: TypeExpression, entity: Identity) -> EcsResult<()> {
		check_concrete(expression)?;
		match self.is_locked() {
			true => self.defer(DeferredOperation::Remove { expression, entity }),
			false => self.remove_now(expression, entity),
		}
	}

	/// Whether `entity` holds an expression satisfying `pattern`, which may carry a wildcard key.
	pub fn has_expression(&self, pattern: TypeExpression, entity: Identity) -> bool {
		match self.signature_of(entity) {
			Some(signature) => signature.matches(&pattern),
			None => false,
		}
	}

	pub fn add_component<T: Component>(&mut self, entity: Identity, value: T) -> EcsResult<()> {
		let expression = TypeExpression::plain(self.register::<T>());
		self.add_typed(expression, entity, value)
	}

	/// Attaches `value` as a relation from `entity` to `target`.
	pub fn add_relation<T: Component>(&mut self, entity: Identity, target: Identity, value: T) -> EcsResult<()> {
		let expression = TypeExpression::relation(self.register::<T>(), target);
		self.add_typed(expression, entity, value)
	}

	/// Attaches `object` under a key derived from its hash, so entities sharing an equal
	/// object can be grouped into the same archetype.
	pub fn add_link<L: Component + Hash>(&mut self, entity: Identity, object: L) -> EcsResult<()> {
		let id = self.register::<L>();
		let expression = TypeExpression::new(id, Key::link(&object, id));
		self.add_typed(expression, entity, object)
	}

	fn add_typed<T: Component>(&mut self, expression: TypeExpression, entity: Identity, value: T) -> EcsResult<()> {
		if self.is_locked() {
			return self.add_expression(expression, entity, Box::new(value));
		}

		self.insert(expression, entity, TypeId::of::<T>(), |column| {
			match column.as_any_mut().downcast_mut::<Storage<T>>() {
				Some(storage) => {
					storage.push(value);
					Ok(())
				},
				None => Err(EcsError::TypeMismatch {
					expected: std::any::type_name::<T>(),
				}),
			}
		})
	}

	pub fn remove_component<T: Component>(&mut self, entity: Identity) -> EcsResult<()> {
		let expression = TypeExpression::plain(self.register::<T>());
		self.remove_expression(expression, entity)
	}

	pub fn remove_relation<T: Component>(&mut self, entity: Identity, target: Identity) -> EcsResult<()> {
		let expression = TypeExpression::relation(self.register::<T>(), target);
		self.remove_expression(expression, entity)
	}

	pub fn remove_link<L: Component + Hash>(&mut self, entity: Identity, object: &L) -> EcsResult<()> {
		let id = self.register::<L>();
		self.remove_expression(TypeExpression::new(id, Key::link(object, id)), entity)
	}

	pub fn has_component<T: Component>(&self, entity: Identity) -> bool {
		self.has_relation::<T>(entity, Key::PLAIN)
	}

	/// Whether `entity` holds a `T` under `key`, which may be a wildcard.
	pub fn has_relation<T: Component>(&self, entity: Identity, key: Key) -> bool {
		match self.component_id::<T>() {
			Some(id) => self.has_expression(TypeExpression::new(id, key), entity),
			None => false,
		}
	}

	pub fn get_component<T: Component>(&self, entity: Identity) -> EcsResult<&T> {
		self.get_relation::<T>(entity, Key::PLAIN)
	}

	pub fn get_component_mut<T: Component>(&mut self, entity: Identity) -> EcsResult<&mut T> {
		self.get_relation_mut::<T>(entity, Key::PLAIN)
	}

	/// Gets the `T` stored under `key`; a wildcard key returns the first match.
	pub fn get_relation<T: Component>(&self, entity: Identity, key: Key) -> EcsResult<&T> {
		let pattern = TypeExpression::new(self.known_id::<T>()?, key);
		let instance = self.entities.get(entity).ok_or(EcsError::StaleHandle(entity))?;
		self.archetypes
			.get(instance.archetype)
			.get_component::<T>(&pattern, instance.row)
			.ok_or(EcsError::MissingComponent {
				entity,
				expression: pattern,
			})
	}

	pub fn get_relation_mut<T: Component>(&mut self, entity: Identity, key: Key) -> EcsResult<&mut T> {
		let pattern = TypeExpression::new(self.known_id::<T>()?, key);
		let instance = self.entities.get(entity).ok_or(EcsError::StaleHandle(entity))?;
		self.archetypes
			.get_mut(instance.archetype)
			.get_component_mut::<T>(&pattern, instance.row)
			.ok_or(EcsError::MissingComponent {
				entity,
				expression: pattern,
			})
	}

	/// Moves `entity` to the archetype with `expression` added, then lets `write` append the
	/// new value to the destination column.
	#[inline(never)]
	fn insert<F>(&mut self, expression: TypeExpression, entity: Identity, value_type: TypeId, write: F) -> EcsResult<()>
	where
		F: FnOnce(&mut dyn AnyStorage) -> EcsResult<()>,
	{
		let instance = match self.entities.get(entity) {
			Some(instance) => instance,
			None => return Ok(()),
		};

		let component = self
			.archetypes
			.types
			.get(expression.id())
			.ok_or_else(|| EcsError::UnknownComponent(expression.id().to_string()))?;

		if component.type_id() != value_type {
			return Err(EcsError::TypeMismatch {
				expected: component.name(),
			});
		}

		if let Some(target) = expression.key().target() {
			if !self.entities.is_alive(target) {
				return Err(EcsError::StaleHandle(target));
			}
		}

		let source = instance.archetype;
		if self.archetypes.get(source).signature().contains(&expression) {
			return Err(EcsError::DuplicateComponent { entity, expression });
		}

		let destination = self.archetypes.transition(source, expression, ArchetypeTransitionKind::Add);
		let (from, into) = self.archetypes.pair_mut(source, destination);
		let (row, moved) = from.move_row(instance.row, into)?;

		let column = match into.signature().position(&expression) {
			Some(column) => column,
			None => unreachable!("destination archetype lacks {expression}"),
		};
		write(into.column_at_mut(column))?;

		self.entities.place(entity, destination, row);
		if let Some(moved) = moved {
			self.entities.set_row(moved, instance.row);
		}
		Ok(())
	}

	#[inline(never)]
	fn remove_now(&mut self, expression: TypeExpression, entity: Identity) -> EcsResult<()> {
		let instance = match self.entities.get(entity) {
			Some(instance) => instance,
			None => return Ok(()),
		};

		let source = instance.archetype;
		if !self.archetypes.get(source).signature().contains(&expression) {
			return Err(EcsError::MissingComponent { entity, expression });
		}

		let destination = self.archetypes.transition(source, expression, ArchetypeTransitionKind::Remove);
		let (from, into) = self.archetypes.pair_mut(source, destination);
		let (row, moved) = from.move_row(instance.row, into)?;

		self.entities.place(entity, destination, row);
		if let Some(moved) = moved {
			self.entities.set_row(moved, instance.row);
		}
		Ok(())
	}

	/// Locks the registry; structural mutations are queued until the last guard is dropped.
	pub fn lock(&mut self) -> WorldLock<'_> {
		WorldLock::new(self)
	}

	pub fn is_locked(&self) -> bool {
		self.locks > 0
	}

	/// The number of queued structural mutations.
	pub fn pending(&self) -> usize {
		self.deferred.len()
	}

	pub(crate) fn acquire(&mut self) {
		self.locks += 1;
	}

	pub(crate) fn release(&mut self) {
		debug_assert!(self.locks > 0, "unbalanced unlock");
		self.locks = self.locks.saturating_sub(1);
		if self.locks == 0 {
			self.drain();
		}
	}

	fn defer(&mut self, operation: DeferredOperation) -> EcsResult<()> {
		self.deferred.push_back(operation);
		Ok(())
	}

	#[inline(never)]
	fn drain(&mut self) {
		while let Some(operation) = self.deferred.pop_front() {
			let entity = operation.entity();
			let name = operation.name();
			if !self.entities.is_alive(entity) {
				log::trace!("skipping deferred {name} on dead entity {entity}");
				continue;
			}

			let result = match operation {
				DeferredOperation::Despawn(entity) => self.despawn_now(entity),
				DeferredOperation::Remove { expression, entity } => self.remove_now(expression, entity),
				DeferredOperation::Add {
					expression,
					entity,
					value,
				} => {
					let value_type = (*value).type_id();
					self.insert(expression, entity, value_type, |column| column.append_boxed(value, 1))
				},
			};

			if let Err(error) = result {
				log::warn!("deferred {name} on {entity} failed: {error}");
			}
		}
	}

	/// Starts building a query over this registry.
	pub fn query_builder(&mut self) -> QueryBuilder<'_> {
		QueryBuilder::new(self)
	}

	/// Frees the query; the handle and every copy of it become stale.
	pub fn dispose_query(&mut self, query: Query) -> EcsResult<()> {
		let data = self.archetypes.queries.remove(query)?;
		log::debug!("disposed query {:?}", data.mask);
		Ok(())
	}

	/// The number of live query handles, cached or unique.
	pub fn query_count(&self) -> usize {
		self.archetypes.queries.len()
	}

	/// The archetypes matching `query`, in creation order.
	pub fn query_archetypes(&self, query: Query) -> EcsResult<&[Archetype]> {
		Ok(&self.archetypes.queries.get(query)?.archetypes)
	}

	/// The number of live entities matching `query`.
	pub fn query_len(&self, query: Query) -> EcsResult<usize> {
		let archetypes = self.query_archetypes(query)?;
		Ok(archetypes.iter().map(|a| self.archetypes.get(*a).len()).sum())
	}

	pub fn query_contains(&self, query: Query, entity: Identity) -> EcsResult<bool> {
		let archetypes = self.query_archetypes(query)?;
		Ok(match self.archetype_of(entity) {
			Some(archetype) => archetypes.binary_search(&archetype).is_ok(),
			None => false,
		})
	}

	pub fn query_entities(&self, query: Query) -> EcsResult<impl Iterator<Item = Identity> + '_> {
		let archetypes = self.query_archetypes(query)?;
		Ok(archetypes.iter().flat_map(|a| self.archetypes.get(*a).entities().iter().copied()))
	}

	/// Resolves `stream` against every non-empty archetype of `query`.
	/// Archetypes where a term has no column are skipped.
	fn plan<S: Stream>(&self, query: Query, stream: &S) -> EcsResult<Vec<(Archetype, Vec<Access>)>> {
		let data = self.archetypes.queries.get(query)?;
		let mut plan = Vec::with_capacity(data.archetypes.len());
		for archetype in data.archetypes.iter().copied() {
			let table = self.archetypes.get(archetype);
			if table.is_empty() {
				continue;
			}

			if let Some(access) = stream.resolve(&self.archetypes.types, table) {
				check_aliasing(table, &access)?;
				plan.push((archetype, access));
			}
		}
		Ok(plan)
	}

	/// Calls `func` once per matching archetype with its entities and the stream's columns.
	pub fn run<S, F>(&mut self, query: Query, stream: &S, mut func: F) -> EcsResult<()>
	where
		S: Stream,
		F: for<'a> FnMut(&'a [Identity], S::Columns<'a>),
	{
		for (archetype, access) in self.plan(query, stream)? {
			let mut table = EnumerationGuard::new(self.archetypes.get_mut(archetype));
			let columns = table.columns_ptr();
			unsafe { func(table.entities(), S::fetch(columns, &access)) };
		}
		Ok(())
	}

	/// Like [run](Self::run), but `func` may record structural mutations through [Commands].
	/// They are applied once iteration ends, or when the enclosing lock is released.
	pub fn run_deferred<S, F>(&mut self, query: Query, stream: &S, mut func: F) -> EcsResult<()>
	where
		S: Stream,
		F: for<'a> FnMut(&mut Commands<'_>, &'a [Identity], S::Columns<'a>),
	{
		let plan = self.plan(query, stream)?;
		let mut lock = self.lock();
		let registry = &mut *lock;
		for (archetype, access) in plan {
			let (table, types) = registry.archetypes.split_types(archetype);
			let mut commands = Commands::new(&mut registry.deferred, types);

			let mut table = EnumerationGuard::new(table);
			let columns = table.columns_ptr();
			unsafe { func(&mut commands, table.entities(), S::fetch(columns, &access)) };
		}
		Ok(())
	}

	/// Calls `func` for every matching archetype in parallel, one rayon task per archetype.
	pub fn run_parallel<S, F>(&mut self, query: Query, stream: &S, func: F) -> EcsResult<()>
	where
		S: Stream,
		F: for<'a> Fn(&'a [Identity], S::Columns<'a>) + Send + Sync,
	{
		let mut plan = self.plan(query, stream)?.into_iter().peekable();
		let mut tasks = Vec::with_capacity(plan.len());
		for (index, table) in self.archetypes.iter_mut().enumerate() {
			if let Some((_, access)) = plan.next_if(|(a, _)| a.index() == index) {
				tasks.push((table, access));
			}
		}

		tasks.into_par_iter().for_each(|(table, access)| {
			let mut table = EnumerationGuard::new(table);
			let columns = table.columns_ptr();
			unsafe { func(table.entities(), S::fetch(columns, &access)) };
		});
		Ok(())
	}

	/// Overwrites the `T` column selected by `key` in every archetype matching `query`.
	pub fn blit<T: Component>(&mut self, query: Query, key: Key, value: T) -> EcsResult<()> {
		let pattern = TypeExpression::new(self.known_id::<T>()?, key);
		let archetypes = self.archetypes.queries.get(query)?.archetypes.clone();
		for archetype in archetypes {
			if let Some(storage) = self.archetypes.get_mut(archetype).storage_mut::<T>(&pattern) {
				storage.blit(value.clone());
			}
		}
		Ok(())
	}

	/// Releases surplus capacity from every archetype.
	pub fn compact(&mut self) {
		for table in self.archetypes.iter_mut() {
			table.compact();
		}
	}
}

impl Default for EntityRegistry {
	fn default() -> Self {
		Self::new()
	}
}
