use crate::components::{Component, TypeExpression, TypeRegistry};
use crate::error::{EcsError, EcsResult};
use crate::entities::EntityRegistry;
use std::ops::{Deref, DerefMut};
use crate::identity::{Identity, Key};
use std::collections::VecDeque;
use std::any::Any;

/// A structural mutation captured while the registry is locked.
pub(crate) enum DeferredOperation {
	Despawn(Identity),
	Add {
		expression: TypeExpression,
		entity: Identity,
		value: Box<dyn Any + Send>,
	},
	Remove {
		expression: TypeExpression,
		entity: Identity,
	},
}

impl DeferredOperation {
	pub fn entity(&self) -> Identity {
		match self {
			DeferredOperation::Despawn(entity) => *entity,
			DeferredOperation::Add { entity, .. } => *entity,
			DeferredOperation::Remove { entity, .. } => *entity,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			DeferredOperation::Despawn(_) => "despawn",
			DeferredOperation::Add { .. } => "add",
			DeferredOperation::Remove { .. } => "remove",
		}
	}
}

pub(crate) fn check_concrete(expression: TypeExpression) -> EcsResult<()> {
	match expression.is_wildcard() {
		true => Err(EcsError::WildcardKey(expression.key())),
		false => Ok(()),
	}
}

/// A guard over a locked [EntityRegistry].
///
/// While any guard is alive, `despawn`, `add_*` and `remove_*` are queued instead of applied,
/// and reads keep observing the state from before the lock. Locks nest; dropping the
/// outermost guard applies the queue in call order.
pub struct WorldLock<'l> {
	registry: &'l mut EntityRegistry,
}

impl<'l> WorldLock<'l> {
	pub(crate) fn new(registry: &'l mut EntityRegistry) -> Self {
		registry.acquire();
		Self { registry }
	}
}

impl Deref for WorldLock<'_> {
	type Target = EntityRegistry;

	#[inline(always)]
	fn deref(&self) -> &Self::Target {
		self.registry
	}
}

impl DerefMut for WorldLock<'_> {
	#[inline(always)]
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.registry
	}
}

impl Drop for WorldLock<'_> {
	fn drop(&mut self) {
		self.registry.release();
	}
}

/// Records structural mutations from inside [EntityRegistry::run_deferred].
/// They are applied once the run (and any enclosing lock) ends.
pub struct Commands<'l> {
	queue: &'l mut VecDeque<DeferredOperation>,
	types: &'l mut TypeRegistry,
}

impl<'l> Commands<'l> {
	pub(crate) fn new(queue: &'l mut VecDeque<DeferredOperation>, types: &'l mut TypeRegistry) -> Self {
		Self { queue, types }
	}

	pub fn despawn(&mut self, entity: Identity) {
		self.queue.push_back(DeferredOperation::Despawn(entity));
	}

	pub fn add_component<T: Component>(&mut self, entity: Identity, value: T) {
		let expression = TypeExpression::plain(self.types.register::<T>());
		self.push_add(expression, entity, Box::new(value));
	}

	pub fn add_relation<T: Component>(&mut self, entity: Identity, target: Identity, value: T) {
		let expression = TypeExpression::relation(self.types.register::<T>(), target);
		self.push_add(expression, entity, Box::new(value));
	}

	pub fn add_expression(
		&mut self, expression: TypeExpression, entity: Identity, value: Box<dyn Any + Send>,
	) -> EcsResult<()> {
		check_concrete(expression)?;
		self.push_add(expression, entity, value);
		Ok(())
	}

	pub fn remove_component<T: Component>(&mut self, entity: Identity) {
		let expression = TypeExpression::plain(self.types.register::<T>());
		self.queue.push_back(DeferredOperation::Remove { expression, entity });
	}

	pub fn remove_relation<T: Component>(&mut self, entity: Identity, target: Identity) {
		let expression = TypeExpression::new(self.types.register::<T>(), Key::entity(target));
		self.queue.push_back(DeferredOperation::Remove { expression, entity });
	}

	pub fn remove_expression(&mut self, expression: TypeExpression, entity: Identity) -> EcsResult<()> {
		check_concrete(expression)?;
		self.queue.push_back(DeferredOperation::Remove { expression, entity });
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}

	fn push_add(&mut self, expression: TypeExpression, entity: Identity, value: Box<dyn Any + Send>) {
		self.queue.push_back(DeferredOperation::Add {
			expression,
			entity,
			value,
		});
	}
}
