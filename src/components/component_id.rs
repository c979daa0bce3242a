//! A runtime identifier tied to a [Component] type.
//!
//! Developers shouldn't rely on [component ids](ComponentId), as they depend on the order
//! in which types are first used by a world and are not stable between program re-runs.

use crate::components::{Component, ComponentType};
use std::collections::HashMap;
use std::any::TypeId;
use std::fmt;

/// A world-unique identifier for a type implementing the [`Component`] trait.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Debug, Default)]
pub struct ComponentId {
	value: u16,
}

impl ComponentId {
	#[inline(always)]
	pub const fn new(value: u16) -> Self {
		Self { value }
	}

	#[inline(always)]
	pub const fn value(&self) -> u16 {
		self.value
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.value)
	}
}

/// Maps Rust types to [component ids](ComponentId). Owned by a single world.
#[derive(Default)]
pub struct TypeRegistry {
	ids: HashMap<TypeId, ComponentId>,
	types: Vec<ComponentType>,
}

impl TypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the id of `T`, registering it on first use.
	pub fn register<T: Component>(&mut self) -> ComponentId {
		if let Some(id) = self.ids.get(&TypeId::of::<T>()) {
			return *id;
		}

		let value = self.types.len();
		assert!(
			value <= u16::MAX as usize,
			"This is an insane number of component types. Please seek help."
		);

		let id = ComponentId::new(value as u16);
		self.types.push(ComponentType::of::<T>(id));
		self.ids.insert(TypeId::of::<T>(), id);
		log::trace!("registered component {} as {id}", std::any::type_name::<T>());
		id
	}

	/// Returns the id of `T` if a world has already used it.
	pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
		self.ids.get(&TypeId::of::<T>()).copied()
	}

	pub fn get(&self, id: ComponentId) -> Option<&ComponentType> {
		self.types.get(id.value() as usize)
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}
