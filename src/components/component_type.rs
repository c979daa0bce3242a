use crate::data_structures::{AnyStorage, Storage, StoragePools};
use crate::components::ComponentId;
use std::any::TypeId;

/// Data attached to [entities](crate::identity::Identity).
///
/// Implemented through `#[derive(Component)]`; primitive types and `String`
/// implement it out of the box.
pub trait Component
where
	Self: 'static + Send + Sync + Clone,
{
}

macro_rules! impl_component {
	($($t: ty),*) => {
		$(impl Component for $t {})*
	};
}

impl_component!(bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String);

/// A runtime representation of a type implementing the [`Component`] trait.
#[derive(Clone)]
pub struct ComponentType {
	id: ComponentId,
	type_id: TypeId,
	name: &'static str,
	make_storage: fn(&mut StoragePools) -> Box<dyn AnyStorage>,
}

impl ComponentType {
	pub(crate) fn of<T: Component>(id: ComponentId) -> Self {
		Self {
			id,
			type_id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
			make_storage: make_storage::<T>,
		}
	}

	pub const fn id(&self) -> ComponentId {
		self.id
	}

	pub const fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub const fn name(&self) -> &'static str {
		self.name
	}

	/// Creates an empty column for this type, drawing its buffers from `pools`.
	pub fn make_storage(&self, pools: &mut StoragePools) -> Box<dyn AnyStorage> {
		(self.make_storage)(pools)
	}
}

fn make_storage<T: Component>(pools: &mut StoragePools) -> Box<dyn AnyStorage> {
	Box::new(Storage::<T>::with_pool(pools.pool::<T>(), pools.floor()))
}

impl Eq for ComponentType {}

impl PartialEq<Self> for ComponentType {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}
