use crate::data_structures::Storage;
use crate::error::{EcsError, EcsResult};
use crate::components::Component;
use std::any::Any;

/// A type-erased [Storage] column.
///
/// Archetypes hold one boxed column per type expression and drive them through this
/// trait; typed access goes through [AnyStorage::as_any] and a downcast.
pub trait AnyStorage: Send + Sync {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn capacity(&self) -> usize;

	/// The name of the element type, for diagnostics.
	fn type_name(&self) -> &'static str;

	/// Appends `count` copies of a boxed value of the element type.
	fn append_boxed(&mut self, value: Box<dyn Any + Send>, count: usize) -> EcsResult<()>;

	/// Overwrites every occupied slot with a boxed value of the element type.
	fn blit_boxed(&mut self, value: Box<dyn Any + Send>) -> EcsResult<()>;

	/// Clones the entry at `index` into a box.
	fn get_boxed(&self, index: usize) -> Box<dyn Any + Send>;

	fn delete(&mut self, index: usize, count: usize);

	/// Moves the entry at `index` into `into`, which must hold the same element type.
	fn move_one(&mut self, index: usize, into: &mut dyn AnyStorage) -> EcsResult<()>;

	/// Appends every entry to `into`, which must hold the same element type.
	fn migrate(&mut self, into: &mut dyn AnyStorage) -> EcsResult<()>;

	fn ensure_capacity(&mut self, capacity: usize);

	fn compact(&mut self);

	fn clear(&mut self);

	fn as_any(&self) -> &dyn Any;

	fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> Storage<T> {
	fn unbox(value: Box<dyn Any + Send>) -> EcsResult<T> {
		match value.downcast::<T>() {
			Ok(value) => Ok(*value),
			Err(_) => Err(type_mismatch::<T>()),
		}
	}

	fn downcast(storage: &mut dyn AnyStorage) -> EcsResult<&mut Storage<T>> {
		storage.as_any_mut().downcast_mut::<Storage<T>>().ok_or_else(type_mismatch::<T>)
	}
}

fn type_mismatch<T>() -> EcsError {
	EcsError::TypeMismatch {
		expected: std::any::type_name::<T>(),
	}
}

impl<T: Component> AnyStorage for Storage<T> {
	fn len(&self) -> usize {
		Storage::len(self)
	}

	fn capacity(&self) -> usize {
		Storage::capacity(self)
	}

	fn type_name(&self) -> &'static str {
		std::any::type_name::<T>()
	}

	fn append_boxed(&mut self, value: Box<dyn Any + Send>, count: usize) -> EcsResult<()> {
		let value = Self::unbox(value)?;
		Storage::append(self, value, count);
		Ok(())
	}

	fn blit_boxed(&mut self, value: Box<dyn Any + Send>) -> EcsResult<()> {
		let value = Self::unbox(value)?;
		Storage::blit(self, value);
		Ok(())
	}

	fn get_boxed(&self, index: usize) -> Box<dyn Any + Send> {
		Box::new(self.get(index).clone())
	}

	fn delete(&mut self, index: usize, count: usize) {
		Storage::delete(self, index, count)
	}

	fn move_one(&mut self, index: usize, into: &mut dyn AnyStorage) -> EcsResult<()> {
		let into = Self::downcast(into)?;
		Storage::move_one(self, index, into);
		Ok(())
	}

	fn migrate(&mut self, into: &mut dyn AnyStorage) -> EcsResult<()> {
		let into = Self::downcast(into)?;
		Storage::migrate(self, into);
		Ok(())
	}

	fn ensure_capacity(&mut self, capacity: usize) {
		Storage::ensure_capacity(self, capacity)
	}

	fn compact(&mut self) {
		Storage::compact(self)
	}

	fn clear(&mut self) {
		Storage::clear(self)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}
