use std::collections::HashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Buffers kept per element type; anything beyond this is freed.
const MAX_POOLED_BUFFERS: usize = 64;

/// The default minimum capacity of a column.
pub const DEFAULT_STORAGE_FLOOR: usize = 16;

/// A free list of backing buffers for a single element type.
///
/// Buffers handed out by [BufferPool::take] are exclusively owned by the caller
/// until they are returned with [BufferPool::give].
pub struct BufferPool<T> {
	buffers: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> BufferPool<T> {
	pub fn new() -> Self {
		Self {
			buffers: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Take an empty buffer able to hold at least `capacity` elements.
	/// The smallest pooled buffer that fits is preferred.
	pub fn take(&self, capacity: usize) -> Vec<T> {
		let mut buffers = self.buffers.lock();
		let best = buffers
			.iter()
			.enumerate()
			.filter(|(_, b)| b.capacity() >= capacity)
			.min_by_key(|(_, b)| b.capacity())
			.map(|(i, _)| i);

		match best {
			Some(index) => buffers.swap_remove(index),
			None => Vec::with_capacity(capacity),
		}
	}

	/// Return a buffer to the pool. Its contents are dropped.
	pub fn give(&self, mut buffer: Vec<T>) {
		if buffer.capacity() == 0 {
			return;
		}

		buffer.clear();
		let mut buffers = self.buffers.lock();
		if buffers.len() < MAX_POOLED_BUFFERS {
			buffers.push(buffer);
		}
	}

	/// The number of idle buffers.
	pub fn len(&self) -> usize {
		self.buffers.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T> Clone for BufferPool<T> {
	fn clone(&self) -> Self {
		Self {
			buffers: self.buffers.clone(),
		}
	}
}

impl<T> Default for BufferPool<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// The [buffer pools](BufferPool) of a world, keyed by element type.
pub struct StoragePools {
	floor: usize,
	pools: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl StoragePools {
	/// `floor` is the minimum column capacity, rounded up to a power of two.
	pub fn new(floor: usize) -> Self {
		Self {
			floor: floor.max(1).next_power_of_two(),
			pools: HashMap::default(),
		}
	}

	pub fn floor(&self) -> usize {
		self.floor
	}

	pub fn pool<T: 'static + Send>(&mut self) -> BufferPool<T> {
		let pool = self
			.pools
			.entry(TypeId::of::<T>())
			.or_insert_with(|| Box::new(BufferPool::<T>::new()) as Box<dyn Any + Send + Sync>);

		match pool.downcast_ref::<BufferPool<T>>() {
			Some(pool) => pool.clone(),
			None => unreachable!("buffer pool registered under the wrong type"),
		}
	}
}

impl Default for StoragePools {
	fn default() -> Self {
		Self::new(DEFAULT_STORAGE_FLOOR)
	}
}
