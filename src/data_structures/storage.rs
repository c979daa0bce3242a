use crate::data_structures::{BufferPool, DEFAULT_STORAGE_FLOOR};
use crate::error::EcsError;

/// A growable, type-homogeneous column.
///
/// The logical capacity is always a power of two no smaller than the floor; the
/// backing buffer is swapped for a pooled one whenever the capacity changes.
/// Deleting rows fills the gap from the tail, so row order is not stable.
pub struct Storage<T> {
	data: Vec<T>,
	floor: usize,
	capacity: usize,
	pool: BufferPool<T>,
}

#[track_caller]
#[inline(always)]
fn check_range(index: usize, count: usize, len: usize) {
	if index >= len || count > len - index {
		panic!("{}", EcsError::IndexOutOfRange { index: index + count.saturating_sub(1), len });
	}
}

impl<T> Storage<T> {
	pub fn new() -> Self {
		Self::with_pool(BufferPool::new(), DEFAULT_STORAGE_FLOOR)
	}

	pub fn with_pool(pool: BufferPool<T>, floor: usize) -> Self {
		let floor = floor.max(1).next_power_of_two();
		Self {
			data: pool.take(floor),
			floor,
			capacity: floor,
			pool,
		}
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	#[inline(always)]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[track_caller]
	pub fn get(&self, index: usize) -> &T {
		check_range(index, 1, self.len());
		&self.data[index]
	}

	#[track_caller]
	pub fn get_mut(&mut self, index: usize) -> &mut T {
		check_range(index, 1, self.len());
		&mut self.data[index]
	}

	pub fn as_slice(&self) -> &[T] {
		&self.data
	}

	pub fn as_mut_slice(&mut self) -> &mut [T] {
		&mut self.data
	}

	pub fn push(&mut self, value: T) {
		self.ensure_capacity(self.len() + 1);
		self.data.push(value);
	}

	/// Swap-fill delete of `count` entries starting at `index`.
	///
	/// Entries from the tail are moved forward to close the gap and the vacated tail is dropped.
	#[track_caller]
	pub fn delete(&mut self, index: usize, count: usize) {
		if count == 0 {
			return;
		}

		let len = self.len();
		check_range(index, count, len);

		let tail = usize::max(index + count, len - count);
		for i in 0..(len - tail) {
			self.data.swap(index + i, tail + i);
		}
		self.data.truncate(len - count);
	}

	/// Moves the entry at `index` to the end of `into`, then deletes it from this column.
	#[track_caller]
	pub fn move_one(&mut self, index: usize, into: &mut Storage<T>) {
		check_range(index, 1, self.len());
		into.push(self.data.swap_remove(index));
	}

	/// Appends every entry to `into`, leaving this column empty at its floor capacity.
	pub fn migrate(&mut self, into: &mut Storage<T>) {
		into.ensure_capacity(into.len() + self.len());
		into.data.append(&mut self.data);
		self.release();
	}

	/// Drops every entry and returns the backing buffer to the pool.
	pub fn clear(&mut self) {
		self.data.clear();
		self.release();
	}

	/// Grows to the next power of two able to hold `capacity` entries.
	pub fn ensure_capacity(&mut self, capacity: usize) {
		if capacity > self.capacity {
			self.resize(capacity.next_power_of_two());
		}
	}

	/// Shrinks to the smallest power of two, no smaller than the floor, that fits every entry.
	pub fn compact(&mut self) {
		let target = usize::max(self.floor, self.len()).next_power_of_two();
		if target < self.capacity {
			self.resize(target);
		}
	}

	/// Swaps an empty grown buffer for a floor-sized one.
	fn release(&mut self) {
		debug_assert!(self.data.is_empty());
		if self.capacity > self.floor {
			let old = std::mem::replace(&mut self.data, self.pool.take(self.floor));
			self.pool.give(old);
			self.capacity = self.floor;
		}
	}

	fn resize(&mut self, capacity: usize) {
		let mut buffer = self.pool.take(capacity);
		buffer.append(&mut self.data);

		let old = std::mem::replace(&mut self.data, buffer);
		self.pool.give(old);
		self.capacity = capacity;
	}
}

impl<T: Clone> Storage<T> {
	/// Appends `count` copies of `value`. Does nothing for a zero count.
	pub fn append(&mut self, value: T, count: usize) {
		if count == 0 {
			return;
		}

		let len = self.len();
		self.ensure_capacity(len + count);
		self.data.resize(len + count, value);
	}

	/// Overwrites every occupied slot with `value`.
	pub fn blit(&mut self, value: T) {
		self.data.fill(value);
	}
}

impl<T> Default for Storage<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Drop for Storage<T> {
	fn drop(&mut self) {
		self.pool.give(std::mem::take(&mut self.data));
	}
}
