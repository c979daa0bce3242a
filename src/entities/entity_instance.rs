use crate::identity::{next_generation, Identity};
use crate::archetypes::Archetype;

const DEAD: u32 = u32::MAX;

/// Where a live entity's data is stored.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct EntityInstance {
	pub(crate) archetype: Archetype,
	pub(crate) row: usize,
}

/// Flat, index-addressed entity metadata plus the recycled index free list.
#[derive(Default)]
pub(crate) struct EntityInstanceVec {
	generations: Vec<u16>,
	archetypes: Vec<u32>,
	rows: Vec<u32>,
	free: Vec<u32>,
	alive: usize,
}

impl EntityInstanceVec {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			generations: Vec::with_capacity(capacity),
			archetypes: Vec::with_capacity(capacity),
			rows: Vec::with_capacity(capacity),
			free: Vec::new(),
			alive: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.alive
	}

	pub fn reserve(&mut self, count: usize) {
		let additional = count.saturating_sub(self.free.len());
		self.generations.reserve(additional);
		self.archetypes.reserve(additional);
		self.rows.reserve(additional);
	}

	/// Hands out a recycled index (its generation already advanced) or a fresh one.
	/// The identity is not alive until it is [placed](Self::place).
	pub fn allocate(&mut self) -> Identity {
		let index = match self.free.pop() {
			Some(index) => index,
			None => {
				let index = self.generations.len();
				assert!(index < DEAD as usize, "entity index space exhausted");
				self.generations.push(1);
				self.archetypes.push(DEAD);
				self.rows.push(0);
				index as u32
			},
		};

		self.alive += 1;
		Identity::new(index, self.generations[index as usize])
	}

	pub fn get(&self, identity: Identity) -> Option<EntityInstance> {
		let index = identity.index() as usize;
		let generation = *self.generations.get(index)?;
		let archetype = self.archetypes[index];
		if generation != identity.generation() || archetype == DEAD {
			return None;
		}

		Some(EntityInstance {
			archetype: Archetype { index: archetype as usize },
			row: self.rows[index] as usize,
		})
	}

	#[inline(always)]
	pub fn is_alive(&self, identity: Identity) -> bool {
		self.get(identity).is_some()
	}

	pub fn place(&mut self, identity: Identity, archetype: Archetype, row: usize) {
		let index = identity.index() as usize;
		debug_assert_eq!(self.generations[index], identity.generation());
		self.archetypes[index] = archetype.index as u32;
		self.rows[index] = row as u32;
	}

	/// Updates the row of an entity that was swapped into a hole within its archetype.
	pub fn set_row(&mut self, identity: Identity, row: usize) {
		self.rows[identity.index() as usize] = row as u32;
	}

	/// Marks the entity dead, advances its generation and recycles its index.
	pub fn release(&mut self, identity: Identity) {
		let index = identity.index() as usize;
		self.archetypes[index] = DEAD;
		self.rows[index] = 0;
		self.generations[index] = next_generation(self.generations[index]);
		self.free.push(identity.index());
		self.alive -= 1;
	}
}
