use crate::data_structures::DEFAULT_STORAGE_FLOOR;
use crate::archetypes::Stream;
use crate::entities::{EntityRegistry, Query};
use std::ops::{Deref, DerefMut};
use crate::identity::Identity;
use crate::error::EcsResult;

/// Construction parameters of a [World].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorldConfig {
	/// The number of entities to reserve metadata for up front.
	pub entity_capacity: usize,
	/// The minimum capacity of every column; rounded up to a power of two.
	pub storage_floor: usize,
	/// Builds a dedicated thread pool for [World::run_parallel] with this many workers.
	/// `None` uses rayon's global pool.
	pub worker_threads: Option<usize>,
}

impl Default for WorldConfig {
	fn default() -> Self {
		Self {
			entity_capacity: 0,
			storage_floor: DEFAULT_STORAGE_FLOOR,
			worker_threads: None,
		}
	}
}

/// A container for entities, their components and the queries over them.
///
/// Dereferences to its [EntityRegistry], which carries the whole structural API.
pub struct World {
	registry: EntityRegistry,
	config: WorldConfig,
	thread_pool: Option<rayon::ThreadPool>,
}

impl World {
	pub fn new() -> Self {
		Self::with_config(WorldConfig::default())
	}

	pub fn with_config(config: WorldConfig) -> Self {
		let thread_pool = config.worker_threads.and_then(|threads| {
			let result = rayon::ThreadPoolBuilder::new()
				.num_threads(threads)
				.thread_name(|index| format!("tessera-worker-{index}"))
				.build();

			match result {
				Ok(pool) => Some(pool),
				Err(err) => {
					log::error!("Failed to build a pool of {threads} workers, falling back to the global pool: {err}");
					None
				},
			}
		});

		Self {
			registry: EntityRegistry::with_capacity(config.entity_capacity, config.storage_floor),
			config,
			thread_pool,
		}
	}

	pub fn config(&self) -> &WorldConfig {
		&self.config
	}

	/// Runs `func` over the archetypes of `query` in parallel, on the world's own pool if it has one.
	pub fn run_parallel<S, F>(&mut self, query: Query, stream: &S, func: F) -> EcsResult<()>
	where
		S: Stream,
		F: for<'a> Fn(&'a [Identity], S::Columns<'a>) + Send + Sync,
	{
		let registry = &mut self.registry;
		match &self.thread_pool {
			Some(pool) => pool.install(|| registry.run_parallel(query, stream, func)),
			None => registry.run_parallel(query, stream, func),
		}
	}
}

impl Default for World {
	fn default() -> Self {
		Self::new()
	}
}

impl Deref for World {
	type Target = EntityRegistry;

	#[inline(always)]
	fn deref(&self) -> &Self::Target {
		&self.registry
	}
}

impl DerefMut for World {
	#[inline(always)]
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.registry
	}
}
