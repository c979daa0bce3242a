use crate::components::Component;
use crate::entities::EntityRegistry;
use parking_lot::Once;

mod identity_tests;
mod registry_tests;
mod randomized_tests;

static LOGGER: Once = Once::new();

pub(crate) fn init_logger() {
	LOGGER.call_once(|| {
		let _ = env_logger::builder().is_test(true).try_init();
	});
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Position {
	pub x: f32,
	pub y: f32,
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Velocity {
	pub x: f32,
	pub y: f32,
}

#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Name(pub String);

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct Likes(pub u32);

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tag;

/// Checks that every row points back at its entity and every column is as long as its table.
pub(crate) fn assert_invariants(registry: &EntityRegistry) {
	let mut total = 0;
	for table in registry.archetypes() {
		assert!(table.is_consistent(), "Archetype {} has misaligned columns", table.id().index());
		for (row, entity) in table.entities().iter().enumerate() {
			assert_eq!(
				registry.location(*entity),
				Some((table.id(), row)),
				"Entity {entity} is not where its metadata says"
			);
		}
		total += table.len();
	}
	assert_eq!(total, registry.len(), "Live entity count does not match the stored rows");
}
