use crate::tests::{assert_invariants, init_logger, Name, Position, Tag, Velocity};
use crate::components::{Signature, TypeExpression};
use crate::archetypes::Archetype;
use crate::entities::EntityRegistry;
use crate::identity::{Identity, Key};
use crate::{EcsError, World, WorldConfig};

#[test]
pub fn spawn_places_entities_in_the_root() {
	init_logger();
	let mut registry = EntityRegistry::new();

	let a = registry.spawn();
	let b = registry.spawn();
	assert_ne!(a, b);
	assert_eq!(registry.len(), 2);
	assert_eq!(registry.archetype_of(a), Some(Archetype::ROOT));
	assert_eq!(registry.location(b), Some((Archetype::ROOT, 1)));
	assert_eq!(registry.signature_of(a), Some(&Signature::empty()));

	let many = registry.spawn_many(100);
	assert_eq!(many.len(), 100);
	assert_eq!(registry.len(), 102);
	assert_invariants(&registry);
}

#[test]
pub fn despawned_indices_are_recycled_with_a_new_generation() {
	let mut registry = EntityRegistry::new();
	let first = registry.spawn();
	registry.despawn(first).expect("Despawn failed");

	assert!(!registry.is_alive(first));
	assert_eq!(registry.len(), 0);

	let second = registry.spawn();
	assert_eq!(second.index(), first.index(), "Free index was not reused");
	assert_eq!(second, first.successor());
	assert!(registry.is_alive(second));
	assert!(!registry.is_alive(first), "Stale handle resolved to the recycled entity");
}

#[test]
pub fn add_then_remove_scenario() {
	init_logger();
	let mut registry = EntityRegistry::new();
	let query = registry
		.query_builder()
		.has::<u32>(Key::PLAIN)
		.compile()
		.expect("Query compilation failed");
	assert_eq!(registry.query_len(query), Ok(0));

	let entity = registry.spawn();
	registry.add_component(entity, 5u32).expect("Adding A failed");
	assert_eq!(registry.query_len(query), Ok(1));

	let a = TypeExpression::plain(registry.register::<u32>());
	let b = TypeExpression::plain(registry.register::<u64>());
	assert_eq!(registry.signature_of(entity), Some(&Signature::new([a])));

	registry.add_component(entity, 7u64).expect("Adding B failed");
	assert_eq!(registry.signature_of(entity), Some(&Signature::new([a, b])));
	assert_eq!(registry.get_component::<u32>(entity), Ok(&5));

	registry.remove_component::<u32>(entity).expect("Removing A failed");
	assert_eq!(registry.signature_of(entity), Some(&Signature::new([b])));
	assert_eq!(registry.get_component::<u64>(entity), Ok(&7));
	assert_eq!(registry.query_len(query), Ok(0));
	assert_invariants(&registry);
}

#[test]
pub fn swap_fill_keeps_sibling_values() {
	let mut registry = EntityRegistry::new();
	let first = registry.spawn();
	let second = registry.spawn();

	for (entity, value) in [(first, 1.0), (second, 2.0)] {
		registry.add_component(entity, Position { x: value, y: value }).expect("Adding A failed");
		registry.add_component(entity, Velocity { x: -value, y: -value }).expect("Adding B failed");
	}

	registry.remove_component::<Velocity>(first).expect("Removing B failed");
	assert_eq!(registry.location(second).map(|(_, row)| row), Some(0), "Sibling was not swapped into row 0");
	assert_eq!(registry.get_component::<Position>(second), Ok(&Position { x: 2.0, y: 2.0 }));
	assert_eq!(registry.get_component::<Velocity>(second), Ok(&Velocity { x: -2.0, y: -2.0 }));
	assert_eq!(registry.get_component::<Position>(first), Ok(&Position { x: 1.0, y: 1.0 }));
	assert!(!registry.has_component::<Velocity>(first));
	assert_invariants(&registry);
}

#[test]
pub fn add_remove_round_trip_restores_the_signature() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	registry.add_component(entity, Name("alpha".to_string())).expect("Adding a name failed");
	registry.add_component(entity, Position { x: 3.0, y: 4.0 }).expect("Adding a position failed");

	let before = registry.signature_of(entity).cloned();
	let archetype = registry.archetype_of(entity);

	registry.add_component(entity, Tag).expect("Adding a tag failed");
	registry.remove_component::<Tag>(entity).expect("Removing a tag failed");

	assert_eq!(registry.signature_of(entity).cloned(), before);
	assert_eq!(registry.archetype_of(entity), archetype, "The edge cache led to a different archetype");
	assert_eq!(registry.get_component::<Name>(entity), Ok(&Name("alpha".to_string())));
	assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 3.0, y: 4.0 }));
}

#[test]
pub fn edges_are_memoized_both_ways() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	registry.add_component(entity, 1u8).expect("Adding a component failed");

	let expression = TypeExpression::plain(registry.register::<u8>());
	let target = registry.archetype_of(entity).expect("Entity is not alive");
	let root = registry.archetype(Archetype::ROOT);
	assert_eq!(root.edge(&expression).add, Some(target));
	assert_eq!(registry.archetype(target).edge(&expression).remove, Some(Archetype::ROOT));

	let count = registry.archetype_count();
	let other = registry.spawn();
	registry.add_component(other, 2u8).expect("Adding a component failed");
	assert_eq!(registry.archetype_count(), count, "A memoized transition created a new archetype");
}

#[test]
pub fn structural_errors() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	registry.add_component(entity, 1i32).expect("Adding a component failed");

	let expression = TypeExpression::plain(registry.register::<i32>());
	assert_eq!(
		registry.add_component(entity, 2i32),
		Err(EcsError::DuplicateComponent { entity, expression })
	);
	assert_eq!(registry.get_component::<i32>(entity), Ok(&1), "A failed add changed the value");

	let missing = TypeExpression::plain(registry.register::<i64>());
	assert_eq!(
		registry.remove_component::<i64>(entity),
		Err(EcsError::MissingComponent {
			entity,
			expression: missing
		})
	);

	let wildcard = TypeExpression::new(expression.id(), Key::ANY);
	assert_eq!(
		registry.add_expression(wildcard, entity, Box::new(3i32)),
		Err(EcsError::WildcardKey(Key::ANY))
	);

	assert_eq!(
		registry.add_expression(missing, entity, Box::new(3i32)),
		Err(EcsError::TypeMismatch {
			expected: std::any::type_name::<i64>()
		})
	);
	assert_invariants(&registry);
}

#[test]
pub fn stale_handles() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	registry.add_component(entity, 1u16).expect("Adding a component failed");
	registry.despawn(entity).expect("Despawn failed");

	assert_eq!(registry.despawn(entity), Ok(()), "Despawning twice must be a no-op");
	assert_eq!(registry.add_component(entity, 2u16), Ok(()), "Mutating a stale handle must be a no-op");
	assert_eq!(registry.remove_component::<u16>(entity), Ok(()));
	assert_eq!(registry.get_component::<u16>(entity), Err(EcsError::StaleHandle(entity)));
	assert!(!registry.has_component::<u16>(entity));
	assert_eq!(registry.archetype_of(entity), None);
	assert_eq!(registry.len(), 0);
}

#[test]
pub fn reading_unknown_types() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();

	assert_eq!(
		registry.get_component::<f64>(entity),
		Err(EcsError::UnknownComponent(std::any::type_name::<f64>().to_string()))
	);
	assert!(!registry.has_component::<f64>(entity));
}

#[test]
pub fn mutable_access() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	registry.add_component(entity, Position::default()).expect("Adding a component failed");

	registry.get_component_mut::<Position>(entity).expect("Missing position").x = 10.0;
	assert_eq!(registry.get_component::<Position>(entity).map(|p| p.x), Ok(10.0));
}

#[test]
pub fn boxed_values() {
	let mut registry = EntityRegistry::new();
	let entity = registry.spawn();
	let expression = TypeExpression::plain(registry.register::<String>());

	registry
		.add_expression(expression, entity, Box::new("boxed".to_string()))
		.expect("Adding a boxed value failed");
	assert!(registry.has_expression(expression, entity));
	assert_eq!(registry.get_component::<String>(entity).map(String::as_str), Ok("boxed"));

	registry.remove_expression(expression, entity).expect("Removing a boxed value failed");
	assert!(!registry.has_expression(expression, entity));
}

#[test]
pub fn compact_keeps_data() {
	let mut registry = EntityRegistry::with_capacity(64, 4);
	let entities = registry.spawn_many(64);
	for (i, entity) in entities.iter().enumerate() {
		registry.add_component(*entity, i as u32).expect("Adding a component failed");
	}
	for entity in &entities[4..] {
		registry.despawn(*entity).expect("Despawn failed");
	}

	registry.compact();
	for (i, entity) in entities[..4].iter().enumerate() {
		assert_eq!(registry.get_component::<u32>(*entity), Ok(&(i as u32)));
	}
	assert_invariants(&registry);
}

#[test]
pub fn world_configuration() {
	let world = World::with_config(WorldConfig {
		entity_capacity: 16,
		storage_floor: 3,
		worker_threads: Some(2),
	});

	assert_eq!(world.config().storage_floor, 3);
	assert!(world.is_empty());
	assert_eq!(World::default().config(), &WorldConfig::default());

	let mut world = World::new();
	let entity: Identity = world.spawn();
	world.add_component(entity, 1u8).expect("Adding a component failed");
	assert_eq!(world.get_component::<u8>(entity), Ok(&1));
}
