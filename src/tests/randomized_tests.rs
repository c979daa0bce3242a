use crate::tests::{assert_invariants, init_logger, Likes, Position};
use crate::entities::EntityRegistry;
use crate::identity::{Identity, Key};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq)]
struct Expected {
	position: Option<Position>,
	counter: Option<u32>,
	likes: HashMap<Identity, Likes>,
}

fn verify(registry: &EntityRegistry, model: &HashMap<Identity, Expected>) {
	assert_invariants(registry);
	assert_eq!(registry.len(), model.len());

	for (entity, expected) in model {
		assert!(registry.is_alive(*entity));
		assert_eq!(registry.get_component::<Position>(*entity).ok(), expected.position.as_ref());
		assert_eq!(registry.get_component::<u32>(*entity).ok(), expected.counter.as_ref());
		for (target, likes) in &expected.likes {
			assert_eq!(registry.get_relation::<Likes>(*entity, Key::entity(*target)), Ok(likes));
		}
		let relations = registry
			.signature_of(*entity)
			.map(|s| s.iter().filter(|e| e.is_relation()).count())
			.unwrap_or(0);
		assert_eq!(relations, expected.likes.len(), "Entity {entity} holds unexpected relations");
	}
}

#[test]
pub fn random_operations_keep_invariants() {
	init_logger();
	let mut rng = StdRng::seed_from_u64(0x7E55_E7A);
	let mut registry = EntityRegistry::with_capacity(0, 4);
	let mut model: HashMap<Identity, Expected> = HashMap::new();
	let mut alive: Vec<Identity> = Vec::new();

	registry.register::<Position>();
	registry.register::<u32>();
	registry.register::<Likes>();

	for step in 0..4000 {
		let choice = match alive.is_empty() {
			true => 0,
			false => rng.gen_range(0..8),
		};

		match choice {
			0 | 1 => {
				let entity = registry.spawn();
				alive.push(entity);
				model.insert(entity, Expected::default());
			},
			2 => {
				let index = rng.gen_range(0..alive.len());
				let entity = alive.swap_remove(index);
				registry.despawn(entity).expect("Despawn failed");
				model.remove(&entity);
				for expected in model.values_mut() {
					expected.likes.remove(&entity);
				}
			},
			3 => {
				let entity = *alive.choose(&mut rng).unwrap();
				let value = Position {
					x: step as f32,
					y: 0.0,
				};
				let expected = model.get_mut(&entity).unwrap();
				let result = registry.add_component(entity, value);
				match expected.position {
					Some(_) => assert!(result.is_err()),
					None => {
						assert!(result.is_ok());
						expected.position = Some(value);
					},
				}
			},
			4 => {
				let entity = *alive.choose(&mut rng).unwrap();
				let expected = model.get_mut(&entity).unwrap();
				let result = registry.remove_component::<Position>(entity);
				assert_eq!(result.is_ok(), expected.position.take().is_some());
			},
			5 => {
				let entity = *alive.choose(&mut rng).unwrap();
				let expected = model.get_mut(&entity).unwrap();
				match expected.counter {
					Some(_) => {
						registry.remove_component::<u32>(entity).expect("Removing a counter failed");
						expected.counter = None;
					},
					None => {
						registry.add_component(entity, step).expect("Adding a counter failed");
						expected.counter = Some(step);
					},
				}
			},
			6 => {
				let entity = *alive.choose(&mut rng).unwrap();
				let target = *alive.choose(&mut rng).unwrap();
				let expected = model.get_mut(&entity).unwrap();
				let result = registry.add_relation(entity, target, Likes(step));
				match expected.likes.contains_key(&target) {
					true => assert!(result.is_err()),
					false => {
						assert!(result.is_ok());
						expected.likes.insert(target, Likes(step));
					},
				}
			},
			_ => {
				let entity = *alive.choose(&mut rng).unwrap();
				let expected = model.get_mut(&entity).unwrap();
				let target = match expected.likes.keys().next() {
					Some(target) => *target,
					None => continue,
				};
				registry.remove_relation::<Likes>(entity, target).expect("Removing a relation failed");
				expected.likes.remove(&target);
			},
		}

		if step % 250 == 0 {
			verify(&registry, &model);
		}
	}

	verify(&registry, &model);
}

#[test]
pub fn random_locked_batches_match_immediate_application() {
	let mut rng = StdRng::seed_from_u64(42);
	let mut immediate = EntityRegistry::new();
	let mut deferred = EntityRegistry::new();

	let a = immediate.spawn_many(32);
	let b = deferred.spawn_many(32);
	assert_eq!(a, b, "Fresh registries handed out different identities");

	for _ in 0..20 {
		let batch: Vec<(usize, bool)> = (0..16).map(|_| (rng.gen_range(0..32), rng.gen_bool(0.5))).collect();

		for (index, add) in &batch {
			let _ = match add {
				true => immediate.add_component(a[*index], *index as u32),
				false => immediate.remove_component::<u32>(a[*index]),
			};
		}

		{
			let mut lock = deferred.lock();
			for (index, add) in &batch {
				let _ = match add {
					true => lock.add_component(b[*index], *index as u32),
					false => lock.remove_component::<u32>(b[*index]),
				};
			}
		}

		for entity in &a {
			assert_eq!(immediate.has_component::<u32>(*entity), deferred.has_component::<u32>(*entity));
		}
		assert_invariants(&deferred);
	}
}
