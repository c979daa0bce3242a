use criterion::*;
use nalgebra_glm::{Mat4, Vec3};
use tessera_ecs::prelude::*;

const COUNT: usize = 10000;

#[derive(Default, Clone, Component)]
struct Transform(Mat4);

#[derive(Default, Clone, Component)]
struct Translation(Vec3);

#[derive(Default, Clone, Component)]
struct Rotation(Vec3);

#[derive(Default, Clone, Component)]
struct Velocity(Vec3);

#[derive(Default, Clone, Hash, Component)]
struct Layer(u8);

fn populate(world: &mut World, count: usize, layers: u8) -> Vec<Identity> {
    let entities = world.spawn_many(count);
    for (i, entity) in entities.iter().enumerate() {
        world.add_component(*entity, Transform::default()).unwrap();
        world.add_component(*entity, Translation::default()).unwrap();
        world.add_component(*entity, Rotation::default()).unwrap();
        world.add_component(*entity, Velocity(Vec3::new(1.0, 0.0, 0.0))).unwrap();
        if layers > 1 {
            world.add_link(*entity, Layer(i as u8 % layers)).unwrap();
        }
    }
    entities
}

fn query(world: &mut World) -> Query {
    world
        .query_builder()
        .has::<Transform>(Key::PLAIN)
        .has::<Translation>(Key::PLAIN)
        .has::<Rotation>(Key::PLAIN)
        .has::<Velocity>(Key::PLAIN)
        .compile()
        .unwrap()
}

fn stream() -> (Write<Transform>, Write<Translation>, Read<Velocity>, Read<Rotation>) {
    (Write::plain(), Write::plain(), Read::plain(), Read::plain())
}

fn create_entities(c: &mut Criterion) {
    c.bench_function("Create entities", |b| {
        b.iter_batched(
            World::new,
            |mut world| populate(&mut world, COUNT, 1),
            BatchSize::PerIteration,
        );
    });
}

fn destroy_entities(c: &mut Criterion) {
    c.bench_function("Destroy entities", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                let entities = populate(&mut world, COUNT, 1);
                (world, entities)
            },
            |(mut world, entities)| {
                for entity in entities {
                    world.despawn(entity).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });
}

fn iterate_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("Iterate entities");
    group.bench_function("Single-threaded", |b| {
        let mut world = World::new();
        populate(&mut world, COUNT, 1);
        let query = query(&mut world);
        let stream = stream();

        b.iter(|| {
            world
                .run(query, &stream, |_, (m, t, v, r)| {
                    for (((m, t), v), r) in m.iter_mut().zip(t.iter_mut()).zip(v).zip(r) {
                        t.0 += v.0;
                        m.0 = Mat4::new_translation(&t.0) * Mat4::new_rotation(r.0);
                    }
                })
                .unwrap()
        });
    });

    group.bench_function("Multi-threaded", |b| {
        let mut world = World::new();
        populate(&mut world, COUNT, 8);
        let query = query(&mut world);
        let stream = stream();

        b.iter(|| {
            world
                .run_parallel(query, &stream, |_, (m, t, v, r)| {
                    for (((m, t), v), r) in m.iter_mut().zip(t.iter_mut()).zip(v).zip(r) {
                        t.0 += v.0;
                        m.0 = Mat4::new_translation(&t.0) * Mat4::new_rotation(r.0);
                    }
                })
                .unwrap()
        });
    });
}

criterion_group!(
    benchmarks,
    create_entities,
    destroy_entities,
    iterate_entities,
);
criterion_main!(benchmarks);
