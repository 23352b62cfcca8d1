use contact_patch::collision::{sat::collision_plane, CollisionMesh};
use contact_patch::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn prepare_engine(body_count: usize) -> PhysicsEngine {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());
    let floor = CollisionMesh::cuboid(
        "floor",
        PhysicsMaterial::CONCAVE | PhysicsMaterial::VISIBLE,
        Vec3::new(100.0, 0.5, 100.0),
    );
    engine
        .bodies
        .add(RigidBody::static_mesh_body("floor", floor, Vec3::new(0.0, -0.5, 0.0)));
    let side = (body_count as f32).sqrt().ceil() as usize;
    for i in 0..body_count {
        let x = (i % side) as f32 * 1.5 - side as f32 * 0.75;
        let z = (i / side) as f32 * 1.5 - side as f32 * 0.75;
        engine.bodies.add(RigidBody::cuboid_body(
            format!("box {i}"),
            3.0,
            Vec3::splat(0.4),
            Vec3::new(x, 0.4 + (i % 7) as f32 * 0.01, z),
        ));
    }
    engine.add_external_force_provider(Box::new(GravityProvider));
    engine
}

fn bench_engine_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_step");
    for &count in &[4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("resting", count), &count, |b, &count| {
            let mut engine = prepare_engine(count);
            // Warm up so the measurement covers resting contacts rather
            // than the initial drop.
            for _ in 0..30 {
                engine.step();
            }
            b.iter(|| {
                engine.step();
                black_box(engine.time())
            })
        });
    }
    group.finish();
}

fn bench_collision_plane(c: &mut Criterion) {
    let mesh0 = CollisionMesh::cuboid("a", PhysicsMaterial::CONVEX, Vec3::splat(0.5));
    let mesh1 = CollisionMesh::cuboid("b", PhysicsMaterial::CONVEX, Vec3::splat(0.5))
        .transformed(Mat3::from_rotation_y(0.4), Vec3::new(0.7, 0.2, 0.1));
    c.bench_function("collision_plane", |b| {
        b.iter(|| collision_plane(black_box(&mesh0), black_box(&mesh1)))
    });
}

criterion_group!(benches, bench_engine_step, bench_collision_plane);
criterion_main!(benches);
