//! Drops a crate onto a floor and prints its pose while it settles.
//!
//! Run with `cargo run --example falling_crate`.

use contact_patch::collision::CollisionMesh;
use contact_patch::*;

fn main() {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());

    let floor = CollisionMesh::cuboid(
        "floor",
        PhysicsMaterial::CONCAVE | PhysicsMaterial::VISIBLE,
        Vec3::new(25.0, 0.5, 25.0),
    );
    let floor_id = engine
        .bodies
        .add(RigidBody::static_mesh_body("floor", floor, Vec3::new(0.0, -0.5, 0.0)));

    let crate_id = engine.bodies.add(RigidBody::cuboid_body(
        "crate",
        3.0,
        Vec3::splat(0.5),
        Vec3::new(0.0, 5.0, 0.0),
    ));
    let second_id = engine.bodies.add(RigidBody::cuboid_body(
        "second crate",
        3.0,
        Vec3::splat(0.5),
        Vec3::new(0.05, 7.5, 0.0),
    ));

    let gravity = engine.add_external_force_provider(Box::new(GravityProvider));

    for i in 0..=180 {
        if i % 15 == 0 {
            let body = engine.bodies.get(crate_id).unwrap();
            println!(
                "t = {:5.2} s  y = {:6.3} m  |v| = {:6.3} m/s",
                engine.time(),
                body.rbp.abs_position().y,
                body.rbp.velocity().length()
            );
        }
        engine.step();
        for event in engine.take_impact_events() {
            println!("impact: {event:?}");
        }
    }

    engine.remove_external_force_provider(gravity);
    engine.bodies.remove(second_id);
    engine.bodies.remove(crate_id);
    engine.bodies.remove(floor_id);
}
