use contact_patch::collision::{CollisionLine, CollisionMesh};
use contact_patch::*;

fn ground(engine: &mut PhysicsEngine) {
    let mesh = CollisionMesh::cuboid(
        "ground",
        PhysicsMaterial::CONCAVE | PhysicsMaterial::VISIBLE,
        Vec3::new(25.0, 0.5, 25.0),
    );
    engine
        .bodies
        .add(RigidBody::static_mesh_body("ground", mesh, Vec3::new(0.0, -0.5, 0.0)));
}

/// A 1 t four-wheeled car whose wheel rays rest on the ground plane.
fn car(engine: &mut PhysicsEngine, max_surface_power: f32) -> BodyId {
    let mut body = RigidBody::cuboid_body(
        "car",
        1000.0,
        Vec3::new(1.0, 0.25, 2.0),
        Vec3::new(0.0, 0.52, 0.0),
    );
    let radius = 0.3;
    let ray_length = radius + engine.config().wheel_penetration_depth;
    let mut lines = Vec::new();
    for mount in [
        Vec3::new(-0.9, -0.25, -1.8),
        Vec3::new(0.9, -0.25, -1.8),
        Vec3::new(-0.9, -0.25, 1.8),
        Vec3::new(0.9, -0.25, 1.8),
    ] {
        body.tires.push(Tire::new(mount, radius, 1e4, 1e5, 2e3));
        lines.push(CollisionLine::new(mount, mount - Vec3::Y * ray_length));
    }
    body.meshes.push(CollisionMesh::new(
        "wheel rays",
        PhysicsMaterial::TIRE_LINE,
        Vec::new(),
        lines,
    ));
    body.engine = Some(RigidBodyEngine::new(max_surface_power));
    engine.bodies.add(body)
}

#[test]
fn suspension_carries_the_chassis() {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());
    ground(&mut engine);
    let car_id = car(&mut engine, 20000.0);
    engine.add_external_force_provider(Box::new(GravityProvider));
    for _ in 0..120 {
        engine.step();
    }
    let body = engine.bodies.get(car_id).unwrap();
    let y = body.rbp.abs_position().y;
    assert!(
        (0.45..0.60).contains(&y),
        "chassis should ride on its springs, y = {y}"
    );
    let speed = body.rbp.velocity().length();
    assert!(speed < 0.5, "car at rest should stay at rest, |v| = {speed}");
}

#[test]
fn driven_car_accelerates_along_its_rolling_direction() {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());
    ground(&mut engine);
    let car_id = car(&mut engine, 20000.0);
    engine.add_external_force_provider(Box::new(GravityProvider));
    if let Some(body) = engine.bodies.get_mut(car_id) {
        if let Some(drive) = &mut body.engine {
            drive.set_surface_power(EnginePowerIntent {
                surface_power: 10000.0,
                drive_relaxation: 1.0,
            });
        }
    }
    for _ in 0..120 {
        engine.step();
    }
    let body = engine.bodies.get(car_id).unwrap();
    let v = body.rbp.velocity();
    assert!(
        v.z.abs() > 1.0,
        "driven car should pick up speed, v = {v:?}"
    );
    assert!(
        v.x.abs() < 0.3 * v.z.abs(),
        "straight wheels should not pull sideways, v = {v:?}"
    );
    let y = body.rbp.abs_position().y;
    assert!(
        (0.3..0.8).contains(&y),
        "chassis should stay on its springs while driving, y = {y}"
    );
}

#[test]
fn penalty_solver_keeps_a_dropped_cuboid_above_the_ground() {
    let mut cfg = PhysicsConfig::default();
    cfg.solver_strategy = SolverStrategy::Penalty;
    let mut engine = PhysicsEngine::new(cfg);
    ground(&mut engine);
    let box_id = engine.bodies.add(RigidBody::cuboid_body(
        "box",
        3.0,
        Vec3::splat(0.5),
        Vec3::new(0.0, 1.5, 0.0),
    ));
    engine.add_external_force_provider(Box::new(GravityProvider));
    for _ in 0..180 {
        engine.step();
    }
    let body = engine.bodies.get(box_id).unwrap();
    let y = body.rbp.abs_position().y;
    assert!(
        (0.2..0.6).contains(&y),
        "penalty forces should balance gravity, y = {y}"
    );
    let speed = body.rbp.velocity().length();
    assert!(speed < 2.0, "penalty contact should settle, |v| = {speed}");
}
