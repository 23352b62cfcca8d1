use contact_patch::collision::{CollisionLine, CollisionMesh};
use contact_patch::*;

fn rail(engine: &mut PhysicsEngine) -> BodyId {
    let mesh = CollisionMesh::new(
        "rail",
        PhysicsMaterial::GRIND_LINE,
        Vec::new(),
        vec![CollisionLine::new(
            Vec3::new(-5.0, 1.0, 0.0),
            Vec3::new(5.0, 1.0, 0.0),
        )],
    );
    engine
        .bodies
        .add(RigidBody::static_mesh_body("rail", mesh, Vec3::ZERO))
}

fn board(engine: &mut PhysicsEngine) -> BodyId {
    let mut body = RigidBody::cuboid_body(
        "board",
        60.0,
        Vec3::splat(0.5),
        Vec3::new(0.0, 1.0, 0.0),
    );
    body.meshes.push(CollisionMesh::cuboid(
        "board underside",
        PhysicsMaterial::GRIND_CONTACT,
        Vec3::splat(0.5),
    ));
    engine.bodies.add(body)
}

#[test]
fn a_body_on_a_rail_starts_grinding() {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());
    rail(&mut engine);
    let board_id = board(&mut engine);
    engine.add_external_force_provider(Box::new(GravityProvider));
    engine.step();
    let body = engine.bodies.get(board_id).unwrap();
    assert!(body.grinding, "rail through the contact mesh should grind");
    assert!(
        body.grind_direction.x.abs() > 0.99,
        "grind direction should follow the rail, got {:?}",
        body.grind_direction
    );
}

#[test]
fn grinding_holds_the_body_on_the_rail() {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default());
    rail(&mut engine);
    let board_id = board(&mut engine);
    engine.add_external_force_provider(Box::new(GravityProvider));
    for _ in 0..60 {
        engine.step();
    }
    let body = engine.bodies.get(board_id).unwrap();
    let p = body.rbp.abs_position();
    assert!(
        (0.85..1.1).contains(&p.y),
        "rail constraint should carry the body, position = {p:?}"
    );
    assert!(
        p.z.abs() < 0.2,
        "rail constraint should keep the body centered, position = {p:?}"
    );
}
