use approx::assert_relative_eq;
use contact_patch::utils::VectorAtPosition;
use contact_patch::*;

#[test]
fn set_pose_reproduces_the_requested_pose() {
    let mut body = RigidBody::cuboid_body("box", 3.0, Vec3::splat(0.5), Vec3::ZERO);
    let rotation = Mat3::from_rotation_y(0.3);
    let position = Vec3::new(1.0, 2.0, -3.0);
    body.rbp.set_pose(rotation, position);
    let (r, p) = body.rbp.abs_transformation();
    assert_relative_eq!(p.x, position.x, epsilon = 1e-6);
    assert_relative_eq!(p.y, position.y, epsilon = 1e-6);
    assert_relative_eq!(p.z, position.z, epsilon = 1e-6);
    assert_relative_eq!(r.x_axis.x, rotation.x_axis.x, epsilon = 1e-6);
    assert_relative_eq!(r.x_axis.z, rotation.x_axis.z, epsilon = 1e-6);
}

#[test]
fn velocity_at_position_combines_linear_and_angular_parts() {
    let mut body = RigidBody::cuboid_body("box", 1.0, Vec3::splat(0.5), Vec3::ZERO);
    body.rbp.v_com = Vec3::new(1.0, 0.0, 0.0);
    body.rbp.w = Vec3::new(0.0, 0.0, 2.0);
    let v = body.rbp.velocity_at_position(Vec3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(v.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(v.y, 2.0, epsilon = 1e-6);
    assert_relative_eq!(v.z, 0.0, epsilon = 1e-6);
}

#[test]
#[should_panic(expected = "impulse out of bounds")]
fn oversized_impulse_components_are_fatal() {
    let mut body = RigidBody::cuboid_body("box", 1.0, Vec3::splat(0.5), Vec3::ZERO);
    body.rbp.integrate_impulse(
        VectorAtPosition {
            vector: Vec3::new(2e5, 0.0, 0.0),
            position: Vec3::ZERO,
        },
        0.0,
        1.0 / 60.0,
    );
}

#[test]
fn static_bodies_ignore_impulses() {
    let mut body = RigidBody::stationary("anchor", Vec3::new(0.0, 3.0, 0.0));
    body.rbp.integrate_impulse(
        VectorAtPosition {
            vector: Vec3::new(100.0, 0.0, 0.0),
            position: Vec3::new(0.0, 3.0, 1.0),
        },
        0.0,
        1.0 / 60.0,
    );
    for _ in 0..60 {
        body.rbp.advance_time(1.0 / 60.0);
    }
    assert_relative_eq!(body.rbp.abs_position().y, 3.0, epsilon = 1e-6);
    assert_eq!(body.rbp.v_com, Vec3::ZERO);
    assert_eq!(body.rbp.w, Vec3::ZERO);
}

#[test]
fn effective_mass_shrinks_off_center() {
    let body = RigidBody::cuboid_body("box", 2.0, Vec3::splat(0.5), Vec3::ZERO);
    let through_com = body.rbp.effective_mass(&VectorAtPosition {
        vector: Vec3::Y,
        position: Vec3::ZERO,
    });
    let off_center = body.rbp.effective_mass(&VectorAtPosition {
        vector: Vec3::Y,
        position: Vec3::new(0.5, 0.0, 0.0),
    });
    assert_relative_eq!(through_com, 2.0, epsilon = 1e-4);
    assert!(
        off_center < through_com,
        "impulse with a lever arm should see less mass, got {off_center}"
    );
}
