//! External force providers and controllables, polled once per substep.

use glam::Vec3;

use crate::config::PhysicsConfig;
use crate::core::body::RigidBody;
use crate::utils::Arena;

/// Injects forces into movable bodies at the start of every substep, before
/// collision detection runs. Implementors are registered with the engine.
pub trait ExternalForceProvider: Send {
    fn increment_external_forces(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        burn_in: bool,
        cfg: &PhysicsConfig,
    );
}

/// User-driven actuator state (steering, throttle). `notify_reset` is called
/// once per substep so implementors can refresh per-step intents.
pub trait Controllable: Send {
    fn notify_reset(&mut self, bodies: &mut Arena<RigidBody>, cfg: &PhysicsConfig);
}

/// Observers advanced after every substep integration: camera followers,
/// skid-mark emitters, audio sources.
pub trait AdvanceTime: Send {
    fn advance_time(&mut self, bodies: &mut Arena<RigidBody>, dt: f32);
}

/// Applies uniform gravity to every movable body.
pub struct GravityProvider;

impl ExternalForceProvider for GravityProvider {
    fn increment_external_forces(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        _burn_in: bool,
        cfg: &PhysicsConfig,
    ) {
        let g = cfg.gravity_vec();
        let dt = cfg.dt_substeps();
        for body in bodies.iter_mut() {
            if !body.rbp.is_static() {
                body.rbp.integrate_gravity(g, dt);
            }
        }
    }
}

/// Velocity-proportional damping acting on every movable body.
pub struct DragProvider {
    pub linear: f32,
    pub angular: f32,
}

impl ExternalForceProvider for DragProvider {
    fn increment_external_forces(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        _burn_in: bool,
        cfg: &PhysicsConfig,
    ) {
        let dt = cfg.dt_substeps();
        for body in bodies.iter_mut() {
            if body.rbp.is_static() {
                continue;
            }
            body.rbp.v_com *= (1.0 - dt * self.linear).max(0.0);
            body.rbp.w *= (1.0 - dt * self.angular).max(0.0);
        }
    }
}

/// A constant world-space force at a body-space offset, e.g. a thruster.
pub struct ConstantForceProvider {
    pub body: crate::utils::BodyId,
    pub force: Vec3,
    pub offset: Vec3,
}

impl ExternalForceProvider for ConstantForceProvider {
    fn increment_external_forces(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        _burn_in: bool,
        cfg: &PhysicsConfig,
    ) {
        if let Some(body) = bodies.get_mut(self.body) {
            let position = body.rbp.transform_to_world_coordinates(self.offset);
            body.integrate_force(self.force, position, cfg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gravity_accelerates_movable_bodies_only() {
        let mut bodies = Arena::new();
        let movable = bodies.insert(RigidBody::cuboid_body(
            "box",
            1.0,
            Vec3::splat(0.5),
            Vec3::ZERO,
        ));
        let fixed = bodies.insert(RigidBody::stationary("floor", Vec3::ZERO));
        let cfg = PhysicsConfig::default();
        GravityProvider.increment_external_forces(&mut bodies, false, &cfg);
        let vy = bodies.get(movable).map(|b| b.rbp.v_com.y).unwrap_or(0.0);
        assert!(vy < 0.0);
        assert_relative_eq!(vy, cfg.gravity[1] * cfg.dt_substeps(), epsilon = 1e-6);
        assert_relative_eq!(
            bodies.get(fixed).map(|b| b.rbp.v_com.y).unwrap_or(1.0),
            0.0
        );
    }
}
