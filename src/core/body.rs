//! A simulated body: pulses, collision meshes, and mounted actuators.

use glam::{Mat3, Vec3};
use log::trace;

use crate::actuators::engine::{RigidBodyEngine, TirePowerIntent, VelocityClassification};
use crate::actuators::rotor::Rotor;
use crate::actuators::tire::Tire;
use crate::actuators::wing::Wing;
use crate::collision::mesh::CollisionMesh;
use crate::config::PhysicsConfig;
use crate::core::pulses::{PenetrationLimits, RigidBodyPulses};
use crate::utils::math::VectorAtPosition;

/// Rigid body with its collision meshes (in body coordinates), transformed
/// world-space copies, and optional drivetrain.
pub struct RigidBody {
    pub name: String,
    pub rbp: RigidBodyPulses,
    /// Collision meshes in body coordinates.
    pub meshes: Vec<CollisionMesh>,
    /// World-space meshes, refreshed at the start of every substep.
    pub transformed_meshes: Vec<CollisionMesh>,
    pub tires: Vec<Tire>,
    pub rotors: Vec<Rotor>,
    pub wings: Vec<Wing>,
    pub engine: Option<RigidBodyEngine>,
    /// Set while the body is attached to a grind rail; suppresses tire
    /// forces.
    pub grinding: bool,
    pub grind_direction: Vec3,
    /// Point (in body coordinates) that rail constraints attach to.
    pub grind_point: Vec3,
}

impl RigidBody {
    pub fn new(name: impl Into<String>, rbp: RigidBodyPulses, meshes: Vec<CollisionMesh>) -> Self {
        let mut body = Self {
            name: name.into(),
            rbp,
            transformed_meshes: Vec::with_capacity(meshes.len()),
            meshes,
            tires: Vec::new(),
            rotors: Vec::new(),
            wings: Vec::new(),
            engine: None,
            grinding: false,
            grind_direction: Vec3::ZERO,
            grind_point: Vec3::ZERO,
        };
        body.transform_meshes();
        body
    }

    /// A movable solid cuboid with uniform density.
    pub fn cuboid_body(
        name: impl Into<String>,
        mass: f32,
        half_extents: Vec3,
        position: Vec3,
    ) -> Self {
        let name = name.into();
        let e = 2.0 * half_extents;
        let i = Mat3::from_diagonal(
            mass / 12.0
                * Vec3::new(
                    e.y * e.y + e.z * e.z,
                    e.x * e.x + e.z * e.z,
                    e.x * e.x + e.y * e.y,
                ),
        );
        let rbp = RigidBodyPulses::new(
            mass,
            i,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            position,
            Mat3::IDENTITY,
            true,
            PenetrationLimits::default(),
        );
        let mesh = CollisionMesh::cuboid(
            name.clone(),
            crate::core::material::PhysicsMaterial::CONVEX
                | crate::core::material::PhysicsMaterial::VISIBLE,
            half_extents,
        );
        Self::new(name, rbp, vec![mesh])
    }

    /// An immovable body with no collision meshes (e.g. an anchor).
    pub fn stationary(name: impl Into<String>, position: Vec3) -> Self {
        Self::new(
            name,
            RigidBodyPulses::stationary(position, Mat3::IDENTITY),
            Vec::new(),
        )
    }

    /// An immovable body carrying a single mesh, e.g. terrain.
    pub fn static_mesh_body(name: impl Into<String>, mesh: CollisionMesh, position: Vec3) -> Self {
        Self::new(
            name,
            RigidBodyPulses::stationary(position, Mat3::IDENTITY),
            vec![mesh],
        )
    }

    /// Refreshes the world-space meshes from the current pose.
    pub fn transform_meshes(&mut self) {
        let (rotation, position) = self.rbp.abs_transformation();
        self.transformed_meshes.clear();
        for mesh in &self.meshes {
            self.transformed_meshes
                .push(mesh.transformed(rotation, position));
        }
    }

    /// Clears per-substep state. `substep == 0` additionally clears intents
    /// that are latched for a whole outer step.
    pub fn reset_forces(&mut self, substep: u32) {
        if let Some(engine) = &mut self.engine {
            engine.reset_forces();
        }
        if substep == 0 && !self.grinding {
            self.grind_direction = Vec3::ZERO;
        }
        self.grinding = false;
    }

    /// Applies a force over one substep as an impulse.
    pub fn integrate_force(&mut self, force: Vec3, position: Vec3, cfg: &PhysicsConfig) {
        let dt = cfg.dt_substeps();
        self.rbp.integrate_impulse(
            VectorAtPosition {
                vector: force * dt,
                position,
            },
            0.0,
            dt,
        );
    }

    /// Aerodynamic forces that apply without ground contact: rotor lift and
    /// wing lift/drag.
    pub fn collide_with_air(&mut self, cfg: &PhysicsConfig) {
        if self.rbp.is_static() {
            return;
        }
        let (rotation, _) = self.rbp.abs_transformation();
        let gravity_direction = cfg.gravity_vec().normalize_or_zero();
        for i in 0..self.rotors.len() {
            let intent = self.consume_rotor_surface_power(i);
            let rotor = &mut self.rotors[i];
            rotor.angular_velocity = intent.power.abs().sqrt().copysign(intent.power);
            if intent.intent_type == crate::actuators::engine::TirePowerIntentType::Accelerate {
                let axis = rotor.lift_axis(rotation, gravity_direction);
                let lift = axis * (intent.power * intent.relaxation * rotor.power2lift);
                let position = self
                    .rbp
                    .transform_to_world_coordinates(self.rotors[i].position);
                self.integrate_force(lift, position, cfg);
            }
        }
        let rbp_orig = self.rbp.clone();
        for i in 0..self.wings.len() {
            let wing = &self.wings[i];
            let position = rbp_orig.transform_to_world_coordinates(wing.position);
            let vel = rotation.transpose() * rbp_orig.velocity_at_position(position);
            let force = rotation * wing.force(vel, self.rbp.mass, cfg);
            self.integrate_force(force, position, cfg);
        }
    }

    pub fn advance_time(&mut self, dt: f32) {
        self.rbp.advance_time(dt);
        for tire in &mut self.tires {
            tire.advance_time(dt);
        }
        trace!(
            "body {} at {:?}",
            self.name,
            self.rbp.abs_position()
        );
    }

    pub fn abs_grind_point(&self) -> Vec3 {
        self.rbp.transform_to_world_coordinates(self.grind_point)
    }

    pub fn get_abs_tire_z(&self, tire_id: usize) -> Vec3 {
        self.rbp.rotation() * self.tires[tire_id].z()
    }

    pub fn get_abs_tire_position(&self, tire_id: usize) -> Vec3 {
        self.rbp
            .transform_to_world_coordinates(self.tires[tire_id].position)
    }

    /// World-space contact point at the bottom of the (possibly compressed)
    /// suspension.
    pub fn get_abs_tire_contact_position(&self, tire_id: usize) -> Vec3 {
        let tire = &self.tires[tire_id];
        self.rbp.transform_to_world_coordinates(
            tire.position + tire.vertical_line * (tire.radius + tire.shock_absorber_position),
        )
    }

    /// Body velocity at the tire contact, with the surface-normal component
    /// removed.
    pub fn get_velocity_at_tire_contact(&self, surface_normal: Vec3, tire_id: usize) -> Vec3 {
        let v = self
            .rbp
            .velocity_at_position(self.get_abs_tire_contact_position(tire_id));
        v - surface_normal * v.dot(surface_normal)
    }

    /// The spin the tire would have if it rolled without slipping.
    pub fn get_angular_velocity_at_tire(
        &self,
        surface_normal: Vec3,
        street_velocity: Vec3,
        tire_id: usize,
    ) -> f32 {
        let z = self.get_abs_tire_z(tire_id);
        let v = self.get_velocity_at_tire_contact(surface_normal, tire_id) - street_velocity;
        -v.dot(z) / self.tires[tire_id].radius
    }

    pub fn get_tire_angular_velocity(&self, tire_id: usize) -> f32 {
        self.tires[tire_id].angular_velocity
    }

    pub fn set_tire_angular_velocity(&mut self, tire_id: usize, w: f32) {
        self.tires[tire_id].angular_velocity = w;
    }

    pub fn consume_tire_surface_power(
        &mut self,
        tire_id: usize,
        velocity_classification: VelocityClassification,
    ) -> TirePowerIntent {
        let tire_w = self.tires[tire_id].angular_velocity;
        match &mut self.engine {
            Some(engine) => engine.consume_tire_power(tire_id, tire_w, velocity_classification),
            None => TirePowerIntent {
                power: 0.0,
                relaxation: 1.0,
                intent_type: crate::actuators::engine::TirePowerIntentType::Idle,
            },
        }
    }

    fn consume_rotor_surface_power(&mut self, rotor_id: usize) -> TirePowerIntent {
        let rotor_w = self.rotors[rotor_id].angular_velocity;
        match &mut self.engine {
            Some(engine) => engine.consume_tire_power(
                self.tires.len() + rotor_id,
                rotor_w,
                VelocityClassification::Slow,
            ),
            None => TirePowerIntent {
                power: 0.0,
                relaxation: 1.0,
                intent_type: crate::actuators::engine::TirePowerIntentType::Idle,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transformed_meshes_follow_pose() {
        let mut body = RigidBody::cuboid_body("box", 1.0, Vec3::splat(0.5), Vec3::ZERO);
        body.rbp.set_pose(Mat3::IDENTITY, Vec3::new(0.0, 3.0, 0.0));
        body.transform_meshes();
        let center = body.transformed_meshes[0].bounding_sphere.center;
        assert_relative_eq!(center.y, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn tire_contact_position_is_below_mount() {
        let mut body = RigidBody::cuboid_body("car", 1000.0, Vec3::new(1.0, 0.3, 2.0), Vec3::ZERO);
        body.tires
            .push(Tire::new(Vec3::new(0.8, -0.3, 1.5), 0.3, 1000.0, 1e5, 1e3));
        let mount = body.get_abs_tire_position(0);
        let contact = body.get_abs_tire_contact_position(0);
        assert_relative_eq!(contact.y, mount.y - 0.3, epsilon = 1e-6);
    }

    #[test]
    fn no_slip_angular_velocity_matches_forward_speed() {
        let mut body = RigidBody::cuboid_body("car", 1000.0, Vec3::new(1.0, 0.3, 2.0), Vec3::ZERO);
        body.tires
            .push(Tire::new(Vec3::new(0.8, -0.3, 1.5), 0.5, 1000.0, 1e5, 1e3));
        body.rbp.v_com = Vec3::new(0.0, 0.0, 4.0);
        let w = body.get_angular_velocity_at_tire(Vec3::Y, Vec3::ZERO, 0);
        assert_relative_eq!(w, -8.0, epsilon = 1e-5);
    }
}
