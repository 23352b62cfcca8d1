//! Wing: velocity-dependent lift and drag in the body frame.

use glam::Vec3;

use crate::config::PhysicsConfig;
use crate::utils::math::Interp;

/// A lifting surface mounted at `position` in body coordinates, aligned
/// with the body frame: x spanwise, y up, z forward.
#[derive(Debug, Clone)]
pub struct Wing {
    pub position: Vec3,
    /// Per-axis quadratic drag.
    pub drag_coefficients: Vec3,
    /// Lift per squared forward speed.
    pub lift_coefficient: f32,
    /// Pitch-induced lift per squared forward speed.
    pub angle_of_attack: f32,
    pub angle_coefficient_yz: f32,
    /// Airbrake deflection.
    pub brake_angle: f32,
    pub angle_coefficient_zz: f32,
    /// Effectiveness over airspeed, e.g. to fade lift in near-stall
    /// conditions.
    pub fac: Interp,
}

impl Wing {
    pub fn new(position: Vec3, drag_coefficients: Vec3, lift_coefficient: f32) -> Self {
        Self {
            position,
            drag_coefficients,
            lift_coefficient,
            angle_of_attack: 0.0,
            angle_coefficient_yz: 0.0,
            brake_angle: 0.0,
            angle_coefficient_zz: 0.0,
            fac: Interp::new(vec![0.0], vec![1.0]),
        }
    }

    /// Aerodynamic force in body coordinates for the body-frame air
    /// velocity `vel`, clamped to `mass * max_aerodynamic_acceleration`.
    pub fn force(&self, vel: Vec3, mass: f32, cfg: &PhysicsConfig) -> Vec3 {
        let lvel = vel.length();
        let svel2 = lvel * vel;
        let drag = -self.drag_coefficients * svel2;
        let fac = self.fac.at(lvel);
        let force = fac
            * Vec3::new(
                drag.x,
                drag.y - svel2.z * self.angle_of_attack * self.angle_coefficient_yz
                    + vel.z * vel.z * self.lift_coefficient,
                drag.z - svel2.z * self.brake_angle.abs() * self.angle_coefficient_zz,
            );
        let thr = mass * cfg.max_aerodynamic_acceleration;
        force.clamp(Vec3::splat(-thr), Vec3::splat(thr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_speed_produces_lift_and_drag() {
        let cfg = PhysicsConfig::default();
        let wing = Wing::new(Vec3::ZERO, Vec3::splat(0.01), 0.5);
        let f = wing.force(Vec3::new(0.0, 0.0, 30.0), 1000.0, &cfg);
        assert!(f.y > 0.0);
        assert!(f.z < 0.0);
    }

    #[test]
    fn force_is_clamped_by_mass() {
        let mut cfg = PhysicsConfig::default();
        cfg.max_aerodynamic_acceleration = 1.0;
        let wing = Wing::new(Vec3::ZERO, Vec3::splat(0.01), 0.5);
        let f = wing.force(Vec3::new(0.0, 0.0, 300.0), 2.0, &cfg);
        assert!(f.abs().max_element() <= 2.0 + 1e-3);
    }

    #[test]
    fn airbrake_adds_backward_force() {
        let cfg = PhysicsConfig::default();
        let mut wing = Wing::new(Vec3::ZERO, Vec3::ZERO, 0.0);
        wing.brake_angle = 0.4;
        wing.angle_coefficient_zz = 0.1;
        let f = wing.force(Vec3::new(0.0, 0.0, 30.0), 1000.0, &cfg);
        assert!(f.z < 0.0);
    }
}
