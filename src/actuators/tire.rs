//! Wheel state: suspension, spin, and the slip curves that produce force.

use glam::{Mat3, Vec3};

use super::magic_formula::CombinedMagicFormula;

/// A wheel mounted on a rigid body. The tire probes the ground with a ray
/// along `vertical_line` and transfers engine power through its contact
/// patch.
#[derive(Debug, Clone)]
pub struct Tire {
    /// Mount point in body coordinates.
    pub position: Vec3,
    /// Steering angle around the body's vertical axis, in radians.
    pub angle: f32,
    /// Suspension ray direction in body coordinates.
    pub vertical_line: Vec3,
    pub radius: f32,
    pub brake_force: f32,
    /// Shock absorber spring constant.
    pub sks: f32,
    /// Shock absorber damping constant.
    pub ska: f32,
    /// Current suspension compression, negative when compressed.
    pub shock_absorber_position: f32,
    /// Spin speed in rad/s.
    pub angular_velocity: f32,
    /// Accumulated spin angle, for rendering.
    pub rotation_angle: f32,
    pub magic_formula: CombinedMagicFormula,
    pub stiction_coefficient: f32,
    pub friction_coefficient: f32,
}

impl Tire {
    pub fn new(position: Vec3, radius: f32, brake_force: f32, sks: f32, ska: f32) -> Self {
        Self {
            position,
            angle: 0.0,
            vertical_line: -Vec3::Y,
            radius,
            brake_force,
            sks,
            ska,
            shock_absorber_position: 0.0,
            angular_velocity: 0.0,
            rotation_angle: 0.0,
            magic_formula: CombinedMagicFormula::default(),
            stiction_coefficient: 2.0,
            friction_coefficient: 1.6,
        }
    }

    /// Rolling direction in body coordinates, rotated by the steering angle
    /// around the suspension axis.
    pub fn z(&self) -> Vec3 {
        Mat3::from_axis_angle(self.vertical_line, self.angle) * Vec3::Z
    }

    pub fn advance_time(&mut self, dt: f32) {
        self.rotation_angle = (self.rotation_angle + dt * self.angular_velocity)
            .rem_euclid(2.0 * std::f32::consts::PI);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn steering_rotates_rolling_direction() {
        let mut tire = Tire::new(Vec3::ZERO, 0.3, 1000.0, 1e5, 1e3);
        assert_relative_eq!(tire.z().z, 1.0);
        tire.angle = std::f32::consts::FRAC_PI_2;
        assert_relative_eq!(tire.z().x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(tire.z().z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn spin_accumulates_rotation_angle() {
        let mut tire = Tire::new(Vec3::ZERO, 0.3, 1000.0, 1e5, 1e3);
        tire.angular_velocity = 2.0;
        tire.advance_time(0.5);
        assert_relative_eq!(tire.rotation_angle, 1.0);
    }
}
