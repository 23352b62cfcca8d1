//! Rotor: turns engine power into lift along the rotor axis.

use glam::{Mat3, Vec3};

use crate::utils::math::{rodrigues, signed_min, PidController};

/// How the rotor compensates for a tilted vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravityCorrection {
    #[default]
    None,
    /// Tilt the thrust axis toward the gravity vector, PID-damped and
    /// clamped to `max_align_to_gravity`.
    Gimbal,
}

#[derive(Debug, Clone)]
pub struct Rotor {
    /// Mount point in body coordinates.
    pub position: Vec3,
    /// Rotor frame in body coordinates; the thrust axis is its z column.
    pub rest_rotation: Mat3,
    /// Lift force per unit of surface power.
    pub power2lift: f32,
    pub radius: f32,
    /// Nominal spin when the engine delivers power, in rad/s.
    pub w: f32,
    /// Current spin, for rendering.
    pub angular_velocity: f32,
    pub gravity_correction: GravityCorrection,
    /// Maximum gimbal angle in radians.
    pub max_align_to_gravity: f32,
    pub align_to_gravity_pid_x: PidController,
    pub align_to_gravity_pid_y: PidController,
}

impl Rotor {
    pub fn new(position: Vec3, rest_rotation: Mat3, power2lift: f32, radius: f32, w: f32) -> Self {
        Self {
            position,
            rest_rotation,
            power2lift,
            radius,
            w,
            angular_velocity: 0.0,
            gravity_correction: GravityCorrection::None,
            max_align_to_gravity: 0.0,
            align_to_gravity_pid_x: PidController::new(0.8, 0.0, 0.1, 0.5),
            align_to_gravity_pid_y: PidController::new(0.8, 0.0, 0.1, 0.5),
        }
    }

    /// Thrust axis in body coordinates, without gravity correction.
    pub fn axis(&self) -> Vec3 {
        self.rest_rotation * Vec3::Z
    }

    /// World-space thrust direction for the current pose.
    pub fn lift_axis(&mut self, body_rotation: Mat3, gravity_direction: Vec3) -> Vec3 {
        let abs_rest = body_rotation * self.rest_rotation;
        if self.gravity_correction == GravityCorrection::None {
            return abs_rest * Vec3::Z;
        }
        let g = abs_rest.transpose() * gravity_direction;
        let g_len2 = g.length_squared();
        if g_len2 <= 1e-12 {
            return abs_rest * Vec3::Z;
        }
        let g = g / g_len2.sqrt();
        // Axis that rotates the thrust direction onto the gravity vector.
        let mut d = Vec3::Z.cross(g);
        d.x = self.align_to_gravity_pid_x.step(d.x);
        d.y = self.align_to_gravity_pid_y.step(d.y);
        let d_len2 = d.length_squared();
        if d_len2 <= 1e-12 {
            return abs_rest * Vec3::Z;
        }
        let d_len = d_len2.sqrt();
        let ang = d_len.clamp(0.0, 1.0).asin();
        let m = rodrigues(d / d_len * signed_min(ang, self.max_align_to_gravity));
        abs_rest * (m * Vec3::Z)
    }
}
