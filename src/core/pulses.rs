//! Linear/angular state and impulse integration for a single rigid body.

use glam::{Mat3, Vec3};

use crate::config::MAX_IMPULSE_COMPONENT;
use crate::utils::math::{renormalize_rotation, rodrigues, VectorAtPosition};

/// Caps on how far a body may move per substep, expressed as maximum
/// penetration distances. `INFINITY` disables a cap.
#[derive(Debug, Clone, Copy)]
pub struct PenetrationLimits {
    /// Maximum translation per substep, in meters.
    pub max_translation: f32,
    /// Maximum rotation per substep, in radians.
    pub max_rotation: f32,
}

impl Default for PenetrationLimits {
    fn default() -> Self {
        Self {
            max_translation: f32::INFINITY,
            max_rotation: f32::INFINITY,
        }
    }
}

impl PenetrationLimits {
    fn vmax(&self, dt: f32) -> f32 {
        self.max_translation / dt
    }

    fn wmax(&self, dt: f32) -> f32 {
        self.max_rotation / dt
    }
}

/// Per-body dynamic state: mass, inertia, center-of-mass velocity, angular
/// velocity, pose, and the lazily-maintained world-space inertia cache.
///
/// `mass == INFINITY` marks an immovable body. A diagonal body-space inertia
/// enables a fast path that also supports per-axis `INFINITY` (locked
/// rotational axes) without a full 3x3 solve.
#[derive(Debug, Clone)]
pub struct RigidBodyPulses {
    pub mass: f32,
    /// Body-space inertia tensor.
    i: Mat3,
    /// Center of mass, in body coordinates.
    com: Vec3,
    /// Velocity of the center of mass.
    pub v_com: Vec3,
    /// Angular velocity.
    pub w: Vec3,
    rotation: Mat3,
    /// World-space position of the center of mass.
    abs_com: Vec3,
    pub penetration_limits: PenetrationLimits,
    i_is_diagonal: bool,
    abs_i: Mat3,
    abs_i_inv: Mat3,
    #[cfg(debug_assertions)]
    abs_i_rotation: Mat3,
}

impl RigidBodyPulses {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mass: f32,
        i: Mat3,
        com: Vec3,
        v_com: Vec3,
        w: Vec3,
        position: Vec3,
        rotation: Mat3,
        i_is_diagonal: bool,
        penetration_limits: PenetrationLimits,
    ) -> Self {
        let mut rbp = Self {
            mass,
            i,
            com,
            v_com,
            w,
            rotation,
            abs_com: rotation * com + position,
            penetration_limits,
            i_is_diagonal,
            abs_i: Mat3::NAN,
            abs_i_inv: Mat3::NAN,
            #[cfg(debug_assertions)]
            abs_i_rotation: Mat3::NAN,
        };
        if !i_is_diagonal {
            rbp.update_abs_i_and_inv();
        }
        rbp
    }

    /// Convenience constructor for an immovable body at a fixed pose.
    pub fn stationary(position: Vec3, rotation: Mat3) -> Self {
        Self::new(
            f32::INFINITY,
            Mat3::from_diagonal(Vec3::splat(f32::INFINITY)),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            position,
            rotation,
            true,
            PenetrationLimits::default(),
        )
    }

    pub fn is_static(&self) -> bool {
        self.mass == f32::INFINITY
    }

    /// Euler-integrates the center of mass and applies an exponential-map
    /// rotation step, re-normalized through a Tait-Bryan round trip to
    /// bound numerical drift.
    pub fn advance_time(&mut self, dt: f32) {
        self.abs_com += dt * self.v_com;
        self.rotation = renormalize_rotation(rodrigues(dt * self.w) * self.rotation);
        if !self.i_is_diagonal {
            self.update_abs_i_and_inv();
        }
    }

    fn update_abs_i_and_inv(&mut self) {
        debug_assert!(!self.i_is_diagonal);
        #[cfg(debug_assertions)]
        {
            self.abs_i_rotation = self.rotation;
        }
        self.abs_i = self.rotation * self.i * self.rotation.transpose();
        self.abs_i_inv = self.abs_i.inverse();
    }

    fn abs_i(&self) -> &Mat3 {
        #[cfg(debug_assertions)]
        debug_assert!(self.abs_i_rotation == self.rotation);
        &self.abs_i
    }

    fn abs_i_inv(&self) -> &Mat3 {
        #[cfg(debug_assertions)]
        debug_assert!(self.abs_i_rotation == self.rotation);
        &self.abs_i_inv
    }

    /// Velocity of the body origin (not the center of mass).
    pub fn velocity(&self) -> Vec3 {
        self.v_com - self.w.cross(self.rotation * self.com)
    }

    pub fn velocity_at_position(&self, position: Vec3) -> Vec3 {
        self.v_com + self.w.cross(position - self.abs_com)
    }

    /// World-space position of the body origin.
    pub fn abs_position(&self) -> Vec3 {
        self.abs_com - self.rotation * self.com
    }

    pub fn abs_com(&self) -> Vec3 {
        self.abs_com
    }

    pub fn rotation(&self) -> Mat3 {
        self.rotation
    }

    pub fn abs_transformation(&self) -> (Mat3, Vec3) {
        (self.rotation, self.abs_position())
    }

    pub fn transform_to_world_coordinates(&self, v: Vec3) -> Vec3 {
        self.rotation * (v - self.com) + self.abs_com
    }

    /// The body's local Z axis in world coordinates.
    pub fn abs_z(&self) -> Vec3 {
        self.rotation.z_axis
    }

    pub fn set_pose(&mut self, rotation: Mat3, position: Vec3) {
        self.rotation = rotation;
        self.abs_com = rotation * self.com + position;
        if !self.i_is_diagonal {
            self.update_abs_i_and_inv();
        }
    }

    /// Solves `abs_I * y = x` for `y`. The diagonal fast path supports
    /// per-axis `INFINITY` in the body-space inertia.
    pub fn solve_abs_i(&self, x: Vec3) -> Vec3 {
        if self.i_is_diagonal {
            // R I R^T w = L  =>  w = R I^{-1} R^T L
            let iv = Vec3::new(self.i.x_axis.x, self.i.y_axis.y, self.i.z_axis.z);
            self.rotation * (self.rotation.transpose() * x / iv)
        } else {
            *self.abs_i_inv() * x
        }
    }

    /// Applies the world-space inertia tensor: `abs_I * x`.
    pub fn dot1d_abs_i(&self, x: Vec3) -> Vec3 {
        if self.i_is_diagonal {
            let iv = Vec3::new(self.i.x_axis.x, self.i.y_axis.y, self.i.z_axis.z);
            self.rotation * (iv * (self.rotation.transpose() * x))
        } else {
            *self.abs_i() * x
        }
    }

    pub fn integrate_gravity(&mut self, g: Vec3, dt: f32) {
        self.v_com += dt * g;
    }

    pub fn integrate_delta_v(&mut self, dv: Vec3, dt: f32) {
        self.v_com += dv;
        let vmax = self.penetration_limits.vmax(dt);
        if vmax != f32::INFINITY {
            let l = self.v_com.length();
            if l > vmax {
                self.v_com *= vmax / l;
            }
        }
    }

    pub fn integrate_delta_angular_momentum(&mut self, dl: Vec3, extra_w: f32, dt: f32) {
        self.w += (1.0 + extra_w) * self.solve_abs_i(dl);
        let wmax = self.penetration_limits.wmax(dt);
        if wmax != f32::INFINITY {
            let l = self.w.length();
            if l > wmax {
                self.w *= wmax / l;
            }
        }
    }

    /// Applies a linear+angular impulse at a world position.
    ///
    /// Panics if any impulse component exceeds the sanity bound; such
    /// impulses indicate numerical blow-up, not a recoverable condition.
    pub fn integrate_impulse(&mut self, j: VectorAtPosition, extra_w: f32, dt: f32) {
        if j.vector.abs().max_element() > MAX_IMPULSE_COMPONENT {
            panic!(
                "impulse out of bounds: {:?}, threshold: {}",
                j.vector, MAX_IMPULSE_COMPONENT
            );
        }
        self.integrate_delta_v(j.vector / self.mass, dt);
        self.integrate_delta_angular_momentum(
            (j.position - self.abs_com).cross(j.vector),
            extra_w,
            dt,
        );
    }

    /// Kinetic energy: `1/2 (m v^2 + w^T I w)`.
    pub fn energy(&self) -> f32 {
        0.5 * (self.mass * self.v_com.length_squared() + self.w.dot(self.dot1d_abs_i(self.w)))
    }

    /// Scalar mass seen by an impulse applied along `vp.vector` at
    /// `vp.position`, accounting for the induced rotation.
    pub fn effective_mass(&self, vp: &VectorAtPosition) -> f32 {
        let j2 = (vp.position - self.abs_com).cross(vp.vector);
        1.0 / (1.0 / self.mass + j2.dot(self.solve_abs_i(j2)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube_pulses(mass: f32) -> RigidBodyPulses {
        let i = Mat3::from_diagonal(Vec3::splat(mass / 6.0));
        RigidBodyPulses::new(
            mass,
            i,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Mat3::IDENTITY,
            true,
            PenetrationLimits::default(),
        )
    }

    #[test]
    fn central_impulse_only_translates() {
        let mut rbp = unit_cube_pulses(2.0);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: Vec3::new(4.0, 0.0, 0.0),
                position: rbp.abs_com(),
            },
            0.0,
            0.01,
        );
        assert_relative_eq!(rbp.v_com.x, 2.0);
        assert_relative_eq!(rbp.w.length(), 0.0);
    }

    #[test]
    fn offset_impulse_spins() {
        let mut rbp = unit_cube_pulses(2.0);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: Vec3::new(0.0, 1.0, 0.0),
                position: Vec3::new(1.0, 0.0, 0.0),
            },
            0.0,
            0.01,
        );
        assert!(rbp.w.z > 0.0);
    }

    #[test]
    #[should_panic(expected = "impulse out of bounds")]
    fn oversized_impulse_aborts() {
        let mut rbp = unit_cube_pulses(2.0);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: Vec3::new(2e5, 0.0, 0.0),
                position: Vec3::ZERO,
            },
            0.0,
            0.01,
        );
    }

    #[test]
    fn effective_mass_at_center_is_mass() {
        let rbp = unit_cube_pulses(3.0);
        let m = rbp.effective_mass(&VectorAtPosition {
            vector: Vec3::Y,
            position: rbp.abs_com(),
        });
        assert_relative_eq!(m, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn locked_axis_ignores_torque() {
        let i = Mat3::from_diagonal(Vec3::new(f32::INFINITY, 1.0, f32::INFINITY));
        let mut rbp = RigidBodyPulses::new(
            1.0,
            i,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Mat3::IDENTITY,
            true,
            PenetrationLimits::default(),
        );
        rbp.integrate_delta_angular_momentum(Vec3::new(1.0, 2.0, 3.0), 0.0, 0.01);
        assert_relative_eq!(rbp.w.x, 0.0);
        assert_relative_eq!(rbp.w.y, 2.0);
        assert_relative_eq!(rbp.w.z, 0.0);
    }

    #[test]
    fn set_pose_round_trip() {
        let mut rbp = unit_cube_pulses(1.0);
        let r = Mat3::from_rotation_y(0.7);
        let p = Vec3::new(1.0, 2.0, 3.0);
        rbp.set_pose(r, p);
        let back = rbp.abs_position();
        assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-6);
    }
}
