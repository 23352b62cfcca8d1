//! Additional math helpers layered on top of `glam`.

use glam::{EulerRot, Mat3, Quat, Vec3};

/// A vector (force or impulse) applied at a world-space position.
#[derive(Debug, Clone, Copy)]
pub struct VectorAtPosition {
    pub vector: Vec3,
    pub position: Vec3,
}

/// Exponential-map (Rodrigues) rotation step for an angular-velocity
/// integral `w * dt`.
pub fn rodrigues(w_dt: Vec3) -> Mat3 {
    let angle = w_dt.length();
    if angle < 1e-12 {
        return Mat3::IDENTITY;
    }
    Mat3::from_axis_angle(w_dt / angle, angle)
}

/// Re-orthonormalizes a rotation matrix by round-tripping through
/// Tait-Bryan angles, bounding the numerical drift of repeated
/// incremental rotations.
pub fn renormalize_rotation(rotation: Mat3) -> Mat3 {
    let q = Quat::from_mat3(&rotation);
    let (y, x, z) = q.to_euler(EulerRot::YXZ);
    Mat3::from_euler(EulerRot::YXZ, y, x, z)
}

/// Any unit vector orthogonal to `v`.
pub fn arbitrary_orthogonal(v: Vec3) -> Vec3 {
    let mut t = v.cross(Vec3::X);
    if t.length_squared() <= 1e-6 {
        t = v.cross(Vec3::Y);
    }
    t.normalize_or_zero()
}

/// Clamps the length of `v` to `max_length`, preserving direction.
pub fn min_l2(v: Vec3, max_length: f32) -> Vec3 {
    let len2 = v.length_squared();
    if len2 > max_length * max_length {
        v * (max_length / len2.sqrt())
    } else {
        v
    }
}

/// Clamps the magnitude of `v` to `max_abs`, preserving sign.
pub fn signed_min(v: f32, max_abs: f32) -> f32 {
    v.signum() * v.abs().min(max_abs)
}

/// Piecewise-linear interpolation over sorted sample points, clamped at
/// both ends.
#[derive(Debug, Clone)]
pub struct Interp {
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl Interp {
    pub fn new(xs: Vec<f32>, ys: Vec<f32>) -> Self {
        assert_eq!(xs.len(), ys.len());
        assert!(!xs.is_empty());
        Self { xs, ys }
    }

    pub fn at(&self, x: f32) -> f32 {
        if x <= self.xs[0] {
            return self.ys[0];
        }
        let last = self.xs.len() - 1;
        if x >= self.xs[last] {
            return self.ys[last];
        }
        let i = self.xs.partition_point(|&v| v < x);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Proportional-integral-derivative controller with state.
#[derive(Debug, Clone)]
pub struct PidController {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Exponential smoothing factor for the integral term.
    pub alpha: f32,
    integral: f32,
    previous: Option<f32>,
}

impl PidController {
    pub fn new(kp: f32, ki: f32, kd: f32, alpha: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            alpha,
            integral: 0.0,
            previous: None,
        }
    }

    pub fn step(&mut self, e: f32) -> f32 {
        self.integral = (1.0 - self.alpha) * self.integral + e;
        let d = match self.previous {
            Some(p) => e - p,
            None => 0.0,
        };
        self.previous = Some(e);
        self.kp * e + self.ki * self.integral + self.kd * d
    }
}
