//! Penalty-mode force models: stiction-limited surface friction and the
//! conversion of engine power into a drive force at a contact point.

use glam::Vec3;

use crate::utils::math::min_l2;

/// Solves `x_new^2 + y^2 = r^2` for `x_new`, shrinking the drive force `x`
/// so that its combination with the tangential force `y` stays inside the
/// stiction circle of radius `r`.
///
/// If no such `x_new` exists (`r < |y|`, the tangential force alone already
/// exceeds the circle) or `|x_new| > |x|`, `x` is returned unchanged.
fn correct_x_ortho(x: f32, y: f32, r: f32) -> f32 {
    const SAFETY_FACTOR: f32 = 0.99;
    if r < y.abs() {
        return x;
    }
    let xa = (r * r - y * y).sqrt();
    if xa > x.abs() {
        return x;
    }
    x.signum() * xa * SAFETY_FACTOR
}

/// Like [`correct_x_ortho`], but for a drive direction `n` that is not
/// orthogonal to the tangential force `t`:
/// `||t - a*n|| = r  =>  a = sqrt(r^2 - t.t + (t.n)^2) + t.n`.
fn correct_x_non_ortho(x: f32, n: Vec3, t: Vec3, r: f32) -> f32 {
    const SAFETY_FACTOR: f32 = 0.99;
    let tt = t.length_squared();
    let tn = t.dot(n);
    let v = r * r - tt + tn * tn;
    if v <= 0.0 {
        return 0.0;
    }
    let xa = v.sqrt() + tn;
    if xa > x.abs() {
        return x;
    }
    xa * SAFETY_FACTOR
}

/// Stiction-limited friction force against the slide velocity `v3` of a
/// contact point on static geometry. `alpha0` blends the force to zero
/// around standstill to avoid oscillation.
pub fn friction_force_infinite_mass(max_stiction_force: f32, v3: Vec3, alpha0: f32) -> Vec3 {
    let v_sq = v3.length_squared();
    let sn3 = if v_sq < 1e-12 {
        Vec3::ZERO
    } else {
        v3 / (v_sq.sqrt() + alpha0)
    };
    min_l2(-max_stiction_force * sn3, max_stiction_force)
}

/// Converts engine power into a drive force at a tire contact on static
/// geometry (`F = P / v`), adding stiction-limited tangential friction.
///
/// `P == NAN` requests braking: against `v3` at high speeds, proportional to
/// the longitudinal velocity below `hand_brake_velocity`. `avoid_burnout`
/// shrinks the drive force so the total force stays inside the stiction
/// circle instead of saturating it.
#[allow(clippy::too_many_arguments)]
pub fn power_to_force_infinite_mass(
    brake_force: f32,
    hand_brake_velocity: f32,
    max_stiction_force: f32,
    max_velocity: f32,
    n3: Vec3,
    mut p: f32,
    v3: Vec3,
    alpha0: f32,
    avoid_burnout: bool,
) -> Vec3 {
    let v = v3.dot(n3);

    let v3t = v3 - n3 * v;
    let vt_sq = v3t.length_squared();
    let sn3t = if vt_sq < 1e-12 {
        Vec3::ZERO
    } else {
        v3t / (vt_sq.sqrt() + alpha0)
    };
    let f3t = -max_stiction_force * sn3t;
    let ft = f3t.length();

    if !p.is_nan() && v.abs() > max_velocity.abs() && p.signum() * v > 0.0 {
        p = 0.0;
    }
    let normal_force;
    if !p.is_nan() && (p.signum() * v > 0.0 || ((p != 0.0) == (v.abs() < hand_brake_velocity))) {
        // Acceleration and rolling.
        let mut x = p / (v.abs() + 1e-6);
        if avoid_burnout {
            x = correct_x_ortho(x, ft, max_stiction_force);
        }
        normal_force = x * n3;
    } else if v.abs() >= hand_brake_velocity {
        // Braking at high velocities.
        let mut x = brake_force;
        let v3n = v3 / v3.length();
        if avoid_burnout {
            x = correct_x_non_ortho(x, v3n, f3t, max_stiction_force);
        }
        normal_force = x * -v3n;
    } else {
        // Braking at low velocities.
        let mut x = -brake_force * v / (v.abs() + alpha0);
        if avoid_burnout {
            x = correct_x_ortho(x, ft, max_stiction_force);
        }
        normal_force = x * n3;
    }
    min_l2(normal_force + f3t, max_stiction_force)
}

/// Force pair transferring power `power3` between two finite masses `m0`
/// (velocity `v0`) and `m1` (velocity `v1`) while conserving momentum.
///
/// From `solve([1/2*m*((v+F/m*t)^2-v^2) + 1/2*M*((V-F/M*t)^2-V^2)=P*t,
/// m*v + M*V = m*(v+F/m*t) + M*(V-F/M*t)], F)`.
pub fn power_to_forces_finite_masses(
    power3: Vec3,
    m0: f32,
    m1: f32,
    v0_3: Vec3,
    v1_3: Vec3,
    dt: f32,
) -> (Vec3, Vec3) {
    let p_sq = power3.length_squared();
    if p_sq < 1e-12 {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let p = p_sq.sqrt();
    let n = power3 / p;
    let v0 = v0_3.dot(n);
    let v1 = v1_3.dot(n);

    let mm = m0 * m1;
    let f_sqrt = (mm * mm * (v1 * v1 + v0 * v0) - 2.0 * mm * mm * v0 * v1
        + 2.0 * p * dt * (m0 * m1 * m1 + m0 * m0 * m1) * dt)
        .sqrt();
    let f_c = mm * (v0 - v1);
    let d = (m0 + m1) * dt;
    let f1 = if v0 > 0.0 {
        (f_c - f_sqrt) / d
    } else {
        (f_c + f_sqrt) / d
    };
    let f0 = if v1 > 0.0 {
        (f_c + f_sqrt) / d
    } else {
        (f_c - f_sqrt) / d
    };
    (f0 * n, f1 * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn friction_opposes_slide_velocity() {
        let f = friction_force_infinite_mass(10.0, Vec3::new(3.0, 0.0, 0.0), 0.1);
        assert!(f.x < 0.0);
        assert_relative_eq!(f.y, 0.0);
        assert!(f.length() <= 10.0 + 1e-5);
    }

    #[test]
    fn friction_vanishes_at_standstill() {
        let f = friction_force_infinite_mass(10.0, Vec3::ZERO, 0.1);
        assert_relative_eq!(f.length(), 0.0);
    }

    #[test]
    fn drive_force_is_power_over_velocity() {
        let f = power_to_force_infinite_mass(
            1e4,
            2.0,
            1e5,
            100.0,
            Vec3::X,
            1000.0,
            Vec3::new(10.0, 0.0, 0.0),
            0.1,
            false,
        );
        assert_relative_eq!(f.x, 1000.0 / 10.0, epsilon = 1.0);
    }

    #[test]
    fn braking_opposes_motion() {
        let f = power_to_force_infinite_mass(
            1e4,
            2.0,
            1e5,
            100.0,
            Vec3::X,
            f32::NAN,
            Vec3::new(10.0, 0.0, 0.0),
            0.1,
            false,
        );
        assert!(f.x < 0.0);
    }

    #[test]
    fn total_force_stays_inside_stiction_circle() {
        let f = power_to_force_infinite_mass(
            1e4,
            2.0,
            50.0,
            100.0,
            Vec3::X,
            1e6,
            Vec3::new(1.0, 0.0, 3.0),
            0.1,
            true,
        );
        assert!(f.length() <= 50.0 + 1e-4);
    }

    #[test]
    fn finite_mass_forces_are_opposite() {
        let (f0, f1) = power_to_forces_finite_masses(
            Vec3::new(100.0, 0.0, 0.0),
            10.0,
            5.0,
            Vec3::ZERO,
            Vec3::ZERO,
            0.01,
        );
        assert!(f0.x * f1.x <= 0.0);
        assert!(f0.length() > 0.0);
    }
}
