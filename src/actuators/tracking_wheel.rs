//! Tracked wheel: a ring of persistent contact springs.
//!
//! Each ground contact is latched into a spring anchored at its first point
//! of contact. The springs pull the wheel back toward their anchors until
//! the spring force exceeds the stiction budget, at which point the anchor
//! slides and the spring reports slip.

use glam::{Mat3, Vec3};

use crate::core::pulses::RigidBodyPulses;
use crate::utils::math::{PidController, VectorAtPosition};

#[derive(Debug, Clone)]
struct TrackingSpring {
    active: bool,
    /// Set by `notify_intersection`, cleared by `update_position`.
    found: bool,
    /// Contact point in body coordinates.
    position: Vec3,
    /// Surface normal in body coordinates.
    normal: Vec3,
    /// Anchor the spring pulls toward, in body coordinates.
    point_of_contact: Vec3,
    pid: PidController,
}

/// Per-step summary returned by [`TrackingWheel::update_position`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingWheelUpdate {
    pub power_internal: f32,
    pub power_external: f32,
    pub moment: f32,
    /// True when more than half of the active springs slipped.
    pub slipping: bool,
}

#[derive(Debug, Clone)]
pub struct TrackingWheel {
    pub rotation_axis: Vec3,
    radius: f32,
    springs: Vec<TrackingSpring>,
    max_dist: f32,
    w: f32,
    angle_x: f32,
    sum_stiction_force: f32,
    sum_friction_force: f32,
    old_pose: Option<(Mat3, Vec3)>,
}

impl TrackingWheel {
    pub fn new(rotation_axis: Vec3, radius: f32, nsprings: usize, max_dist: f32, dt: f32) -> Self {
        Self {
            rotation_axis,
            radius,
            springs: vec![
                TrackingSpring {
                    active: false,
                    found: false,
                    position: Vec3::ZERO,
                    normal: Vec3::ZERO,
                    point_of_contact: Vec3::ZERO,
                    pid: PidController::new(1.0, 0.0, 0.1 / dt, 0.0),
                };
                nsprings
            ],
            max_dist,
            w: 0.0,
            angle_x: 0.0,
            sum_stiction_force: 0.0,
            sum_friction_force: 0.0,
            old_pose: None,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn w(&self) -> f32 {
        self.w
    }

    pub fn set_w(&mut self, w: f32) {
        self.w = w;
    }

    pub fn angle_x(&self) -> f32 {
        self.angle_x
    }

    /// Latches a ground contact onto an existing nearby spring, or claims a
    /// free one.
    pub fn notify_intersection(
        &mut self,
        rotation: Mat3,
        translation: Vec3,
        pt_absolute: Vec3,
        normal: Vec3,
        stiction_force: f32,
        friction_force: f32,
    ) {
        self.sum_stiction_force += stiction_force;
        self.sum_friction_force += friction_force;
        let max_dist2 = self.max_dist * self.max_dist;
        let local_pt = rotation.transpose() * (pt_absolute - translation);
        let local_normal = rotation.transpose() * normal;
        for s in &mut self.springs {
            if !s.active {
                continue;
            }
            if (s.position - s.point_of_contact).length_squared() > max_dist2 {
                s.active = false;
            } else if (rotation * s.position + translation - pt_absolute).length_squared()
                < max_dist2
            {
                s.found = true;
                s.position = local_pt;
                s.normal = local_normal;
                // Keep the anchor on the contact plane.
                s.point_of_contact +=
                    s.normal * s.normal.dot(s.position - s.point_of_contact);
                return;
            }
        }
        if let Some(s) = self.springs.iter_mut().find(|s| !s.active) {
            s.active = true;
            s.found = true;
            s.position = local_pt;
            s.normal = local_normal;
            s.point_of_contact = local_pt;
        }
    }

    /// Applies all spring forces and advances the tread. `velocity` is the
    /// body velocity at the wheel, `power_axis` the world-space rolling
    /// direction.
    #[allow(clippy::too_many_arguments)]
    pub fn update_position(
        &mut self,
        rotation: Mat3,
        translation: Vec3,
        power_axis: Vec3,
        velocity: Vec3,
        spring_constant: f32,
        dt: f32,
        rbp: &mut RigidBodyPulses,
    ) -> TrackingWheelUpdate {
        let (old_rotation, old_translation) =
            *self.old_pose.get_or_insert((rotation, translation));
        self.angle_x = (self.angle_x + self.w * dt) % (2.0 * std::f32::consts::PI);
        let mut result = TrackingWheelUpdate::default();
        let mut nactive = 0usize;
        for s in &mut self.springs {
            if s.active {
                if !s.found {
                    s.active = false;
                } else {
                    nactive += 1;
                }
            }
        }
        if nactive == 0 {
            self.finish_step(rotation, translation);
            return result;
        }
        let k = spring_constant / self.springs.len() as f32;
        let stiction = self.sum_stiction_force / nactive as f32;
        let friction = self.sum_friction_force / nactive as f32;
        let mut nslipping = 0usize;
        for s in &mut self.springs {
            if !s.active {
                continue;
            }
            // Carry the anchor through the body's movement since the last
            // step, staying on the contact plane.
            {
                let mut dir = rotation.transpose() * (old_translation - translation);
                dir -= s.normal * dir.dot(s.normal);
                s.point_of_contact += dir;
            }
            let mut d = s.position - s.point_of_contact;
            d -= s.normal * s.normal.dot(d);
            let len = d.length();
            let mut slip = false;
            let mut force = Vec3::ZERO;
            if len > 1e-9 {
                let dir = d / len;
                let mut magnitude = k * s.pid.step(len).max(0.0);
                if magnitude > stiction {
                    slip = true;
                    magnitude = friction;
                    // Let the anchor trail behind at the kinetic-friction
                    // stretch.
                    s.point_of_contact = s.position - dir * (friction / k);
                }
                force = -dir * magnitude;
            }
            nslipping += slip as usize;
            let abs_pos = rotation * s.position + translation;
            let abs_force = rotation * force;
            rbp.integrate_impulse(
                VectorAtPosition {
                    vector: abs_force * dt,
                    position: abs_pos,
                },
                0.0,
                dt,
            );
            // P = F * v
            let cmoment = abs_force.dot(power_axis) * s.position.length();
            result.moment += cmoment;
            result.power_internal += cmoment * self.w;
            result.power_external -= abs_force.dot(velocity);
            // Advance the anchor opposite to the tread movement.
            {
                let mut np = rotation.transpose() * power_axis;
                np -= s.normal * s.normal.dot(np);
                let l2 = np.length_squared();
                if l2 > 1e-9 {
                    np /= l2.sqrt();
                    s.point_of_contact -= np * (self.w * self.radius * dt);
                }
            }
        }
        result.slipping = nslipping > nactive / 2;
        self.finish_step(rotation, translation);
        result
    }

    fn finish_step(&mut self, rotation: Mat3, translation: Vec3) {
        self.sum_stiction_force = 0.0;
        self.sum_friction_force = 0.0;
        for s in &mut self.springs {
            s.found = false;
        }
        self.old_pose = Some((rotation, translation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pulses::PenetrationLimits;
    use approx::assert_relative_eq;

    fn wheel_body(position: Vec3) -> RigidBodyPulses {
        RigidBodyPulses::new(
            50.0,
            Mat3::from_diagonal(Vec3::splat(5.0)),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            position,
            Mat3::IDENTITY,
            true,
            PenetrationLimits::default(),
        )
    }

    #[test]
    fn springs_resist_displacement() {
        let dt = 1.0 / 60.0;
        let mut wheel = TrackingWheel::new(Vec3::X, 0.4, 8, 0.2, dt);
        let mut rbp = wheel_body(Vec3::new(0.0, 0.4, 0.0));
        let contact = Vec3::ZERO;
        wheel.notify_intersection(Mat3::IDENTITY, rbp.abs_position(), contact, Vec3::Y, 500.0, 400.0);
        wheel.update_position(
            Mat3::IDENTITY,
            rbp.abs_position(),
            Vec3::Z,
            Vec3::ZERO,
            1e4,
            dt,
            &mut rbp,
        );
        // Anchor and contact coincide, no force yet.
        assert_relative_eq!(rbp.v_com.z, 0.0);
        // Move the wheel forward; the latched spring now pulls back.
        let moved = rbp.abs_position() + Vec3::new(0.0, 0.0, 0.05);
        wheel.notify_intersection(
            Mat3::IDENTITY,
            moved,
            contact + Vec3::new(0.0, 0.0, 0.05),
            Vec3::Y,
            500.0,
            400.0,
        );
        let r = wheel.update_position(
            Mat3::IDENTITY,
            moved,
            Vec3::Z,
            Vec3::ZERO,
            1e4,
            dt,
            &mut rbp,
        );
        assert!(rbp.v_com.z < 0.0);
        assert!(!r.slipping);
    }

    #[test]
    fn overloaded_springs_report_slip() {
        let dt = 1.0 / 60.0;
        let mut wheel = TrackingWheel::new(Vec3::X, 0.4, 4, 0.5, dt);
        let mut rbp = wheel_body(Vec3::new(0.0, 0.4, 0.0));
        let contact = Vec3::ZERO;
        wheel.notify_intersection(Mat3::IDENTITY, rbp.abs_position(), contact, Vec3::Y, 1.0, 0.5);
        wheel.update_position(
            Mat3::IDENTITY,
            rbp.abs_position(),
            Vec3::Z,
            Vec3::ZERO,
            1e5,
            dt,
            &mut rbp,
        );
        let moved = rbp.abs_position() + Vec3::new(0.0, 0.0, 0.2);
        wheel.notify_intersection(
            Mat3::IDENTITY,
            moved,
            contact + Vec3::new(0.0, 0.0, 0.2),
            Vec3::Y,
            1.0,
            0.5,
        );
        let r = wheel.update_position(
            Mat3::IDENTITY,
            moved,
            Vec3::Z,
            Vec3::ZERO,
            1e5,
            dt,
            &mut rbp,
        );
        assert!(r.slipping);
    }

    #[test]
    fn tread_advance_tracks_spin() {
        let dt = 0.5;
        let mut wheel = TrackingWheel::new(Vec3::X, 0.4, 4, 0.5, dt);
        wheel.set_w(2.0);
        let mut rbp = wheel_body(Vec3::ZERO);
        wheel.update_position(
            Mat3::IDENTITY,
            Vec3::ZERO,
            Vec3::Z,
            Vec3::ZERO,
            1e4,
            dt,
            &mut rbp,
        );
        assert_relative_eq!(wheel.angle_x(), 1.0);
    }
}
