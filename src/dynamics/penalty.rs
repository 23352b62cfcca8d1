//! Penalty-based contact resolution: continuous forces proportional to the
//! squared penetration depth, scaled by how fast the contact is separating.

use glam::Vec3;
use log::warn;

use crate::actuators::engine::VelocityClassification;
use crate::config::PhysicsConfig;
use crate::core::body::RigidBody;
use crate::dynamics::friction::{friction_force_infinite_mass, power_to_force_infinite_mass};
use crate::utils::math::Interp;
use crate::utils::{Arena, BodyId};

/// Penetration record consumed by [`PenaltyResolver::resolve`]. The normal
/// is the surface normal of body 0, pointing toward body 1; `distance` is
/// the penetration depth.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyContact {
    pub body0: BodyId,
    pub body1: BodyId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    /// Tire of body 1 when the contact came from a wheel ray.
    pub tire_id: Option<usize>,
}

pub struct PenaltyResolver {
    /// Penalty scale over the separating velocity ("outness"): approaching
    /// contacts are pushed hard, separating ones barely at all.
    outness_fac: Interp,
}

impl Default for PenaltyResolver {
    fn default() -> Self {
        Self {
            outness_fac: Interp::new(
                vec![-1.0, 0.05, 0.2, 0.5],
                vec![1.5e3, 1e3, 1e1, 1.0],
            ),
        }
    }
}

impl PenaltyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &self,
        bodies: &mut Arena<RigidBody>,
        contact: &PenaltyContact,
        cfg: &PhysicsConfig,
    ) {
        if !contact.distance.is_finite() {
            warn!("skipping contact with non-finite penetration");
            return;
        }
        let (m0, m1) = match (bodies.get(contact.body0), bodies.get(contact.body1)) {
            (Some(b0), Some(b1)) => (b0.rbp.mass, b1.rbp.mass),
            _ => return,
        };
        let (frac0, frac1) = if m0 == f32::INFINITY && m1 == f32::INFINITY {
            return;
        } else if m0 == f32::INFINITY {
            (0.0, 1.0)
        } else if m1 == f32::INFINITY {
            (1.0, 0.0)
        } else {
            let frac0 = m1 / (m0 + m1);
            (frac0, 1.0 - frac0)
        };
        let normal = contact.normal;
        let mut dist = contact.distance;
        if let Some(tire_id) = contact.tire_id {
            let body1 = match bodies.get(contact.body1) {
                Some(b) => b,
                None => return,
            };
            let tire = &body1.tires[tire_id];
            dist = (dist - cfg.wheel_penetration_depth - tire.shock_absorber_position).max(0.0);
        } else {
            dist = dist.max(0.0);
        }
        // Predicted contact velocity one substep ahead.
        let v11 = {
            let body1 = match bodies.get(contact.body1) {
                Some(b) => b,
                None => return,
            };
            let mut rbp = body1.rbp.clone();
            rbp.advance_time(cfg.dt_substeps());
            rbp.velocity_at_position(contact.point)
        };
        let outness = normal.dot(v11);
        let fac = self.outness_fac.at(outness) * dist.min(0.25).powi(2);
        let force_n0 = fac * frac0 * m0;
        let force_n1 = fac * frac1 * m1;
        let v11_t = v11 - normal * outness;

        let mut motor_force = Vec3::ZERO;
        if let Some(tire_id) = contact.tire_id {
            if frac0 == 0.0 && frac1 != 0.0 {
                if let Some(body1) = bodies.get_mut(contact.body1) {
                    let mut n3 = body1.get_abs_tire_z(tire_id);
                    n3 -= normal * normal.dot(n3);
                    let len2 = n3.length_squared();
                    if len2 > 1e-12 {
                        n3 /= len2.sqrt();
                        let intent = body1.consume_tire_surface_power(
                            tire_id,
                            if v11_t.length() > cfg.hand_brake_velocity {
                                VelocityClassification::Fast
                            } else {
                                VelocityClassification::Slow
                            },
                        );
                        motor_force = power_to_force_infinite_mass(
                            body1.tires[tire_id].brake_force,
                            cfg.hand_brake_velocity,
                            cfg.stiction_coefficient * force_n1,
                            f32::INFINITY,
                            n3,
                            intent.power,
                            v11_t,
                            cfg.alpha0,
                            cfg.avoid_burnout,
                        );
                    }
                }
            }
        }
        if frac0 != 0.0 {
            if let Some(body0) = bodies.get_mut(contact.body0) {
                let mut force = -force_n0 * normal - motor_force;
                if frac1 == 0.0 && contact.tire_id.is_none() {
                    let v00 = body0.rbp.velocity_at_position(contact.point);
                    let v00_t = v00 - normal * normal.dot(v00);
                    force += friction_force_infinite_mass(
                        cfg.friction_coefficient * force_n0,
                        v00_t,
                        cfg.alpha0,
                    );
                }
                body0.integrate_force(force, contact.point, cfg);
            }
        }
        if frac1 != 0.0 {
            if let Some(body1) = bodies.get_mut(contact.body1) {
                let mut force = force_n1 * normal + motor_force;
                if frac0 == 0.0 && contact.tire_id.is_none() {
                    force += friction_force_infinite_mass(
                        cfg.friction_coefficient * force_n1,
                        v11_t,
                        cfg.alpha0,
                    );
                }
                body1.integrate_force(force, contact.point, cfg);
            }
        }
    }
}
