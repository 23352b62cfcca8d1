//! Tire contact constraint: converts engine power intents into clamped
//! friction impulses through the slip curves.

use glam::Vec3;
use log::trace;

use super::engine::{TirePowerIntent, TirePowerIntentType, VelocityClassification};
use super::magic_formula::MagicFormulaMode;
use crate::config::{PhysicsConfig, SteeringType, MAX_TIRE_FORCE};
use crate::core::body::RigidBody;
use crate::dynamics::constraints::{BoundedShockAbsorberConstraint, FrictionContact1};
use crate::utils::math::{signed_min, VectorAtPosition};
use crate::utils::BodyId;

fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Spin that puts the longitudinal slip at the peak of the slip curve.
/// Returns the spin delta and the current surface speed at the contact.
fn optimal_angular_velocity(
    body: &RigidBody,
    street_velocity: Vec3,
    relaxation: f32,
    surface_normal: Vec3,
    cfg: &PhysicsConfig,
    tire_id: usize,
    direction: f32,
) -> (f32, f32) {
    let tire = &body.tires[tire_id];
    let vv =
        body.get_angular_velocity_at_tire(surface_normal, street_velocity, tire_id) * tire.radius;
    let y = cfg.hand_brake_velocity.max(vv.abs());
    let m = direction * tire.magic_formula.longitudinal.argmax;
    ((relaxation * m * y - vv) / tire.radius, vv)
}

fn check_force_bounds(force_min: f32, force_max: f32) -> (f32, f32) {
    if force_min > force_max || force_min.abs() > MAX_TIRE_FORCE || force_max.abs() > MAX_TIRE_FORCE
    {
        panic!("tire force bounds invalid: [{force_min}, {force_max}]");
    }
    (force_min, force_max)
}

// F = P / v, scaled up on the outer (faster) wheel so the per-wheel power
// stays roughly constant when turning.
#[allow(clippy::too_many_arguments)]
fn accelerate(
    body: &mut RigidBody,
    street_velocity: Vec3,
    power: f32,
    relaxation: f32,
    vc: Vec3,
    v0: f32,
    surface_normal: Vec3,
    cfg: &PhysicsConfig,
    tire_id: usize,
    direction: f32,
) -> (f32, f32) {
    let mut u = 1.0;
    if direction * v0 > 1e-12 {
        let vc2 = vc.length_squared();
        if vc2 > 1e-12 {
            u = (direction * v0 / vc2.sqrt()).clamp(0.1, 10.0);
        }
    }
    let (w, v) = optimal_angular_velocity(
        body,
        street_velocity,
        relaxation,
        surface_normal,
        cfg,
        tire_id,
        direction,
    );
    body.set_tire_angular_velocity(tire_id, -w);
    if direction > 0.0 {
        check_force_bounds(u * power / v.min(-0.001), 0.0)
    } else {
        check_force_bounds(0.0, -u * power / v.max(0.001))
    }
}

fn brake(
    body: &mut RigidBody,
    street_velocity: Vec3,
    relaxation: f32,
    surface_normal: Vec3,
    cfg: &PhysicsConfig,
    tire_id: usize,
    direction: f32,
) -> (f32, f32) {
    let (w, _) = optimal_angular_velocity(
        body,
        street_velocity,
        relaxation,
        surface_normal,
        cfg,
        tire_id,
        direction,
    );
    if sign(body.get_tire_angular_velocity(tire_id)) != sign(-w) {
        body.set_tire_angular_velocity(tire_id, 0.0);
    } else {
        body.set_tire_angular_velocity(tire_id, -w);
    }
    let brake_force = body.tires[tire_id].brake_force;
    if direction > 0.0 {
        check_force_bounds(-brake_force, 0.0)
    } else {
        check_force_bounds(0.0, brake_force)
    }
}

fn idle(
    body: &mut RigidBody,
    street_velocity: Vec3,
    surface_normal: Vec3,
    tire_id: usize,
) -> (f32, f32) {
    let w = body.get_angular_velocity_at_tire(surface_normal, street_velocity, tire_id);
    body.set_tire_angular_velocity(tire_id, w);
    (0.0, 0.0)
}

/// Turns a power intent into longitudinal force bounds and updates the
/// tire's spin. `v0` is the surface speed along the rolling direction.
#[allow(clippy::too_many_arguments)]
fn handle_tire_power_intent(
    power: &TirePowerIntent,
    body: &mut RigidBody,
    street_velocity: Vec3,
    vc: Vec3,
    v0: f32,
    surface_normal: Vec3,
    cfg: &PhysicsConfig,
    tire_id: usize,
) -> (f32, f32) {
    let steered = match cfg.steering_type {
        SteeringType::Car => true,
        SteeringType::Tank => false,
    };
    let (force_min, force_max) = if !power.power.is_nan() {
        if power.power != 0.0 {
            if power.intent_type == TirePowerIntentType::BrakeOrIdle {
                if v0 > 0.0 && power.power > 0.0 {
                    brake(
                        body,
                        street_velocity,
                        power.relaxation,
                        surface_normal,
                        cfg,
                        tire_id,
                        1.0,
                    )
                } else if v0 < 0.0 && power.power < 0.0 {
                    brake(
                        body,
                        street_velocity,
                        power.relaxation,
                        surface_normal,
                        cfg,
                        tire_id,
                        -1.0,
                    )
                } else {
                    idle(body, street_velocity, surface_normal, tire_id)
                }
            } else {
                accelerate(
                    body,
                    street_velocity,
                    power.power,
                    power.relaxation,
                    if steered { vc } else { Vec3::ZERO },
                    if steered { v0 } else { 0.0 },
                    surface_normal,
                    cfg,
                    tire_id,
                    sign(power.power),
                )
            }
        } else {
            idle(body, street_velocity, surface_normal, tire_id)
        }
    } else if v0 > 0.0 {
        brake(
            body,
            street_velocity,
            power.relaxation,
            surface_normal,
            cfg,
            tire_id,
            1.0,
        )
    } else if v0 < 0.0 {
        brake(
            body,
            street_velocity,
            power.relaxation,
            surface_normal,
            cfg,
            tire_id,
            -1.0,
        )
    } else {
        idle(body, street_velocity, surface_normal, tire_id)
    };
    check_force_bounds(force_min, force_max)
}

/// Contact of a tire with static geometry. Owns the suspension constraint
/// and the friction constraint riding on its accumulated normal impulse.
#[derive(Debug, Clone)]
pub struct TireContact1 {
    pub body: BodyId,
    pub tire_id: usize,
    pub sc: BoundedShockAbsorberConstraint,
    pub fci: FrictionContact1,
    pub surface_stiction_factor: f32,
    power: TirePowerIntent,
    /// Center-of-mass velocity with the surface normal projected out.
    vc: Vec3,
    /// Rolling direction with the surface normal projected out, normalized.
    n3: Vec3,
    /// Surface speed along the rolling direction.
    v0: f32,
    /// Velocity of the street surface at the contact.
    b0: Vec3,
}

impl TireContact1 {
    /// Returns `None` when the rolling direction is parallel to the surface
    /// normal (the tire lies flat on its side).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        body_id: BodyId,
        body: &mut RigidBody,
        tire_id: usize,
        street_velocity: Vec3,
        sc: BoundedShockAbsorberConstraint,
        fci: FrictionContact1,
        surface_stiction_factor: f32,
        cfg: &PhysicsConfig,
    ) -> Option<Self> {
        let normal = sc.constraint.normal_impulse.normal;
        let mut n3 = body.get_abs_tire_z(tire_id);
        n3 -= normal * n3.dot(normal);
        let len2 = n3.length_squared();
        if len2 <= 1e-12 {
            return None;
        }
        n3 /= len2.sqrt();
        let v0 =
            -(body.get_velocity_at_tire_contact(normal, tire_id) - street_velocity).dot(n3);
        let mut vc = body.rbp.velocity();
        vc -= normal * vc.dot(normal);
        let power = body.consume_tire_surface_power(
            tire_id,
            if v0.abs() > cfg.hand_brake_velocity {
                VelocityClassification::Fast
            } else {
                VelocityClassification::Slow
            },
        );
        Some(Self {
            body: body_id,
            tire_id,
            sc,
            fci,
            surface_stiction_factor,
            power,
            vc,
            n3,
            v0,
            b0: street_velocity,
        })
    }

    pub fn solve(&mut self, body: &mut RigidBody, cfg: &PhysicsConfig, dt: f32, relaxation: f32) {
        let normal = self.sc.constraint.normal_impulse.normal;
        // Suspension impulse first; the friction clamp below reads the
        // accumulated normal impulse.
        {
            let sc = self.sc.constraint;
            let f = sc.ks * sc.distance
                + sc.ka * body.rbp.velocity_at_position(self.fci.point).dot(normal);
            let j = self
                .sc
                .clamped_lambda(f * dt / cfg.solver_iterations.max(1) as f32);
            body.rbp.integrate_impulse(
                VectorAtPosition {
                    vector: -normal * (sc.fit * j),
                    position: self.fci.point,
                },
                0.0,
                dt,
            );
        }
        if body.grinding {
            return;
        }
        let (force_min, force_max) = handle_tire_power_intent(
            &self.power,
            body,
            self.b0,
            self.vc,
            self.v0,
            normal,
            cfg,
            self.tire_id,
        );
        let tire = &body.tires[self.tire_id];
        let tv = self.n3 * (tire.angular_velocity * tire.radius);
        self.fci.b = self.b0 - tv;
        let vv = body.get_velocity_at_tire_contact(normal, self.tire_id) - self.b0;
        let vvx = vv.dot(self.n3);
        // slip = (surface speed + tread speed) / surface speed
        let slip = (vvx + tv.dot(self.n3)) / cfg.hand_brake_velocity.max(vvx.abs());
        let sin_lateral_slip_angle = {
            let ccc = (vv.length_squared() - vvx * vvx).max(0.0);
            let hb = vvx.abs() + (cfg.hand_brake_velocity - vvx.abs()).max(0.0);
            let bbb = hb * hb;
            (1.0 - bbb / (ccc + bbb)).max(0.0).sqrt()
        };
        let ef = cfg.max_extra_friction.min(sin_lateral_slip_angle);
        let ew = cfg.max_extra_w.min(sin_lateral_slip_angle);
        self.fci.set_extras(ef, ef, ew);
        let normal_lambda_total = self.sc.constraint.normal_impulse.lambda_total;
        let lambda_max =
            -normal_lambda_total * tire.stiction_coefficient * self.surface_stiction_factor;
        let (r0, r1) = tire.magic_formula.call(
            (slip, sin_lateral_slip_angle.asin()),
            if cfg.no_slip {
                MagicFormulaMode::NoSlip
            } else {
                MagicFormulaMode::Standard
            },
        );
        let (r0, r1) = (r0 * lambda_max, r1 * lambda_max);
        trace!(
            "tire {} slip {slip} lateral {sin_lateral_slip_angle} r ({r0}, {r1})",
            self.tire_id
        );
        let dt_sub = cfg.dt_substeps();
        self.fci.set_clamping(
            self.n3,
            signed_min(force_min * dt_sub, r0.abs()),
            signed_min(force_max * dt_sub, r0.abs()),
            r1.abs(),
        );
        self.fci
            .solve(&mut body.rbp, normal, normal_lambda_total, dt, relaxation);
    }
}
