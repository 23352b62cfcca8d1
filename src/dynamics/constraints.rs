//! Sequential-impulse contact constraints.
//!
//! From: Erin Catto, Modeling and Solving Constraints
//!       Erin Catto, Fast and Simple Physics using Sequential Impulses
//!       Marijn Tamis, Giuseppe Maggiore, Constraint based physics solver

use glam::Vec3;

use crate::actuators::tire_contact::TireContact1;
use crate::config::{PhysicsConfig, MAX_CLAMPING, MAX_LAMBDA};
use crate::core::body::RigidBody;
use crate::core::pulses::RigidBodyPulses;
use crate::utils::math::{min_l2, VectorAtPosition};
use crate::utils::{Arena, BodyId};

/// Accumulated impulse magnitude along a contact normal. Shared between a
/// normal (or shock-absorber) constraint and the friction constraint that
/// rides on top of it.
#[derive(Debug, Clone, Copy)]
pub struct NormalImpulse {
    /// Points toward the body the constraint acts on.
    pub normal: Vec3,
    pub lambda_total: f32,
}

impl NormalImpulse {
    pub fn new(normal: Vec3) -> Self {
        Self {
            normal,
            lambda_total: 0.0,
        }
    }
}

fn clamped_lambda(lambda_total: &mut f32, lambda: f32, lambda_min: f32, lambda_max: f32) -> f32 {
    let lambda = (*lambda_total + lambda).clamp(lambda_min, lambda_max) - *lambda_total;
    if lambda.abs() > MAX_LAMBDA {
        panic!("lambda out of bounds: {lambda}");
    }
    *lambda_total += lambda;
    if lambda_total.abs() > MAX_LAMBDA {
        panic!("lambda total out of bounds: {lambda_total}");
    }
    lambda
}

/// One-sided contact along a normal, stabilized by Baumgarte position bias.
#[derive(Debug, Clone, Copy)]
pub struct PlaneInequalityConstraint {
    pub normal_impulse: NormalImpulse,
    pub overlap: f32,
    /// Target normal velocity, e.g. the surface velocity of a conveyor.
    pub b: f32,
    pub slop: f32,
    pub beta: f32,
}

impl PlaneInequalityConstraint {
    fn bias(&self) -> f32 {
        (self.overlap - self.slop).max(0.0)
    }

    pub fn v(&self, dt: f32) -> f32 {
        self.b + self.beta / dt * self.bias()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedPlaneInequalityConstraint {
    pub constraint: PlaneInequalityConstraint,
    pub lambda_min: f32,
    pub lambda_max: f32,
}

impl BoundedPlaneInequalityConstraint {
    pub fn clamped_lambda(&mut self, lambda: f32) -> f32 {
        clamped_lambda(
            &mut self.constraint.normal_impulse.lambda_total,
            lambda,
            self.lambda_min,
            self.lambda_max,
        )
    }
}

/// Pulls `p0` on a body toward the world-space anchor `p1`.
#[derive(Debug, Clone, Copy)]
pub struct PointEqualityConstraint {
    pub p0: Vec3,
    pub p1: Vec3,
    pub beta: f32,
}

impl PointEqualityConstraint {
    pub fn v(&self, dt: f32) -> f32 {
        self.beta / dt
    }

    pub fn bias(&self, dt: f32) -> Vec3 {
        self.beta / dt * (self.p1 - self.p0)
    }
}

/// Point constraint with an optional free direction (a rail).
#[derive(Debug, Clone, Copy)]
pub struct LineEqualityConstraint {
    pub pec: PointEqualityConstraint,
    /// `None` pins the point fully, `Some` leaves movement along the
    /// direction unconstrained.
    pub null_space: Option<Vec3>,
}

/// Two-sided constraint restricting movement along a plane normal.
#[derive(Debug, Clone, Copy)]
pub struct PlaneEqualityConstraint {
    pub pec: PointEqualityConstraint,
    pub plane_normal: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedPlaneEqualityConstraint {
    pub constraint: PlaneEqualityConstraint,
    pub lambda_total: f32,
    pub lambda_min: f32,
    pub lambda_max: f32,
}

impl BoundedPlaneEqualityConstraint {
    pub fn clamped_lambda(&mut self, lambda: f32) -> f32 {
        clamped_lambda(
            &mut self.lambda_total,
            lambda,
            self.lambda_min,
            self.lambda_max,
        )
    }
}

/// Spring/damper acting along a contact normal, scaled by how well the
/// suspension ray fits the surface normal.
#[derive(Debug, Clone, Copy)]
pub struct ShockAbsorberConstraint {
    pub normal_impulse: NormalImpulse,
    pub fit: f32,
    pub distance: f32,
    pub ks: f32,
    pub ka: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedShockAbsorberConstraint {
    pub constraint: ShockAbsorberConstraint,
    pub lambda_min: f32,
    pub lambda_max: f32,
}

impl BoundedShockAbsorberConstraint {
    pub fn clamped_lambda(&mut self, lambda: f32) -> f32 {
        clamped_lambda(
            &mut self.constraint.normal_impulse.lambda_total,
            lambda,
            self.lambda_min,
            self.lambda_max,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrictionClamping {
    pub direction: Vec3,
    pub min: f32,
    pub max: f32,
    pub ortho_max_l2: f32,
}

/// Stiction/kinetic friction coefficient pair. Friction contacts driven by a
/// tire model carry `None` and are limited through [`FrictionClamping`]
/// instead.
#[derive(Debug, Clone, Copy)]
pub struct FrictionCoefficients {
    pub stiction: f32,
    pub friction: f32,
}

/// Tangential friction for a single movable body on static geometry.
#[derive(Debug, Clone)]
pub struct FrictionContact1 {
    pub point: Vec3,
    /// Velocity of the surface at the contact point.
    pub b: Vec3,
    pub coefficients: Option<FrictionCoefficients>,
    pub clamping: Option<FrictionClamping>,
    pub extra_stiction: f32,
    pub extra_friction: f32,
    pub extra_w: f32,
    pub lambda_total: Vec3,
}

impl FrictionContact1 {
    pub fn new(point: Vec3, b: Vec3, coefficients: Option<FrictionCoefficients>) -> Self {
        Self {
            point,
            b,
            coefficients,
            clamping: None,
            extra_stiction: 0.0,
            extra_friction: 0.0,
            extra_w: 0.0,
            lambda_total: Vec3::ZERO,
        }
    }

    pub fn set_clamping(&mut self, direction: Vec3, min: f32, max: f32, ortho_max_l2: f32) {
        if min > max || min.abs() > MAX_CLAMPING || max.abs() > MAX_CLAMPING {
            panic!("friction clamping out of bounds: [{min}, {max}]");
        }
        self.clamping = Some(FrictionClamping {
            direction,
            min,
            max,
            ortho_max_l2,
        });
    }

    pub fn set_extras(&mut self, extra_stiction: f32, extra_friction: f32, extra_w: f32) {
        self.extra_stiction = extra_stiction;
        self.extra_friction = extra_friction;
        self.extra_w = extra_w;
    }

    fn max_impulse_stiction(&self, c: &FrictionCoefficients, normal_lambda_total: f32) -> f32 {
        (-(c.stiction * (1.0 + self.extra_stiction)) * normal_lambda_total).max(0.0)
    }

    fn max_impulse_friction(&self, c: &FrictionCoefficients, normal_lambda_total: f32) -> f32 {
        (-(c.friction * (1.0 + self.extra_friction)) * normal_lambda_total).max(0.0)
    }

    pub fn solve(
        &mut self,
        rbp: &mut RigidBodyPulses,
        normal: Vec3,
        normal_lambda_total: f32,
        dt: f32,
        relaxation: f32,
    ) {
        let mut v3 = rbp.velocity_at_position(self.point) - self.b;
        v3 -= normal * v3.dot(normal);
        let vl2 = v3.length_squared();
        if vl2 > 1e-12 {
            let v = vl2.sqrt();
            let n3 = v3 / v;
            let mc = rbp.effective_mass(&VectorAtPosition {
                vector: n3,
                position: self.point,
            });
            let lambda_total_old = self.lambda_total;
            self.lambda_total += relaxation * mc * v * n3;
            if let Some(c) = self.clamping {
                let ld = self.lambda_total.dot(c.direction);
                let lt = self.lambda_total - ld * c.direction;
                self.lambda_total =
                    ld.clamp(c.min, c.max) * c.direction + min_l2(lt, c.ortho_max_l2);
            }
            if let Some(c) = self.coefficients {
                let max_stiction = self.max_impulse_stiction(&c, normal_lambda_total);
                let ll2 = self.lambda_total.length_squared();
                if ll2 > max_stiction * max_stiction {
                    self.lambda_total *=
                        self.max_impulse_friction(&c, normal_lambda_total) / ll2.sqrt();
                }
            }
            let lambda = self.lambda_total - lambda_total_old;
            rbp.integrate_impulse(
                VectorAtPosition {
                    vector: -lambda,
                    position: self.point,
                },
                self.extra_w,
                dt,
            );
        }
    }
}

/// Tangential friction between two movable bodies.
#[derive(Debug, Clone)]
pub struct FrictionContact2 {
    pub point: Vec3,
    pub b: Vec3,
    pub coefficients: FrictionCoefficients,
    pub lambda_total: Vec3,
}

impl FrictionContact2 {
    pub fn new(point: Vec3, coefficients: FrictionCoefficients) -> Self {
        Self {
            point,
            b: Vec3::ZERO,
            coefficients,
            lambda_total: Vec3::ZERO,
        }
    }

    pub fn solve(
        &mut self,
        rbp0: &mut RigidBodyPulses,
        rbp1: &mut RigidBodyPulses,
        normal: Vec3,
        normal_lambda_total: f32,
        dt: f32,
        relaxation: f32,
    ) {
        let mut v3 =
            rbp0.velocity_at_position(self.point) - rbp1.velocity_at_position(self.point) - self.b;
        v3 -= normal * v3.dot(normal);
        let vl2 = v3.length_squared();
        if vl2 > 1e-12 {
            let v = vl2.sqrt();
            let n3 = v3 / v;
            let mc0 = rbp0.effective_mass(&VectorAtPosition {
                vector: n3,
                position: self.point,
            });
            let mc1 = rbp1.effective_mass(&VectorAtPosition {
                vector: n3,
                position: self.point,
            });
            let lambda_total_old = self.lambda_total;
            self.lambda_total += relaxation * (mc0 * mc1 / (mc0 + mc1)) * v * n3;
            let max_stiction =
                (-self.coefficients.stiction * normal_lambda_total).max(0.0);
            let ll2 = self.lambda_total.length_squared();
            if ll2 > max_stiction * max_stiction {
                let max_friction = (-self.coefficients.friction * normal_lambda_total).max(0.0);
                self.lambda_total *= max_friction / ll2.sqrt();
            }
            let lambda = self.lambda_total - lambda_total_old;
            rbp0.integrate_impulse(
                VectorAtPosition {
                    vector: -lambda,
                    position: self.point,
                },
                0.0,
                dt,
            );
            rbp1.integrate_impulse(
                VectorAtPosition {
                    vector: lambda,
                    position: self.point,
                },
                0.0,
                dt,
            );
        }
    }
}

/// Normal contact of one movable body against static geometry.
#[derive(Debug, Clone)]
pub struct NormalContact1 {
    pub body: BodyId,
    pub point: Vec3,
    pub pc: BoundedPlaneInequalityConstraint,
    pub friction: Option<FrictionContact1>,
}

impl NormalContact1 {
    pub fn solve(&mut self, rbp: &mut RigidBodyPulses, dt: f32, relaxation: f32) {
        let normal = self.pc.constraint.normal_impulse.normal;
        let v = rbp.velocity_at_position(self.point).dot(normal);
        let mc = rbp.effective_mass(&VectorAtPosition {
            vector: normal,
            position: self.point,
        });
        let lambda = -mc * (-v + self.pc.constraint.v(dt));
        let lambda = self.pc.clamped_lambda(relaxation * lambda);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: -normal * lambda,
                position: self.point,
            },
            0.0,
            dt,
        );
        if let Some(friction) = &mut self.friction {
            friction.solve(
                rbp,
                normal,
                self.pc.constraint.normal_impulse.lambda_total,
                dt,
                relaxation,
            );
        }
    }
}

/// Normal contact between two movable bodies. The stored normal points from
/// body 1 toward body 0.
#[derive(Debug, Clone)]
pub struct NormalContact2 {
    pub bodies: [BodyId; 2],
    pub point: Vec3,
    pub pc: BoundedPlaneInequalityConstraint,
    pub friction: Option<FrictionContact2>,
}

impl NormalContact2 {
    pub fn solve(
        &mut self,
        rbp0: &mut RigidBodyPulses,
        rbp1: &mut RigidBodyPulses,
        dt: f32,
        relaxation: f32,
    ) {
        let normal = self.pc.constraint.normal_impulse.normal;
        let v0 = rbp0.velocity_at_position(self.point).dot(normal);
        let v1 = rbp1.velocity_at_position(self.point).dot(normal);
        let mc0 = rbp0.effective_mass(&VectorAtPosition {
            vector: normal,
            position: self.point,
        });
        let mc1 = rbp1.effective_mass(&VectorAtPosition {
            vector: normal,
            position: self.point,
        });
        let lambda = -(mc0 * mc1 / (mc0 + mc1)) * (-v0 + v1 + self.pc.constraint.v(dt));
        let lambda = self.pc.clamped_lambda(relaxation * lambda);
        rbp0.integrate_impulse(
            VectorAtPosition {
                vector: -normal * lambda,
                position: self.point,
            },
            0.0,
            dt,
        );
        rbp1.integrate_impulse(
            VectorAtPosition {
                vector: normal * lambda,
                position: self.point,
            },
            0.0,
            dt,
        );
        if let Some(friction) = &mut self.friction {
            friction.solve(
                rbp0,
                rbp1,
                normal,
                self.pc.constraint.normal_impulse.lambda_total,
                dt,
                relaxation,
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShockAbsorberContact1 {
    pub body: BodyId,
    pub point: Vec3,
    pub sc: BoundedShockAbsorberConstraint,
}

impl ShockAbsorberContact1 {
    pub fn solve(&mut self, rbp: &mut RigidBodyPulses, dt: f32, niterations: u32) {
        let sc = self.sc.constraint;
        let f = sc.ks * sc.distance
            + sc.ka * rbp.velocity_at_position(self.point).dot(sc.normal_impulse.normal);
        let j = self.sc.clamped_lambda(f * dt / niterations.max(1) as f32);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: -sc.normal_impulse.normal * (sc.fit * j),
                position: self.point,
            },
            0.0,
            dt,
        );
    }
}

#[derive(Debug, Clone)]
pub struct PlaneContact1 {
    pub body: BodyId,
    /// Velocity of the constraining geometry.
    pub v1: Vec3,
    pub pec: BoundedPlaneEqualityConstraint,
}

impl PlaneContact1 {
    pub fn solve(&mut self, rbp: &mut RigidBodyPulses, dt: f32, relaxation: f32) {
        let pec = self.pec.constraint;
        let v0 = rbp.velocity_at_position(pec.pec.p0);
        let dv = -v0 + self.v1 + pec.pec.bias(dt);
        let dv_len = dv.dot(pec.plane_normal);
        let mc = rbp.effective_mass(&VectorAtPosition {
            vector: pec.plane_normal,
            position: pec.pec.p0,
        });
        let lambda = self.pec.clamped_lambda(relaxation * -mc * dv_len);
        rbp.integrate_impulse(
            VectorAtPosition {
                vector: -pec.plane_normal * lambda,
                position: pec.pec.p0,
            },
            0.0,
            dt,
        );
    }
}

#[derive(Debug, Clone)]
pub struct PlaneContact2 {
    pub bodies: [BodyId; 2],
    pub pec: BoundedPlaneEqualityConstraint,
}

impl PlaneContact2 {
    pub fn solve(
        &mut self,
        rbp0: &mut RigidBodyPulses,
        rbp1: &mut RigidBodyPulses,
        dt: f32,
        relaxation: f32,
    ) {
        let pec = self.pec.constraint;
        let v0 = rbp0.velocity_at_position(pec.pec.p0);
        let v1 = rbp1.velocity_at_position(pec.pec.p1);
        let dv = -v0 + v1 + pec.pec.bias(dt);
        let dv_len = dv.dot(pec.plane_normal);
        let mc0 = rbp0.effective_mass(&VectorAtPosition {
            vector: pec.plane_normal,
            position: pec.pec.p0,
        });
        let mc1 = rbp1.effective_mass(&VectorAtPosition {
            vector: pec.plane_normal,
            position: pec.pec.p1,
        });
        let lambda = self
            .pec
            .clamped_lambda(relaxation * -(mc0 * mc1 / (mc0 + mc1)) * dv_len);
        rbp0.integrate_impulse(
            VectorAtPosition {
                vector: -pec.plane_normal * lambda,
                position: pec.pec.p0,
            },
            0.0,
            dt,
        );
        rbp1.integrate_impulse(
            VectorAtPosition {
                vector: pec.plane_normal * lambda,
                position: pec.pec.p1,
            },
            0.0,
            dt,
        );
    }
}

/// Point or rail constraint for a single body (the rail leaves one direction
/// free).
#[derive(Debug, Clone)]
pub struct LineContact1 {
    pub body: BodyId,
    pub v1: Vec3,
    pub lec: LineEqualityConstraint,
}

impl LineContact1 {
    pub fn solve(&mut self, rbp: &mut RigidBodyPulses, dt: f32, relaxation: f32) {
        let v0 = rbp.velocity_at_position(self.lec.pec.p0);
        let mut dv = -v0 + self.v1 + self.lec.pec.bias(dt);
        if let Some(line_direction) = self.lec.null_space {
            dv -= dv.dot(line_direction) * line_direction;
        }
        let len2 = dv.length_squared();
        if len2 > 1e-12 {
            let n = dv / len2.sqrt();
            let mc = rbp.effective_mass(&VectorAtPosition {
                vector: n,
                position: self.lec.pec.p0,
            });
            rbp.integrate_impulse(
                VectorAtPosition {
                    vector: relaxation * mc * dv,
                    position: self.lec.pec.p0,
                },
                0.0,
                dt,
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineContact2 {
    pub bodies: [BodyId; 2],
    pub lec: LineEqualityConstraint,
}

impl LineContact2 {
    pub fn solve(
        &mut self,
        rbp0: &mut RigidBodyPulses,
        rbp1: &mut RigidBodyPulses,
        dt: f32,
        relaxation: f32,
    ) {
        let v0 = rbp0.velocity_at_position(self.lec.pec.p0);
        let v1 = rbp1.velocity_at_position(self.lec.pec.p1);
        let mut dv = -v0 + v1 + self.lec.pec.bias(dt);
        if let Some(line_direction) = self.lec.null_space {
            dv -= dv.dot(line_direction) * line_direction;
        }
        let len2 = dv.length_squared();
        if len2 > 1e-12 {
            let n = dv / len2.sqrt();
            let mc0 = rbp0.effective_mass(&VectorAtPosition {
                vector: n,
                position: self.lec.pec.p0,
            });
            let mc1 = rbp1.effective_mass(&VectorAtPosition {
                vector: n,
                position: self.lec.pec.p1,
            });
            let lambda = -relaxation * (mc0 * mc1 / (mc0 + mc1)) * dv;
            rbp0.integrate_impulse(
                VectorAtPosition {
                    vector: -lambda,
                    position: self.lec.pec.p0,
                },
                0.0,
                dt,
            );
            rbp1.integrate_impulse(
                VectorAtPosition {
                    vector: lambda,
                    position: self.lec.pec.p1,
                },
                0.0,
                dt,
            );
        }
    }
}

/// Reported once per two-body normal contact after the solver has converged.
#[derive(Debug, Clone, Copy)]
pub struct ImpactEvent {
    pub body0: BodyId,
    pub body1: BodyId,
    pub normal: Vec3,
    pub lambda_final: f32,
}

/// A contact constraint scheduled for the current substep.
#[derive(Debug, Clone)]
pub enum ContactInfo {
    Normal1(NormalContact1),
    Normal2(NormalContact2),
    ShockAbsorber1(ShockAbsorberContact1),
    Tire1(TireContact1),
    Plane1(PlaneContact1),
    Plane2(PlaneContact2),
    Line1(LineContact1),
    Line2(LineContact2),
}

impl ContactInfo {
    fn solve(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        cfg: &PhysicsConfig,
        dt: f32,
        relaxation: f32,
    ) {
        match self {
            ContactInfo::Normal1(c) => {
                if let Some(body) = bodies.get_mut(c.body) {
                    c.solve(&mut body.rbp, dt, relaxation);
                }
            }
            ContactInfo::Normal2(c) => {
                if let Some((b0, b1)) = bodies.get2_mut(c.bodies[0], c.bodies[1]) {
                    c.solve(&mut b0.rbp, &mut b1.rbp, dt, relaxation);
                }
            }
            ContactInfo::ShockAbsorber1(c) => {
                if let Some(body) = bodies.get_mut(c.body) {
                    c.solve(&mut body.rbp, dt, cfg.solver_iterations);
                }
            }
            ContactInfo::Tire1(c) => {
                if let Some(body) = bodies.get_mut(c.body) {
                    c.solve(body, cfg, dt, relaxation);
                }
            }
            ContactInfo::Plane1(c) => {
                if let Some(body) = bodies.get_mut(c.body) {
                    c.solve(&mut body.rbp, dt, relaxation);
                }
            }
            ContactInfo::Plane2(c) => {
                if let Some((b0, b1)) = bodies.get2_mut(c.bodies[0], c.bodies[1]) {
                    c.solve(&mut b0.rbp, &mut b1.rbp, dt, relaxation);
                }
            }
            ContactInfo::Line1(c) => {
                if let Some(body) = bodies.get_mut(c.body) {
                    c.solve(&mut body.rbp, dt, relaxation);
                }
            }
            ContactInfo::Line2(c) => {
                if let Some((b0, b1)) = bodies.get2_mut(c.bodies[0], c.bodies[1]) {
                    c.solve(&mut b0.rbp, &mut b1.rbp, dt, relaxation);
                }
            }
        }
    }

    fn finalize(&self) -> Option<ImpactEvent> {
        match self {
            ContactInfo::Normal2(c) => Some(ImpactEvent {
                body0: c.bodies[0],
                body1: c.bodies[1],
                normal: c.pc.constraint.normal_impulse.normal,
                lambda_final: c.pc.constraint.normal_impulse.lambda_total,
            }),
            _ => None,
        }
    }
}

/// Runs the sequential-impulse iterations over all contacts of a substep.
/// The first iteration is under-relaxed to damp the initial impulse
/// estimates.
pub fn solve_contacts(
    bodies: &mut Arena<RigidBody>,
    contacts: &mut [ContactInfo],
    cfg: &PhysicsConfig,
    dt: f32,
) -> Vec<ImpactEvent> {
    for i in 0..cfg.solver_iterations {
        let relaxation = if i == 0 { cfg.relaxation } else { 1.0 };
        for ci in contacts.iter_mut() {
            ci.solve(bodies, cfg, dt, relaxation);
        }
    }
    contacts.iter().filter_map(ContactInfo::finalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pulses::PenetrationLimits;
    use approx::assert_relative_eq;
    use glam::Mat3;

    fn falling_cube(mass: f32, vy: f32) -> RigidBodyPulses {
        RigidBodyPulses::new(
            mass,
            Mat3::from_diagonal(Vec3::splat(mass / 6.0)),
            Vec3::ZERO,
            Vec3::new(0.0, vy, 0.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.5, 0.0),
            Mat3::IDENTITY,
            true,
            PenetrationLimits::default(),
        )
    }

    fn ground_contact(body: BodyId, overlap: f32, mass: f32) -> NormalContact1 {
        NormalContact1 {
            body,
            point: Vec3::ZERO,
            pc: BoundedPlaneInequalityConstraint {
                constraint: PlaneInequalityConstraint {
                    normal_impulse: NormalImpulse::new(Vec3::Y),
                    overlap,
                    b: 0.0,
                    slop: 0.001,
                    beta: 0.5,
                },
                lambda_min: mass * -1000.0,
                lambda_max: 0.0,
            },
            friction: None,
        }
    }

    #[test]
    fn normal_contact_stops_approach() {
        let mut rbp = falling_cube(2.0, -3.0);
        let mut c = ground_contact(BodyId::default(), 0.0, 2.0);
        for i in 0..5 {
            c.solve(&mut rbp, 1.0 / 60.0, if i == 0 { 0.2 } else { 1.0 });
        }
        assert!(rbp.v_com.y > -1e-3);
        assert!(c.pc.constraint.normal_impulse.lambda_total < 0.0);
    }

    #[test]
    fn separating_body_receives_no_impulse() {
        let mut rbp = falling_cube(2.0, 3.0);
        let mut c = ground_contact(BodyId::default(), 0.0, 2.0);
        c.solve(&mut rbp, 1.0 / 60.0, 1.0);
        assert_relative_eq!(rbp.v_com.y, 3.0);
        assert_relative_eq!(c.pc.constraint.normal_impulse.lambda_total, 0.0);
    }

    #[test]
    fn baumgarte_bias_pushes_out_of_penetration() {
        let mut rbp = falling_cube(1.0, 0.0);
        let mut c = ground_contact(BodyId::default(), 0.1, 1.0);
        for _ in 0..5 {
            c.solve(&mut rbp, 1.0 / 60.0, 1.0);
        }
        assert!(rbp.v_com.y > 0.0);
    }

    #[test]
    fn friction_opposes_sliding() {
        let mut rbp = falling_cube(1.0, 0.0);
        rbp.v_com.x = 2.0;
        let mut c = ground_contact(BodyId::default(), 0.0, 1.0);
        c.pc.constraint.normal_impulse.lambda_total = -1.0;
        let mut friction = FrictionContact1::new(
            Vec3::ZERO,
            Vec3::ZERO,
            Some(FrictionCoefficients {
                stiction: 2.0,
                friction: 1.6,
            }),
        );
        friction.solve(&mut rbp, Vec3::Y, -1.0, 1.0 / 60.0, 1.0);
        assert!(rbp.v_com.x < 2.0);
        assert!(friction.lambda_total.x > 0.0);
    }

    #[test]
    fn friction_is_bounded_by_normal_impulse() {
        let mut rbp = falling_cube(100.0, 0.0);
        rbp.v_com.x = 50.0;
        let mut friction = FrictionContact1::new(
            Vec3::ZERO,
            Vec3::ZERO,
            Some(FrictionCoefficients {
                stiction: 2.0,
                friction: 1.6,
            }),
        );
        friction.solve(&mut rbp, Vec3::Y, -1.0, 1.0 / 60.0, 1.0);
        assert!(friction.lambda_total.length() <= 1.6 + 1e-5);
    }

    #[test]
    #[should_panic(expected = "lambda out of bounds")]
    fn diverging_lambda_aborts() {
        let mut pc = BoundedPlaneInequalityConstraint {
            constraint: PlaneInequalityConstraint {
                normal_impulse: NormalImpulse::new(Vec3::Y),
                overlap: 0.0,
                b: 0.0,
                slop: 0.0,
                beta: 0.5,
            },
            lambda_min: -f32::INFINITY,
            lambda_max: f32::INFINITY,
        };
        pc.clamped_lambda(2e6);
    }

    #[test]
    fn line_contact_pulls_toward_anchor() {
        let mut rbp = falling_cube(1.0, 0.0);
        let mut c = LineContact1 {
            body: BodyId::default(),
            v1: Vec3::ZERO,
            lec: LineEqualityConstraint {
                pec: PointEqualityConstraint {
                    p0: rbp.abs_com(),
                    p1: rbp.abs_com() + Vec3::X,
                    beta: 0.5,
                },
                null_space: None,
            },
        };
        c.solve(&mut rbp, 1.0 / 60.0, 1.0);
        assert!(rbp.v_com.x > 0.0);
    }

    #[test]
    fn rail_leaves_line_direction_free() {
        let mut rbp = falling_cube(1.0, 0.0);
        rbp.v_com = Vec3::new(3.0, 0.0, 0.0);
        let mut c = LineContact1 {
            body: BodyId::default(),
            v1: Vec3::ZERO,
            lec: LineEqualityConstraint {
                pec: PointEqualityConstraint {
                    p0: rbp.abs_com(),
                    p1: rbp.abs_com(),
                    beta: 0.5,
                },
                null_space: Some(Vec3::X),
            },
        };
        c.solve(&mut rbp, 1.0 / 60.0, 1.0);
        assert_relative_eq!(rbp.v_com.x, 3.0);
    }
}
