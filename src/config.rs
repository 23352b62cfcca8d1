//! Global configuration for the contact_patch engine.

use serde::{Deserialize, Serialize};

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.8, 0.0];

/// Default outer timestep (in seconds), subdivided by oversampling.
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Default number of solver substeps per outer step.
pub const DEFAULT_OVERSAMPLING: u32 = 20;

/// Number of sequential-impulse iterations performed per substep.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 5;

/// Impulse components beyond this magnitude abort the simulation.
pub const MAX_IMPULSE_COMPONENT: f32 = 1e5;

/// Accumulated lambda magnitudes beyond this bound abort the simulation.
pub const MAX_LAMBDA: f32 = 1e6;

/// Tire force bounds beyond this magnitude abort the simulation.
pub const MAX_TIRE_FORCE: f32 = 1e9;

/// Friction clamping bounds beyond this magnitude abort the simulation.
pub const MAX_CLAMPING: f32 = 1e4;

/// Contact-resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStrategy {
    /// Continuous penalty springs proportional to penetration depth.
    Penalty,
    /// Iterative sequential impulses with a friction cone.
    SequentialImpulse,
}

/// How tire acceleration forces are distributed when turning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringType {
    /// Scale each wheel's force by its surface speed, holding power
    /// roughly constant across inner/outer wheels.
    Car,
    /// No per-wheel scaling (skid steering).
    Tank,
}

/// Engine-wide tunables, passed by reference into every substep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Outer timestep in seconds.
    pub dt: f32,
    /// Number of substeps per outer step.
    pub oversampling: u32,
    pub gravity: [f32; 3],
    pub solver_strategy: SolverStrategy,
    pub steering_type: SteeringType,
    pub solver_iterations: u32,
    /// Relaxation factor applied on the first solver iteration.
    pub relaxation: f32,
    /// Baumgarte factor for normal (inequality) contacts.
    pub beta: f32,
    /// Baumgarte factor for plane equality constraints (grinding).
    pub plane_equality_beta: f32,
    /// Baumgarte factor for point/line equality constraints (grinding).
    pub point_equality_beta: f32,
    /// Face contacts shallower than one substep's approach travel times
    /// this factor are deferred to the next substep. Suppresses jolts at
    /// mesh seams.
    pub slide_factor: f32,
    /// Penetration depth tolerated without positional correction.
    pub contact_slop: f32,
    /// Lower bound on the per-contact velocity bias, in m/s.
    pub velocity_lambda_min: f32,
    pub stiction_coefficient: f32,
    pub friction_coefficient: f32,
    /// Extra stiction added per unit of tire angular velocity.
    pub max_extra_friction: f32,
    pub max_extra_w: f32,
    /// Blend width of the stiction-to-sliding transition.
    pub alpha0: f32,
    /// Below this longitudinal speed, braking holds the wheel instead of
    /// reversing it.
    pub hand_brake_velocity: f32,
    /// Rest compression depth of the tire suspension, in meters.
    pub wheel_penetration_depth: f32,
    /// Upper bound on wing-induced acceleration, in m/s^2.
    pub max_aerodynamic_acceleration: f32,
    /// Clamp the magic-formula argument at its peak (no force falloff
    /// beyond optimal slip).
    pub no_slip: bool,
    /// Suppress wheel spin-up when accelerating from near standstill.
    pub avoid_burnout: bool,
    /// Ridge contacts whose normal deviates from the adjacent face normal
    /// beyond this cosine are rejected.
    pub min_cos_ridge_polygon: f32,
    /// Prefer the face normal over the minimum-overlap axis when their
    /// cosine exceeds this value.
    pub max_keep_normal: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_TIME_STEP,
            oversampling: DEFAULT_OVERSAMPLING,
            gravity: DEFAULT_GRAVITY,
            solver_strategy: SolverStrategy::SequentialImpulse,
            steering_type: SteeringType::Car,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            relaxation: 0.2,
            beta: 0.5,
            plane_equality_beta: 0.5,
            point_equality_beta: 0.5,
            slide_factor: 0.5,
            contact_slop: 0.001,
            velocity_lambda_min: -1000.0,
            stiction_coefficient: 2.0,
            friction_coefficient: 1.6,
            max_extra_friction: 0.0,
            max_extra_w: 0.0,
            alpha0: 0.1,
            hand_brake_velocity: 2.0,
            wheel_penetration_depth: 0.25,
            max_aerodynamic_acceleration: 100.0,
            no_slip: false,
            avoid_burnout: true,
            min_cos_ridge_polygon: 0.5,
            max_keep_normal: 0.9,
        }
    }
}

impl PhysicsConfig {
    /// The substep duration `dt / oversampling`.
    pub fn dt_substeps(&self) -> f32 {
        self.dt / self.oversampling.max(1) as f32
    }

    pub fn gravity_vec(&self) -> glam::Vec3 {
        glam::Vec3::from_array(self.gravity)
    }
}
