//! contact_patch – rigid-body vehicle physics.
//!
//! A fixed-substep dynamics engine built for drivable vehicles: SAT and
//! ridge-based collision detection over material-tagged meshes, a
//! sequential-impulse contact solver (with a penalty-spring fallback),
//! suspension shock absorbers, and a magic-formula tire model. The
//! [`engine::PhysicsEngine`] owns the bodies and steps them; the optional
//! [`physics_loop::PhysicsLoop`] runs it in real time on its own thread.

pub mod actuators;
pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod engine;
pub mod physics_loop;
pub mod utils;

pub use glam::{Mat3, Vec3};

pub use actuators::{EnginePowerIntent, RigidBodyEngine, Rotor, Tire, TrackingWheel, Wing};
pub use config::{PhysicsConfig, SolverStrategy, SteeringType};
pub use crate::core::{BodyRegistry, PhysicsMaterial, RigidBody, RigidBodyPulses};
pub use dynamics::{AdvanceTime, Controllable, ExternalForceProvider, GravityProvider, ImpactEvent};
pub use engine::PhysicsEngine;
pub use physics_loop::PhysicsLoop;
pub use utils::{Arena, BodyId};
