//! Core rigid-body state: the pulses integrator, materials, bodies, and
//! the registry that owns them.

pub mod body;
pub mod material;
pub mod pulses;
pub mod registry;

pub use body::RigidBody;
pub use material::PhysicsMaterial;
pub use pulses::{PenetrationLimits, RigidBodyPulses};
pub use registry::BodyRegistry;
