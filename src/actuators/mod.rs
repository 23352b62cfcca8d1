//! Drivetrain and aerodynamic actuators mounted on rigid bodies.

pub mod engine;
pub mod magic_formula;
pub mod rotor;
pub mod tire;
pub mod tire_contact;
pub mod tracking_wheel;
pub mod wing;

pub use engine::{
    EnginePowerIntent, RigidBodyEngine, TirePowerIntent, TirePowerIntentType,
    VelocityClassification,
};
pub use magic_formula::{CombinedMagicFormula, MagicFormula, MagicFormulaArgmax, MagicFormulaMode};
pub use rotor::{GravityCorrection, Rotor};
pub use tire::Tire;
pub use tire_contact::TireContact1;
pub use tracking_wheel::{TrackingWheel, TrackingWheelUpdate};
pub use wing::Wing;
