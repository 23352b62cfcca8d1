//! Contact resolution and force generation.

pub mod constraints;
pub mod forces;
pub mod friction;
pub mod penalty;

pub use constraints::{solve_contacts, ContactInfo, ImpactEvent};
pub use forces::{AdvanceTime, Controllable, ExternalForceProvider, GravityProvider};
pub use penalty::{PenaltyContact, PenaltyResolver};
