//! Engine power distribution across driven tires.

use std::collections::HashSet;

use crate::utils::math::signed_min;

/// Whether the contact point moves fast enough for braking to reverse the
/// wheel instead of holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityClassification {
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TirePowerIntentType {
    Accelerate,
    Brake,
    BrakeOrIdle,
    Idle,
}

/// Power assigned to a single tire for the current substep.
#[derive(Debug, Clone, Copy)]
pub struct TirePowerIntent {
    /// Watts. `NAN` requests braking.
    pub power: f32,
    pub relaxation: f32,
    pub intent_type: TirePowerIntentType,
}

/// Driver input: requested surface power and how strongly to apply it.
#[derive(Debug, Clone, Copy)]
pub struct EnginePowerIntent {
    /// Watts. `NAN` requests braking.
    pub surface_power: f32,
    /// In `[0, 1]`.
    pub drive_relaxation: f32,
}

/// Splits the engine's power evenly across the tires that consume it.
///
/// The number of driven tires is discovered while running: each substep every
/// contacting tire consumes once, and the count observed in the previous
/// substep divides the power in the current one.
#[derive(Debug, Clone)]
pub struct RigidBodyEngine {
    pub max_surface_power: f32,
    pub hand_brake_pulled: bool,
    intent: EnginePowerIntent,
    tires_consumed: HashSet<usize>,
    ntires_old: usize,
}

impl RigidBodyEngine {
    pub fn new(max_surface_power: f32) -> Self {
        Self {
            max_surface_power,
            hand_brake_pulled: false,
            intent: EnginePowerIntent {
                surface_power: 0.0,
                drive_relaxation: 0.0,
            },
            tires_consumed: HashSet::new(),
            ntires_old: 0,
        }
    }

    /// Sets the driver's power request. `NAN` requests braking.
    pub fn set_surface_power(&mut self, intent: EnginePowerIntent) {
        self.intent = intent;
    }

    pub fn surface_power_intent(&self) -> EnginePowerIntent {
        self.intent
    }

    /// Called once per substep before collision detection.
    pub fn reset_forces(&mut self) {
        self.ntires_old = self.tires_consumed.len();
        self.tires_consumed.clear();
    }

    pub fn consume_tire_power(
        &mut self,
        tire_id: usize,
        tire_w: f32,
        velocity_classification: VelocityClassification,
    ) -> TirePowerIntent {
        if !self.tires_consumed.insert(tire_id) || self.tires_consumed.len() > self.ntires_old {
            return TirePowerIntent {
                power: 0.0,
                relaxation: 1.0,
                intent_type: TirePowerIntentType::Idle,
            };
        }
        let max_surface_power = if self.ntires_old == 0 {
            0.0
        } else {
            self.max_surface_power
        };
        if self.hand_brake_pulled || max_surface_power.is_nan() {
            return TirePowerIntent {
                power: f32::NAN,
                relaxation: 1.0,
                intent_type: TirePowerIntentType::Brake,
            };
        }
        if self.intent.surface_power.is_nan() {
            return TirePowerIntent {
                power: f32::NAN,
                relaxation: self.intent.drive_relaxation,
                intent_type: TirePowerIntentType::Brake,
            };
        }
        let fast_same_sign = |p: f32| {
            velocity_classification == VelocityClassification::Fast
                && p.signum() == tire_w.signum()
                && p != 0.0
                && tire_w != 0.0
        };
        if max_surface_power == 0.0
            || self.intent.drive_relaxation < 1e-12
            || fast_same_sign(self.intent.surface_power)
        {
            let sp = self.intent.surface_power.signum() * self.intent.drive_relaxation;
            return TirePowerIntent {
                power: if sp == 0.0 { 0.0 } else { sp.signum() },
                relaxation: self.intent.drive_relaxation,
                intent_type: TirePowerIntentType::BrakeOrIdle,
            };
        }
        let sp = signed_min(self.intent.surface_power, max_surface_power);
        let power = sp / self.ntires_old as f32;
        if fast_same_sign(sp) {
            TirePowerIntent {
                power,
                relaxation: self.intent.drive_relaxation,
                intent_type: TirePowerIntentType::BrakeOrIdle,
            }
        } else {
            TirePowerIntent {
                power,
                relaxation: self.intent.drive_relaxation,
                intent_type: TirePowerIntentType::Accelerate,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_up_engine(ntires: usize) -> RigidBodyEngine {
        let mut e = RigidBodyEngine::new(1000.0);
        e.set_surface_power(EnginePowerIntent {
            surface_power: 800.0,
            drive_relaxation: 1.0,
        });
        e.reset_forces();
        for id in 0..ntires {
            e.consume_tire_power(id, -1.0, VelocityClassification::Slow);
        }
        e.reset_forces();
        e
    }

    #[test]
    fn power_splits_across_tires() {
        let mut e = warmed_up_engine(4);
        let p = e.consume_tire_power(0, -1.0, VelocityClassification::Slow);
        assert_eq!(p.intent_type, TirePowerIntentType::Accelerate);
        assert!((p.power - 200.0).abs() < 1e-5);
    }

    #[test]
    fn duplicate_consumption_is_idle() {
        let mut e = warmed_up_engine(2);
        e.consume_tire_power(0, -1.0, VelocityClassification::Slow);
        let p = e.consume_tire_power(0, -1.0, VelocityClassification::Slow);
        assert_eq!(p.intent_type, TirePowerIntentType::Idle);
        assert_eq!(p.power, 0.0);
    }

    #[test]
    fn hand_brake_requests_braking() {
        let mut e = warmed_up_engine(2);
        e.hand_brake_pulled = true;
        let p = e.consume_tire_power(0, -1.0, VelocityClassification::Slow);
        assert_eq!(p.intent_type, TirePowerIntentType::Brake);
        assert!(p.power.is_nan());
    }

    #[test]
    fn power_is_clipped_to_engine_maximum() {
        let mut e = warmed_up_engine(1);
        e.set_surface_power(EnginePowerIntent {
            surface_power: 5000.0,
            drive_relaxation: 1.0,
        });
        let p = e.consume_tire_power(0, -1.0, VelocityClassification::Slow);
        assert!((p.power - 1000.0).abs() < 1e-5);
    }
}
