//! Pacejka tire force curve.

use serde::{Deserialize, Serialize};

/// Evaluation mode for the slip curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicFormulaMode {
    Standard,
    /// Clamp the argument at the peak, so force never falls off with
    /// excessive slip.
    NoSlip,
}

/// Pacejka magic formula `D sin(C atan(B x - E (B x - atan(B x))))`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MagicFormula {
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
}

impl Default for MagicFormula {
    fn default() -> Self {
        Self {
            b: 41.0,
            c: 1.4,
            d: 1.0,
            e: -0.2,
        }
    }
}

impl MagicFormula {
    pub fn call(&self, x: f32) -> f32 {
        let bx = self.b * x;
        self.d * (self.c * (bx - self.e * (bx - bx.atan())).atan()).sin()
    }
}

/// A magic-formula curve with its peak location precomputed, normalized so
/// that the peak value is exactly 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MagicFormulaArgmax {
    pub mf: MagicFormula,
    pub argmax: f32,
    max_value: f32,
}

impl MagicFormulaArgmax {
    pub fn new(mf: MagicFormula) -> Self {
        let mut argmax = 0.0f32;
        let mut max_value = 0.0f32;
        // The peak of realistic curves lies well below a slip of 1.
        let n = 100_000;
        for i in 0..=n {
            let x = i as f32 / n as f32;
            let y = mf.call(x);
            if y > max_value {
                max_value = y;
                argmax = x;
            }
        }
        Self {
            mf,
            argmax,
            max_value,
        }
    }

    pub fn call(&self, x: f32, mode: MagicFormulaMode) -> f32 {
        let x = match mode {
            MagicFormulaMode::Standard => x,
            MagicFormulaMode::NoSlip => x.clamp(-self.argmax, self.argmax),
        };
        self.mf.call(x) / self.max_value
    }
}

impl Default for MagicFormulaArgmax {
    fn default() -> Self {
        Self::new(MagicFormula::default())
    }
}

/// Longitudinal and lateral slip curves of one tire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombinedMagicFormula {
    pub longitudinal: MagicFormulaArgmax,
    pub lateral: MagicFormulaArgmax,
}

impl Default for CombinedMagicFormula {
    fn default() -> Self {
        Self {
            longitudinal: MagicFormulaArgmax::default(),
            lateral: MagicFormulaArgmax::default(),
        }
    }
}

impl CombinedMagicFormula {
    /// Evaluates both curves, `x = (longitudinal slip, lateral slip angle)`.
    pub fn call(&self, x: (f32, f32), mode: MagicFormulaMode) -> (f32, f32) {
        (
            self.longitudinal.call(x.0, mode),
            self.lateral.call(x.1, mode),
        )
    }
}
