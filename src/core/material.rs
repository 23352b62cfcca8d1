//! Bit-flag classification of collision geometry.

use serde::{Deserialize, Serialize};

/// Material flags tagged onto collision geometry by the mesh loaders.
///
/// `CONVEX` and `CONCAVE` select the narrow-phase overlap routine and are
/// mutually exclusive per mesh; geometry carrying neither is a data error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhysicsMaterial(pub u32);

impl PhysicsMaterial {
    pub const NONE: Self = Self(0);
    /// Eligible for full SAT overlap.
    pub const CONVEX: Self = Self(1 << 0);
    /// Triangle soup; overlap runs per-face against pre-computed ridges.
    pub const CONCAVE: Self = Self(1 << 1);
    /// Substitute a smoothed surface normal at contacts.
    pub const SLIPPERY: Self = Self(1 << 2);
    /// Participates in line-of-sight queries.
    pub const VISIBLE: Self = Self(1 << 3);
    /// Vehicle chassis geometry.
    pub const CHASSIS: Self = Self(1 << 4);
    /// Tire contact rays.
    pub const TIRE_LINE: Self = Self(1 << 5);
    /// Grind-rail line segments.
    pub const GRIND_LINE: Self = Self(1 << 6);
    /// Geometry that may grind on rails.
    pub const GRIND_CONTACT: Self = Self(1 << 7);

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for PhysicsMaterial {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for PhysicsMaterial {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for PhysicsMaterial {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_composition() {
        let m = PhysicsMaterial::CONCAVE | PhysicsMaterial::SLIPPERY;
        assert!(m.contains(PhysicsMaterial::CONCAVE));
        assert!(m.contains(PhysicsMaterial::SLIPPERY));
        assert!(!m.contains(PhysicsMaterial::CONVEX));
        assert!(m.intersects(PhysicsMaterial::SLIPPERY | PhysicsMaterial::VISIBLE));
    }
}
