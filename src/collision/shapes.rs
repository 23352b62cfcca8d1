//! Bounded collision primitives: polygons, ridges, and line segments, each
//! carrying a bounding sphere for broad-phase rejection.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Key for vertex-identity lookups: exact bit patterns, not numeric order.
/// Consistency is what matters here, two transforms of the same vertex
/// produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey([u32; 3]);

impl VertexKey {
    pub fn new(v: Vec3) -> Self {
        Self([v.x.to_bits(), v.y.to_bits(), v.z.to_bits()])
    }
}

/// Ordered pair of vertex keys identifying an undirected edge.
pub fn edge_key(a: Vec3, b: Vec3) -> (VertexKey, VertexKey) {
    let ka = VertexKey::new(a);
    let kb = VertexKey::new(b);
    if ka < kb { (ka, kb) } else { (kb, ka) }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut center = Vec3::ZERO;
        for p in points {
            center += *p;
        }
        center /= points.len() as f32;
        let mut radius: f32 = 0.0;
        for p in points {
            radius = radius.max((*p - center).length());
        }
        Self { center, radius }
    }

    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        (self.center - other.center).length_squared()
            <= (self.radius + other.radius) * (self.radius + other.radius)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub intercept: f32,
}

impl Plane {
    /// Plane through `p` with the given normal.
    pub fn new(normal: Vec3, p: Vec3) -> Self {
        Self {
            normal,
            intercept: -normal.dot(p),
        }
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.intercept
    }
}

/// A convex polygon (triangle or quad) with its plane and bounding sphere.
#[derive(Debug, Clone)]
pub struct CollisionPolygon {
    pub corners: Vec<Vec3>,
    pub plane: Plane,
    pub bounding_sphere: BoundingSphere,
}

impl CollisionPolygon {
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize();
        Self {
            corners: vec![a, b, c],
            plane: Plane::new(normal, a),
            bounding_sphere: BoundingSphere::from_points(&[a, b, c]),
        }
    }

    pub fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize();
        Self {
            corners: vec![a, b, c, d],
            plane: Plane::new(normal, a),
            bounding_sphere: BoundingSphere::from_points(&[a, b, c, d]),
        }
    }

    /// True if `p`, already on the polygon's plane, lies inside all edges.
    fn contains_projected(&self, p: Vec3) -> bool {
        let n = self.corners.len();
        for i in 0..n {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % n];
            let edge_normal = (b - a).cross(self.plane.normal);
            if edge_normal.dot(p - a) > 0.0 {
                return false;
            }
        }
        true
    }

    /// Intersects the segment `l0..l1` with the polygon. Returns the
    /// intersection point and the ray parameter in `[0, 1]`.
    pub fn intersect_line(&self, l0: Vec3, l1: Vec3) -> Option<(Vec3, f32)> {
        let d = l1 - l0;
        let denom = self.plane.normal.dot(d);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = -self.plane.signed_distance(l0) / denom;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let p = l0 + t * d;
        if self.contains_projected(p) {
            Some((p, t))
        } else {
            None
        }
    }
}

/// An edge shared by two faces of a concave mesh, carrying the averaged
/// adjacent-face normal. Ridges whose dihedral angle disqualifies them are
/// never constructed, so lookup failure is expected.
#[derive(Debug, Clone)]
pub struct CollisionRidge {
    pub edge: [Vec3; 2],
    /// Normalized average of the two adjacent face normals.
    pub normal: Vec3,
    /// Cosine of the angle between the adjacent face normals.
    pub min_cos: f32,
    pub bounding_sphere: BoundingSphere,
}

impl CollisionRidge {
    pub fn new(edge: [Vec3; 2], n0: Vec3, n1: Vec3) -> Option<Self> {
        let sum = n0 + n1;
        let len = sum.length();
        if len < 1e-6 {
            return None;
        }
        Some(Self {
            edge,
            normal: sum / len,
            min_cos: n0.dot(n1),
            bounding_sphere: BoundingSphere::from_points(&edge),
        })
    }

    pub fn direction(&self) -> Vec3 {
        (self.edge[1] - self.edge[0]).normalize()
    }
}

/// A line segment (tire ray, grind rail) with its bounding sphere.
#[derive(Debug, Clone)]
pub struct CollisionLine {
    pub line: [Vec3; 2],
    pub bounding_sphere: BoundingSphere,
}

impl CollisionLine {
    pub fn new(l0: Vec3, l1: Vec3) -> Self {
        Self {
            line: [l0, l1],
            bounding_sphere: BoundingSphere::from_points(&[l0, l1]),
        }
    }

    pub fn direction(&self) -> Vec3 {
        (self.line[1] - self.line[0]).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn line_crosses_triangle() {
        let tri = CollisionPolygon::triangle(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let (p, t) = tri
            .intersect_line(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(p.y, 0.0);
    }

    #[test]
    fn line_misses_triangle() {
        let tri = CollisionPolygon::triangle(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        assert!(tri
            .intersect_line(Vec3::new(5.0, 1.0, 0.0), Vec3::new(5.0, -1.0, 0.0))
            .is_none());
        assert!(tri
            .intersect_line(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn edge_keys_are_order_independent() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(edge_key(a, b), edge_key(b, a));
    }
}
