//! Collision meshes: polygon soup plus pre-computed ridges and line
//! segments, transformed into world space once per substep.

use std::collections::HashMap;

use glam::{Mat3, Vec3};

use super::shapes::{
    edge_key, Aabb, BoundingSphere, CollisionLine, CollisionPolygon, CollisionRidge, VertexKey,
};
use crate::core::material::PhysicsMaterial;

/// A collision mesh in world coordinates.
///
/// The ridge map is keyed by the ordered vertex pair of each shared edge;
/// edges whose dihedral angle disqualifies them from ridge contacts are
/// absent by construction.
pub struct CollisionMesh {
    pub name: String,
    pub material: PhysicsMaterial,
    pub polygons: Vec<CollisionPolygon>,
    pub lines: Vec<CollisionLine>,
    pub ridges: HashMap<(VertexKey, VertexKey), CollisionRidge>,
    pub bounding_sphere: BoundingSphere,
    pub aabb: Aabb,
}

impl CollisionMesh {
    pub fn new(
        name: impl Into<String>,
        material: PhysicsMaterial,
        polygons: Vec<CollisionPolygon>,
        lines: Vec<CollisionLine>,
    ) -> Self {
        let mut points = Vec::new();
        for p in &polygons {
            points.extend_from_slice(&p.corners);
        }
        for l in &lines {
            points.extend_from_slice(&l.line);
        }
        if points.is_empty() {
            points.push(Vec3::ZERO);
        }
        let ridges = build_ridges(&polygons);
        Self {
            name: name.into(),
            material,
            bounding_sphere: BoundingSphere::from_points(&points),
            aabb: Aabb::from_points(&points),
            polygons,
            lines,
            ridges,
        }
    }

    /// The mesh re-expressed in world coordinates under `rotation`/`position`.
    pub fn transformed(&self, rotation: Mat3, position: Vec3) -> CollisionMesh {
        let tp = |v: Vec3| rotation * v + position;
        let polygons = self
            .polygons
            .iter()
            .map(|p| match p.corners.len() {
                3 => CollisionPolygon::triangle(tp(p.corners[0]), tp(p.corners[1]), tp(p.corners[2])),
                _ => CollisionPolygon::quad(
                    tp(p.corners[0]),
                    tp(p.corners[1]),
                    tp(p.corners[2]),
                    tp(p.corners[3]),
                ),
            })
            .collect();
        let lines = self
            .lines
            .iter()
            .map(|l| CollisionLine::new(tp(l.line[0]), tp(l.line[1])))
            .collect();
        CollisionMesh::new(self.name.clone(), self.material, polygons, lines)
    }

    /// An axis-aligned cuboid of the given half extents, centered at the
    /// origin, as twelve triangles.
    pub fn cuboid(name: impl Into<String>, material: PhysicsMaterial, half_extents: Vec3) -> Self {
        let h = half_extents;
        let v = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        // Outward-facing winding per face.
        let faces: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // -z
            [4, 5, 6, 7], // +z
            [0, 1, 5, 4], // -y
            [3, 7, 6, 2], // +y
            [0, 4, 7, 3], // -x
            [1, 2, 6, 5], // +x
        ];
        let mut polygons = Vec::with_capacity(12);
        for f in &faces {
            polygons.push(CollisionPolygon::triangle(v[f[0]], v[f[1]], v[f[2]]));
            polygons.push(CollisionPolygon::triangle(v[f[0]], v[f[2]], v[f[3]]));
        }
        Self::new(name, material, polygons, Vec::new())
    }

    /// Unique edges of all polygons, as direction vectors for SAT axis
    /// candidates.
    pub fn edge_directions(&self) -> Vec<Vec3> {
        let mut seen = std::collections::HashSet::new();
        let mut directions = Vec::new();
        for poly in &self.polygons {
            let n = poly.corners.len();
            for i in 0..n {
                let a = poly.corners[i];
                let b = poly.corners[(i + 1) % n];
                let d = if VertexKey::new(a) < VertexKey::new(b) {
                    a - b
                } else {
                    b - a
                };
                if seen.insert(VertexKey::new(d)) {
                    directions.push(d);
                }
            }
        }
        directions
    }

    /// All distinct polygon corners.
    pub fn vertices(&self) -> Vec<Vec3> {
        let mut seen = std::collections::HashSet::new();
        let mut vertices = Vec::new();
        for poly in &self.polygons {
            for &c in &poly.corners {
                if seen.insert(VertexKey::new(c)) {
                    vertices.push(c);
                }
            }
        }
        vertices
    }
}

fn build_ridges(
    polygons: &[CollisionPolygon],
) -> HashMap<(VertexKey, VertexKey), CollisionRidge> {
    // First pass: face normal per edge; second pass: ridge per edge shared
    // by exactly two faces.
    let mut edge_faces: HashMap<(VertexKey, VertexKey), Vec<(Vec3, [Vec3; 2])>> = HashMap::new();
    for poly in polygons {
        let n = poly.corners.len();
        for i in 0..n {
            let a = poly.corners[i];
            let b = poly.corners[(i + 1) % n];
            edge_faces
                .entry(edge_key(a, b))
                .or_default()
                .push((poly.plane.normal, [a, b]));
        }
    }
    let mut ridges = HashMap::new();
    for (key, faces) in edge_faces {
        if faces.len() != 2 {
            continue;
        }
        if let Some(ridge) = CollisionRidge::new(faces[0].1, faces[0].0, faces[1].0) {
            ridges.insert(key, ridge);
        }
    }
    ridges
}

/// The pre-computed ridges adjacent to a polygon's edges, looked up by
/// ordered vertex key. Ridges removed by the dihedral filter are simply
/// absent.
pub fn adjacent_ridges(
    polygon: &CollisionPolygon,
    ridge_map: &HashMap<(VertexKey, VertexKey), CollisionRidge>,
) -> Vec<CollisionRidge> {
    let n = polygon.corners.len();
    let mut ridges = Vec::with_capacity(n);
    for i in 0..n {
        let a = polygon.corners[i];
        let b = polygon.corners[(i + 1) % n];
        if let Some(r) = ridge_map.get(&edge_key(a, b)) {
            ridges.push(r.clone());
        }
    }
    ridges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cuboid_has_twelve_triangles_and_outward_normals() {
        let mesh = CollisionMesh::cuboid("box", PhysicsMaterial::CONVEX, Vec3::splat(0.5));
        assert_eq!(mesh.polygons.len(), 12);
        for poly in &mesh.polygons {
            // Center of the cuboid lies on the negative side of every face.
            assert!(poly.plane.signed_distance(Vec3::ZERO) < 0.0);
        }
    }

    #[test]
    fn ridge_map_filters_coplanar_edges() {
        // Two coplanar triangles share one edge; their ridge normal is the
        // common face normal.
        let t0 = CollisionPolygon::triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let t1 = CollisionPolygon::triangle(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let mesh = CollisionMesh::new("plane", PhysicsMaterial::CONCAVE, vec![t0, t1], Vec::new());
        let shared = edge_key(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let ridge = mesh.ridges.get(&shared).unwrap();
        assert_relative_eq!(ridge.min_cos, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn transform_preserves_topology() {
        let mesh = CollisionMesh::cuboid("box", PhysicsMaterial::CONVEX, Vec3::splat(1.0));
        let moved = mesh.transformed(Mat3::IDENTITY, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.polygons.len(), 12);
        assert_eq!(moved.ridges.len(), mesh.ridges.len());
        assert_relative_eq!(moved.bounding_sphere.center.x, 10.0, epsilon = 1e-5);
    }
}
