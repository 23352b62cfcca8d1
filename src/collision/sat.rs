//! Separating-axis overlap between convex meshes.

use std::collections::HashMap;

use glam::Vec3;

use super::mesh::CollisionMesh;

/// Result of a SAT query: the minimum overlap and the axis that attains it.
/// The normal points from mesh0 toward mesh1.
#[derive(Debug, Clone, Copy)]
pub struct CollisionPlane {
    pub overlap: f32,
    pub normal: Vec3,
}

/// Projection of `vertices1` onto the face normal `n` of mesh0, measured
/// against mesh0's farthest extent. Positive means penetration when `n`
/// faces mesh1.
fn sat_overlap_signed(n: Vec3, vertices0: &[Vec3], vertices1: &[Vec3]) -> f32 {
    let mut max0 = f32::NEG_INFINITY;
    let mut min1 = f32::INFINITY;
    for v in vertices0 {
        max0 = max0.max(v.dot(n));
    }
    for v in vertices1 {
        min1 = min1.min(v.dot(n));
    }
    max0 - min1
}

/// Overlaps of the two meshes' projections onto an edge-cross axis, one per
/// side; the smaller side decides penetration.
fn sat_overlap_unsigned(l: Vec3, vertices0: &[Vec3], vertices1: &[Vec3]) -> (f32, f32) {
    let mut max0 = f32::NEG_INFINITY;
    let mut min0 = f32::INFINITY;
    let mut max1 = f32::NEG_INFINITY;
    let mut min1 = f32::INFINITY;
    for v in vertices0 {
        let s = v.dot(l);
        max0 = max0.max(s);
        min0 = min0.min(s);
    }
    for v in vertices1 {
        let s = v.dot(l);
        max1 = max1.max(s);
        min1 = min1.min(s);
    }
    (max1 - min0, max0 - min1)
}

/// Computes the minimum-overlap separating plane of two convex meshes.
///
/// Candidate axes are the face normals of both meshes and the pairwise
/// cross products of their edges. Returns `None` when either mesh has no
/// polygons; the caller treats that as a fatal classification error.
pub fn collision_plane(mesh0: &CollisionMesh, mesh1: &CollisionMesh) -> Option<CollisionPlane> {
    let vertices0 = mesh0.vertices();
    let vertices1 = mesh1.vertices();
    if vertices0.is_empty() || vertices1.is_empty() {
        return None;
    }
    let mut best_min_overlap = f32::INFINITY;
    let mut best_normal = Vec3::ZERO;
    for t0 in &mesh0.polygons {
        let overlap = sat_overlap_signed(t0.plane.normal, &vertices0, &vertices1);
        if overlap < best_min_overlap {
            best_min_overlap = overlap;
            best_normal = t0.plane.normal;
        }
    }
    for t1 in &mesh1.polygons {
        let overlap = sat_overlap_signed(t1.plane.normal, &vertices1, &vertices0);
        if overlap < best_min_overlap {
            best_min_overlap = overlap;
            best_normal = -t1.plane.normal;
        }
    }
    for e0 in mesh0.edge_directions() {
        for e1 in mesh1.edge_directions() {
            let n = e0.cross(e1);
            let l2 = n.length_squared();
            if l2 < 1e-6 {
                continue;
            }
            let n = n / l2.sqrt();
            let (overlap0, overlap1) = sat_overlap_unsigned(n, &vertices0, &vertices1);
            if overlap0 < overlap1 {
                if overlap0 < best_min_overlap {
                    best_min_overlap = overlap0;
                    best_normal = -n;
                }
            } else if overlap1 < best_min_overlap {
                best_min_overlap = overlap1;
                best_normal = n;
            }
        }
    }
    if best_min_overlap == f32::INFINITY {
        None
    } else {
        Some(CollisionPlane {
            overlap: best_min_overlap,
            normal: best_normal,
        })
    }
}

/// Memoizes the collision plane per mesh pair within one `collide()` call.
/// Meshes are identified by address; the tracker never outlives the
/// transformed meshes of the current substep.
#[derive(Default)]
pub struct SatTracker {
    planes: HashMap<(usize, usize), CollisionPlane>,
}

impl SatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collision_plane(
        &mut self,
        mesh0: &CollisionMesh,
        mesh1: &CollisionMesh,
    ) -> Option<CollisionPlane> {
        let key = (
            mesh0 as *const CollisionMesh as usize,
            mesh1 as *const CollisionMesh as usize,
        );
        if let Some(plane) = self.planes.get(&key) {
            return Some(*plane);
        }
        let plane = collision_plane(mesh0, mesh1)?;
        self.planes.insert(key, plane);
        Some(plane)
    }
}
