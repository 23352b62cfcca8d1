//! Minimum-overlap computation between a convex polygon collection and a
//! single ridge.

use glam::Vec3;

use super::sat::CollisionPlane;
use super::shapes::{CollisionPolygon, CollisionRidge, VertexKey};

fn project(vertices: &[Vec3], n: Vec3) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in vertices {
        let s = v.dot(n);
        min = min.min(s);
        max = max.max(s);
    }
    (min, max)
}

/// Computes the minimum overlap of the polygons (plus any ridges adjacent
/// to them) against `ridge`. The returned normal points from the polygon
/// collection toward the ridge's owner.
///
/// When the minimum-overlap axis is within `max_keep_normal` cosine of the
/// ridge's own normal, the ridge normal is reported instead; passing
/// `-INFINITY` therefore always keeps the ridge normal. Returns `None`
/// ("no contact") when the projections separate on the ridge normal.
pub fn ridge_overlap(
    polygons: &[CollisionPolygon],
    adjacent_ridges: &[CollisionRidge],
    ridge: &CollisionRidge,
    max_keep_normal: f32,
) -> Option<CollisionPlane> {
    let mut vertices = Vec::new();
    {
        let mut seen = std::collections::HashSet::new();
        for poly in polygons {
            for &c in &poly.corners {
                if seen.insert(VertexKey::new(c)) {
                    vertices.push(c);
                }
            }
        }
    }
    if vertices.is_empty() {
        return None;
    }
    let ridge_points = [ridge.edge[0], ridge.edge[1]];

    // Overlap along the ridge's own normal. The ridge normal points toward
    // the colliding mesh, so separation here means no contact.
    let ridge_axis_overlap = {
        let (_, rmax) = project(&ridge_points, ridge.normal);
        let (vmin, _) = project(&vertices, ridge.normal);
        rmax - vmin
    };
    if ridge_axis_overlap == f32::INFINITY || ridge_axis_overlap < 0.0 {
        return None;
    }

    let mut best_overlap = ridge_axis_overlap;
    let mut best_normal = -ridge.normal;

    let mut consider_signed = |n: Vec3| {
        // Axis pointing from the polygons toward the ridge.
        let (_, vmax) = project(&vertices, n);
        let (rmin, _) = project(&ridge_points, n);
        let overlap = vmax - rmin;
        if overlap < best_overlap {
            best_overlap = overlap;
            best_normal = n;
        }
    };
    for poly in polygons {
        consider_signed(poly.plane.normal);
    }
    for adj in adjacent_ridges {
        consider_signed(adj.normal);
    }

    // Edge-cross axes are unsigned; pick the smaller side.
    let ridge_dir = ridge.edge[1] - ridge.edge[0];
    for poly in polygons {
        let n = poly.corners.len();
        for i in 0..n {
            let e = poly.corners[(i + 1) % n] - poly.corners[i];
            let axis = e.cross(ridge_dir);
            let l2 = axis.length_squared();
            if l2 < 1e-6 {
                continue;
            }
            let axis = axis / l2.sqrt();
            let (vmin, vmax) = project(&vertices, axis);
            let (rmin, rmax) = project(&ridge_points, axis);
            let overlap0 = rmax - vmin;
            let overlap1 = vmax - rmin;
            if overlap0 < overlap1 {
                if overlap0 < best_overlap {
                    best_overlap = overlap0;
                    best_normal = -axis;
                }
            } else if overlap1 < best_overlap {
                best_overlap = overlap1;
                best_normal = axis;
            }
        }
    }

    // Prefer the ridge normal when the best axis mostly agrees with it.
    if best_normal.dot(-ridge.normal) >= max_keep_normal {
        best_overlap = ridge_axis_overlap;
        best_normal = -ridge.normal;
    }
    Some(CollisionPlane {
        overlap: best_overlap,
        normal: best_normal,
    })
}
