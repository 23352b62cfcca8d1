//! Overlap/normal computation for one candidate contact, dispatched on the
//! convex/concave classification of the two meshes.

use glam::Vec3;

use super::intersection::IntersectionScene;
use super::mesh::adjacent_ridges;
use super::ridge::ridge_overlap;
use super::sat::SatTracker;
use crate::config::PhysicsConfig;
use crate::core::material::PhysicsMaterial;

/// Injected provider of smoothed surface normals for slippery materials.
pub trait SurfaceNormal {
    fn surface_normal(&self, point: Vec3) -> Option<Vec3>;
}

/// Injected post-processor of contact normals/overlaps for slippery
/// materials.
pub trait CollisionNormalModifier {
    fn modify(&self, point: Vec3, normal: &mut Vec3, overlap: &mut f32);
}

/// Positions and normal providers of the two bodies in a scene.
pub struct EdgeOverlapContext<'a> {
    pub abs_position0: Vec3,
    pub abs_position1: Vec3,
    pub surface_normal0: Option<&'a dyn SurfaceNormal>,
    pub surface_normal1: Option<&'a dyn SurfaceNormal>,
    pub normal_modifier0: Option<&'a dyn CollisionNormalModifier>,
    pub normal_modifier1: Option<&'a dyn CollisionNormalModifier>,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeOverlap {
    pub overlap: f32,
    pub normal: Vec3,
    /// True when the overlap came from a separating-axis computation, in
    /// which case a negative overlap on declared-convex geometry is fatal.
    pub sat_used: bool,
}

/// Computes overlap depth and contact normal for one intersection scene.
///
/// The normal points from `body0` toward `body1`. Returns `None` when the
/// pair currently produces no contact (a recoverable condition). Panics
/// when neither mesh is classified convex or concave, or when SAT fails on
/// declared-convex geometry, both are data errors.
pub fn compute_edge_overlap(
    c: &IntersectionScene<'_>,
    ctx: &EdgeOverlapContext<'_>,
    intersection_point: Vec3,
    st: &mut SatTracker,
    cfg: &PhysicsConfig,
) -> Option<EdgeOverlap> {
    let convex0 = c.mesh0_material.contains(PhysicsMaterial::CONVEX);
    let convex1 = c.mesh1_material.contains(PhysicsMaterial::CONVEX);
    let concave0 = c.mesh0_material.contains(PhysicsMaterial::CONCAVE);
    let concave1 = c.mesh1_material.contains(PhysicsMaterial::CONCAVE);

    if convex0 && convex1 {
        let mesh1 = c
            .mesh1
            .unwrap_or_else(|| panic!("convex pair without second mesh ({})", c.mesh0.name));
        let plane = match st.collision_plane(c.mesh0, mesh1) {
            Some(plane) => plane,
            None => panic!(
                "could not compute collision plane of meshes {:?} and {:?}",
                c.mesh0.name, mesh1.name
            ),
        };
        Some(EdgeOverlap {
            overlap: plane.overlap,
            normal: plane.normal,
            sat_used: true,
        })
    } else if concave0 && convex1 {
        // The candidate face must face the other body's center.
        if c.polygon0.plane.signed_distance(ctx.abs_position1) < 0.0 {
            return None;
        }
        let ridge1 = c.ridge1?;
        let adjacent = adjacent_ridges(c.polygon0, &c.mesh0.ridges);
        let plane = ridge_overlap(
            std::slice::from_ref(c.polygon0),
            &adjacent,
            ridge1,
            f32::NEG_INFINITY,
        )?;
        if plane.overlap == f32::INFINITY {
            return None;
        }
        let mut overlap = plane.overlap;
        let mut normal = plane.normal;
        // A ridge contact whose normal deviates too far from the face
        // normal is already covered by the face pass.
        if c.polygon0.plane.normal.dot(normal) < cfg.min_cos_ridge_polygon {
            return None;
        }
        if (ctx.abs_position1 - intersection_point).dot(normal) < 0.0 {
            return None;
        }
        if c.mesh0_material.contains(PhysicsMaterial::SLIPPERY) {
            if let Some(sn) = ctx.surface_normal1 {
                if let Some(n1) = sn.surface_normal(intersection_point) {
                    normal = -n1;
                }
            }
            if let Some(modifier) = ctx.normal_modifier1 {
                let mut n = -normal;
                modifier.modify(intersection_point, &mut n, &mut overlap);
                normal = -n;
            }
        }
        Some(EdgeOverlap {
            overlap,
            normal,
            sat_used: true,
        })
    } else if convex0 && concave1 {
        let ridge1 = c.ridge1?;
        let plane = ridge_overlap(&c.mesh0.polygons, &[], ridge1, cfg.max_keep_normal)?;
        if plane.overlap == f32::INFINITY {
            return None;
        }
        let mut overlap = plane.overlap;
        let mut normal = plane.normal;
        if (intersection_point - ctx.abs_position0).dot(normal) < 0.0 {
            return None;
        }
        if c.mesh1_material.contains(PhysicsMaterial::SLIPPERY) {
            if let Some(sn) = ctx.surface_normal0 {
                if let Some(n0) = sn.surface_normal(intersection_point) {
                    normal = n0;
                }
            }
            if let Some(modifier) = ctx.normal_modifier0 {
                modifier.modify(intersection_point, &mut normal, &mut overlap);
            }
        }
        Some(EdgeOverlap {
            overlap,
            normal,
            sat_used: true,
        })
    } else {
        panic!(
            "physics material of neither mesh is convex (mesh {:?}, convexity: {}, {})",
            c.mesh0.name, convex0, convex1
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::mesh::CollisionMesh;
    use crate::utils::allocator::BodyId;
    use approx::assert_relative_eq;
    use glam::Mat3;

    fn scene<'a>(
        mesh0: &'a CollisionMesh,
        mesh1: &'a CollisionMesh,
    ) -> IntersectionScene<'a> {
        IntersectionScene {
            body0: BodyId::new(0, 0),
            body1: BodyId::new(1, 0),
            mesh0_material: mesh0.material,
            mesh1_material: mesh1.material,
            mesh0,
            mesh1: Some(mesh1),
            polygon0: &mesh0.polygons[0],
            ridge1: None,
            line1: None,
            tire_id1: None,
        }
    }

    #[test]
    fn convex_pair_uses_sat() {
        let m0 = CollisionMesh::cuboid("a", PhysicsMaterial::CONVEX, Vec3::splat(0.5));
        let m1 = CollisionMesh::cuboid("b", PhysicsMaterial::CONVEX, Vec3::splat(0.5))
            .transformed(Mat3::IDENTITY, Vec3::new(0.8, 0.0, 0.0));
        let c = scene(&m0, &m1);
        let ctx = EdgeOverlapContext {
            abs_position0: Vec3::ZERO,
            abs_position1: Vec3::new(0.8, 0.0, 0.0),
            surface_normal0: None,
            surface_normal1: None,
            normal_modifier0: None,
            normal_modifier1: None,
        };
        let mut st = SatTracker::new();
        let eo =
            compute_edge_overlap(&c, &ctx, Vec3::new(0.4, 0.0, 0.0), &mut st, &PhysicsConfig::default())
                .unwrap();
        assert!(eo.sat_used);
        assert_relative_eq!(eo.overlap, 0.2, epsilon = 1e-5);
        assert!(eo.normal.x > 0.9);
    }

    #[test]
    #[should_panic(expected = "physics material of neither mesh is convex")]
    fn unclassified_meshes_are_fatal() {
        let m0 = CollisionMesh::cuboid("a", PhysicsMaterial::VISIBLE, Vec3::splat(0.5));
        let m1 = CollisionMesh::cuboid("b", PhysicsMaterial::VISIBLE, Vec3::splat(0.5));
        let c = scene(&m0, &m1);
        let ctx = EdgeOverlapContext {
            abs_position0: Vec3::ZERO,
            abs_position1: Vec3::ZERO,
            surface_normal0: None,
            surface_normal1: None,
            normal_modifier0: None,
            normal_modifier1: None,
        };
        let mut st = SatTracker::new();
        compute_edge_overlap(&c, &ctx, Vec3::ZERO, &mut st, &PhysicsConfig::default());
    }
}
