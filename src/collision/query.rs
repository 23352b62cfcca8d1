//! Collision-query helpers consumed by game logic (line-of-sight tests).

use glam::Vec3;

use super::mesh::CollisionMesh;
use crate::core::material::PhysicsMaterial;

/// The nearest intersection of the segment `l0..l1` with any mesh whose
/// material intersects `mask`, as (point, ray parameter).
pub fn closest_ray_hit<'a>(
    meshes: impl Iterator<Item = &'a CollisionMesh>,
    l0: Vec3,
    l1: Vec3,
    mask: PhysicsMaterial,
) -> Option<(Vec3, f32)> {
    let ray_sphere = super::shapes::BoundingSphere::from_points(&[l0, l1]);
    let mut best: Option<(Vec3, f32)> = None;
    for mesh in meshes {
        if !mesh.material.intersects(mask) {
            continue;
        }
        if !mesh.bounding_sphere.intersects(&ray_sphere) {
            continue;
        }
        for poly in &mesh.polygons {
            if let Some((p, t)) = poly.intersect_line(l0, l1) {
                if best.map_or(true, |(_, bt)| t < bt) {
                    best = Some((p, t));
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wall_blocks_sight() {
        let wall = CollisionMesh::cuboid(
            "wall",
            PhysicsMaterial::CONCAVE | PhysicsMaterial::VISIBLE,
            Vec3::new(0.1, 2.0, 2.0),
        );
        let hit = closest_ray_hit(
            std::iter::once(&wall),
            Vec3::new(-5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            PhysicsMaterial::VISIBLE,
        );
        let (p, t) = hit.unwrap();
        assert_relative_eq!(p.x, -0.1, epsilon = 1e-5);
        assert!(t < 0.5);
    }

    #[test]
    fn invisible_mesh_does_not_block() {
        let wall = CollisionMesh::cuboid("ghost", PhysicsMaterial::CONCAVE, Vec3::splat(1.0));
        assert!(closest_ray_hit(
            std::iter::once(&wall),
            Vec3::new(-5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            PhysicsMaterial::VISIBLE,
        )
        .is_none());
    }
}
