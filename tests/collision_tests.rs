use approx::assert_relative_eq;
use contact_patch::collision::sat::collision_plane;
use contact_patch::collision::CollisionMesh;
use contact_patch::*;

fn unit_cuboid_at(position: Vec3) -> CollisionMesh {
    CollisionMesh::cuboid("box", PhysicsMaterial::CONVEX, Vec3::splat(0.5))
        .transformed(Mat3::IDENTITY, position)
}

#[test]
fn sat_overlap_matches_axis_aligned_penetration() {
    let mesh0 = unit_cuboid_at(Vec3::ZERO);
    let mesh1 = unit_cuboid_at(Vec3::new(0.9, 0.0, 0.0));
    let plane = collision_plane(&mesh0, &mesh1).unwrap();
    assert_relative_eq!(plane.overlap, 0.1, epsilon = 1e-5);
    // The normal points from mesh0 toward mesh1.
    assert_relative_eq!(plane.normal.dot(Vec3::X), 1.0, epsilon = 1e-5);
}

#[test]
fn sat_reports_negative_overlap_for_disjoint_meshes() {
    let mesh0 = unit_cuboid_at(Vec3::ZERO);
    let mesh1 = unit_cuboid_at(Vec3::new(2.0, 0.0, 0.0));
    let plane = collision_plane(&mesh0, &mesh1).unwrap();
    assert_relative_eq!(plane.overlap, -1.0, epsilon = 1e-5);
}

#[test]
fn cuboid_meshes_carry_their_box_edges_as_ridges() {
    let mesh = CollisionMesh::cuboid("box", PhysicsMaterial::CONVEX, Vec3::splat(0.5));
    assert_eq!(mesh.polygons.len(), 12);
    // The 12 box edges survive; the 6 coplanar face diagonals do not.
    assert_eq!(mesh.ridges.len(), 12);
    for ridge in mesh.ridges.values() {
        assert_relative_eq!(ridge.normal.length(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn polygons_intersect_crossing_segments_only() {
    let mesh = unit_cuboid_at(Vec3::ZERO);
    let l0 = Vec3::new(0.1, 2.0, 0.1);
    let l1 = Vec3::new(0.1, 0.0, 0.1);
    let hit = mesh.polygons.iter().find_map(|polygon| {
        if polygon.plane.normal.y < 0.9 {
            return None;
        }
        polygon.intersect_line(l0, l1)
    });
    let (point, _) = hit.expect("segment should pierce the top face");
    assert_relative_eq!(point.y, 0.5, epsilon = 1e-5);

    // A segment ending above the face does not intersect.
    let miss = mesh
        .polygons
        .iter()
        .find_map(|polygon| polygon.intersect_line(l0, Vec3::new(0.1, 0.6, 0.1)));
    assert!(miss.is_none());
}
