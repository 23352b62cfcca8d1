//! Transient per-pair collision records shared by the collision passes of a
//! single substep.

use std::collections::HashMap;

use glam::Vec3;

use super::mesh::CollisionMesh;
use super::shapes::{CollisionLine, CollisionPolygon, CollisionRidge, VertexKey};
use crate::core::material::PhysicsMaterial;
use crate::utils::allocator::BodyId;

/// One candidate contact between a face of `mesh0` (owned by `body0`) and a
/// primitive of `body1`.
pub struct IntersectionScene<'a> {
    pub body0: BodyId,
    pub body1: BodyId,
    pub mesh0_material: PhysicsMaterial,
    pub mesh1_material: PhysicsMaterial,
    pub mesh0: &'a CollisionMesh,
    pub mesh1: Option<&'a CollisionMesh>,
    pub polygon0: &'a CollisionPolygon,
    /// Candidate ridge: `mesh1`'s edge ridge in the concave-vs-convex case,
    /// a terrain ridge in the convex-vs-concave case.
    pub ridge1: Option<&'a CollisionRidge>,
    pub line1: Option<&'a CollisionLine>,
    pub tire_id1: Option<usize>,
}

/// A raycast hit (tire ray or grind detection ray) against a face.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    pub body0: BodyId,
    pub body1: BodyId,
    pub tire_id1: Option<usize>,
    pub intersection_point: Vec3,
    /// Face normal at the hit.
    pub normal: Vec3,
    pub ray_t: f32,
    pub line: [Vec3; 2],
}

/// Deduplicates raycast hits per originating segment, keeping the hit with
/// the smallest ray parameter.
#[derive(Default)]
pub struct RaycastIntersections {
    hits: HashMap<(VertexKey, VertexKey), RaycastHit>,
}

impl RaycastIntersections {
    pub fn insert(&mut self, hit: RaycastHit) {
        let key = super::shapes::edge_key(hit.line[0], hit.line[1]);
        match self.hits.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                if hit.ray_t < e.get().ray_t {
                    e.insert(hit);
                }
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(hit);
            }
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = RaycastHit> + '_ {
        self.hits.drain().map(|(_, hit)| hit)
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Closest grind-rail candidate for one body within a substep.
#[derive(Debug, Clone, Copy)]
pub struct GrindInfo {
    pub squared_distance: f32,
    pub intersection_point: Vec3,
    pub rail_direction: Vec3,
    /// The rail's owner.
    pub rail_body: BodyId,
}

/// Keeps the minimum-distance grind candidate per grinding body.
#[derive(Default)]
pub struct GrindInfos {
    infos: HashMap<BodyId, GrindInfo>,
}

impl GrindInfos {
    pub fn insert(&mut self, body: BodyId, info: GrindInfo) {
        match self.infos.entry(body) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                if info.squared_distance < e.get().squared_distance {
                    e.insert(info);
                }
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(info);
            }
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (BodyId, GrindInfo)> + '_ {
        self.infos.drain()
    }
}

/// A concave face contact deferred until after the terrain pass, so that
/// ridge contacts can suppress faces they already cover.
pub struct DeferredConcaveContact {
    pub body0: BodyId,
    pub body1: BodyId,
    pub intersection_point: Vec3,
    pub normal: Vec3,
    pub overlap: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(t: f32, line: [Vec3; 2]) -> RaycastHit {
        RaycastHit {
            body0: BodyId::default(),
            body1: BodyId::default(),
            tire_id1: None,
            intersection_point: Vec3::ZERO,
            normal: Vec3::Y,
            ray_t: t,
            line,
        }
    }

    #[test]
    fn raycast_keeps_minimum_ray_t_per_segment() {
        let line = [Vec3::ZERO, Vec3::Y];
        let mut ri = RaycastIntersections::default();
        ri.insert(hit(0.7, line));
        ri.insert(hit(0.3, line));
        ri.insert(hit(0.5, line));
        let hits: Vec<_> = ri.drain().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ray_t, 0.3);
    }

    #[test]
    fn grind_keeps_minimum_distance() {
        let mut gi = GrindInfos::default();
        let body = BodyId::new(0, 0);
        let mk = |d: f32| GrindInfo {
            squared_distance: d,
            intersection_point: Vec3::ZERO,
            rail_direction: Vec3::X,
            rail_body: BodyId::default(),
        };
        gi.insert(body, mk(4.0));
        gi.insert(body, mk(1.0));
        gi.insert(body, mk(2.0));
        let infos: Vec<_> = gi.drain().collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].1.squared_distance, 1.0);
    }
}
