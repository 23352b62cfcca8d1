//! Collision detection: meshes, separating-axis tests, ridge overlap, queries.

pub mod edge_overlap;
pub mod intersection;
pub mod mesh;
pub mod query;
pub mod ridge;
pub mod sat;
pub mod shapes;

pub use edge_overlap::{
    compute_edge_overlap, CollisionNormalModifier, EdgeOverlap, EdgeOverlapContext, SurfaceNormal,
};
pub use intersection::{
    DeferredConcaveContact, GrindInfo, GrindInfos, IntersectionScene, RaycastHit,
    RaycastIntersections,
};
pub use mesh::CollisionMesh;
pub use ridge::ridge_overlap;
pub use sat::{CollisionPlane, SatTracker};
pub use shapes::{
    edge_key, Aabb, BoundingSphere, CollisionLine, CollisionPolygon, CollisionRidge, Plane,
    VertexKey,
};
