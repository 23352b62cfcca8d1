//! Substep orchestration: collision passes, contact assembly, and solving.

use std::collections::HashSet;

use glam::Vec3;
use log::warn;

use crate::actuators::TireContact1;
use crate::collision::query::closest_ray_hit;
use crate::collision::{
    compute_edge_overlap, CollisionMesh, DeferredConcaveContact, EdgeOverlapContext, GrindInfo,
    GrindInfos, IntersectionScene, RaycastHit, RaycastIntersections, SatTracker,
};
use crate::config::{PhysicsConfig, SolverStrategy};
use crate::core::material::PhysicsMaterial;
use crate::core::{BodyRegistry, RigidBody};
use crate::dynamics::constraints::{
    BoundedPlaneEqualityConstraint, BoundedPlaneInequalityConstraint,
    BoundedShockAbsorberConstraint, FrictionContact1, FrictionContact2, FrictionCoefficients,
    LineContact1, LineContact2, LineEqualityConstraint, NormalContact1, NormalContact2,
    NormalImpulse, PlaneContact1, PlaneContact2, PlaneEqualityConstraint, PlaneInequalityConstraint,
    PointEqualityConstraint, ShockAbsorberConstraint, ShockAbsorberContact1,
};
use crate::dynamics::{
    solve_contacts, AdvanceTime, ContactInfo, Controllable, ExternalForceProvider, ImpactEvent,
    PenaltyContact, PenaltyResolver,
};
use crate::utils::logging::{warn_if_step_budget_exceeded, ScopedTimer};
use crate::utils::BodyId;

/// Iteration order of the movable-pair pass, alternated between substeps so
/// neither body of a pair is systematically solved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionDirection {
    Forward,
    Backward,
}

impl CollisionDirection {
    fn flipped(self) -> Self {
        match self {
            CollisionDirection::Forward => CollisionDirection::Backward,
            CollisionDirection::Backward => CollisionDirection::Forward,
        }
    }
}

/// Handle of a registered external-force provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderHandle(usize);

/// Handle of a registered controllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllableHandle(usize);

/// Handle of a registered advance-time observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTimeHandle(usize);

/// Step-local collision records, rebuilt from scratch on every `collide()`
/// call.
struct CollisionRecords {
    contacts: Vec<ContactInfo>,
    penalty_contacts: Vec<PenaltyContact>,
    raycast_intersections: RaycastIntersections,
    grind_infos: GrindInfos,
    concave_contacts: Vec<DeferredConcaveContact>,
    /// Body pairs that already received a face contact this substep.
    face_pairs: HashSet<(BodyId, BodyId)>,
    st: SatTracker,
}

impl CollisionRecords {
    fn new() -> Self {
        Self {
            contacts: Vec::new(),
            penalty_contacts: Vec::new(),
            raycast_intersections: RaycastIntersections::default(),
            grind_infos: GrindInfos::default(),
            concave_contacts: Vec::new(),
            face_pairs: HashSet::new(),
            st: SatTracker::new(),
        }
    }
}

/// Owns the bodies and runs the fixed-substep simulation.
pub struct PhysicsEngine {
    pub bodies: BodyRegistry,
    cfg: PhysicsConfig,
    collision_direction: CollisionDirection,
    external_force_providers: Vec<Option<Box<dyn ExternalForceProvider>>>,
    controllables: Vec<Option<Box<dyn Controllable>>>,
    advance_times: Vec<Option<Box<dyn AdvanceTime>>>,
    penalty_resolver: PenaltyResolver,
    impact_events: Vec<ImpactEvent>,
    time: f32,
}

impl PhysicsEngine {
    pub fn new(cfg: PhysicsConfig) -> Self {
        Self {
            bodies: BodyRegistry::new(),
            cfg,
            collision_direction: CollisionDirection::Forward,
            external_force_providers: Vec::new(),
            controllables: Vec::new(),
            advance_times: Vec::new(),
            penalty_resolver: PenaltyResolver::new(),
            impact_events: Vec::new(),
            time: 0.0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.cfg
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn add_external_force_provider(
        &mut self,
        provider: Box<dyn ExternalForceProvider>,
    ) -> ProviderHandle {
        self.external_force_providers.push(Some(provider));
        ProviderHandle(self.external_force_providers.len() - 1)
    }

    pub fn remove_external_force_provider(&mut self, handle: ProviderHandle) {
        match self.external_force_providers.get_mut(handle.0) {
            Some(slot @ Some(_)) => *slot = None,
            _ => warn!("external force provider {} already removed", handle.0),
        }
    }

    pub fn add_controllable(&mut self, controllable: Box<dyn Controllable>) -> ControllableHandle {
        self.controllables.push(Some(controllable));
        ControllableHandle(self.controllables.len() - 1)
    }

    pub fn remove_controllable(&mut self, handle: ControllableHandle) {
        match self.controllables.get_mut(handle.0) {
            Some(slot @ Some(_)) => *slot = None,
            _ => warn!("controllable {} already removed", handle.0),
        }
    }

    pub fn add_advance_time(&mut self, observer: Box<dyn AdvanceTime>) -> AdvanceTimeHandle {
        self.advance_times.push(Some(observer));
        AdvanceTimeHandle(self.advance_times.len() - 1)
    }

    pub fn remove_advance_time(&mut self, handle: AdvanceTimeHandle) {
        match self.advance_times.get_mut(handle.0) {
            Some(slot @ Some(_)) => *slot = None,
            _ => warn!("advance-time observer {} already removed", handle.0),
        }
    }

    /// Impact events accumulated since the previous call.
    pub fn take_impact_events(&mut self) -> Vec<ImpactEvent> {
        std::mem::take(&mut self.impact_events)
    }

    /// One collision substep: force reset, providers, mesh re-transform,
    /// the detection passes, then the solver.
    pub fn collide(&mut self, burn_in: bool, substep: u32) {
        let _t = ScopedTimer::new("collide");
        let cfg = self.cfg.clone();
        let movable = self.bodies.movable_ids();
        for &id in &movable {
            if let Some(body) = self.bodies.get_mut(id) {
                body.reset_forces(substep);
            }
        }
        for controllable in self.controllables.iter_mut().flatten() {
            controllable.notify_reset(self.bodies.arena_mut(), &cfg);
        }
        for provider in self.external_force_providers.iter_mut().flatten() {
            provider.increment_external_forces(self.bodies.arena_mut(), burn_in, &cfg);
        }
        for &id in &movable {
            if let Some(body) = self.bodies.get_mut(id) {
                body.transform_meshes();
                body.collide_with_air(&cfg);
            }
        }
        self.collision_direction = self.collision_direction.flipped();

        let mut records = CollisionRecords::new();
        collide_with_movables(
            &self.bodies,
            &cfg,
            self.collision_direction,
            &movable,
            &mut records,
        );
        collide_with_terrain(&self.bodies, &cfg, &movable, &mut records);
        // Rays are resolved before the grind pass so they can still add
        // grind candidates.
        resolve_raycast_intersections(&mut self.bodies, &cfg, &mut records);
        resolve_grind_infos(&mut self.bodies, &cfg, &mut records);
        resolve_concave_contacts(&self.bodies, &cfg, &mut records);

        let events = solve_contacts(
            self.bodies.arena_mut(),
            &mut records.contacts,
            &cfg,
            cfg.dt_substeps(),
        );
        self.impact_events.extend(events);
        for contact in &records.penalty_contacts {
            self.penalty_resolver
                .resolve(self.bodies.arena_mut(), contact, &cfg);
        }
    }

    /// Integrates every movable body by one substep, then notifies the
    /// advance-time observers.
    pub fn move_rigid_bodies(&mut self) {
        let dt = self.cfg.dt_substeps();
        for body in self.bodies.iter_mut() {
            if !body.rbp.is_static() {
                body.advance_time(dt);
            }
        }
        for observer in self.advance_times.iter_mut().flatten() {
            observer.advance_time(self.bodies.arena_mut(), dt);
        }
    }

    /// One outer step: `oversampling` collide/move substeps.
    pub fn step(&mut self) {
        let start = std::time::Instant::now();
        for substep in 0..self.cfg.oversampling {
            self.collide(false, substep);
            self.move_rigid_bodies();
        }
        self.time += self.cfg.dt;
        warn_if_step_budget_exceeded(start.elapsed(), self.cfg.dt * 1000.0);
    }

    /// Settles initial interpenetration before normal stepping. Velocities
    /// are zeroed throughout the first half so bodies sink into a resting
    /// configuration instead of bouncing out of it.
    pub fn burn_in(&mut self, duration: f32) {
        for body in self.bodies.iter_mut() {
            if let Some(engine) = &mut body.engine {
                engine.set_surface_power(crate::actuators::EnginePowerIntent {
                    surface_power: f32::NAN,
                    drive_relaxation: 1.0,
                });
            }
        }
        let dt = self.cfg.dt_substeps();
        let mut time = 0.0;
        while time < duration {
            self.collide(true, u32::MAX);
            if time < duration / 2.0 {
                for body in self.bodies.iter_mut() {
                    body.rbp.v_com = Vec3::ZERO;
                    body.rbp.w = Vec3::ZERO;
                }
            }
            self.move_rigid_bodies();
            time += dt;
        }
    }

    /// Line-of-sight test between the two bodies' positions against all
    /// other visible geometry.
    pub fn can_see(&self, body0: BodyId, body1: BodyId) -> bool {
        let (Some(b0), Some(b1)) = (self.bodies.get(body0), self.bodies.get(body1)) else {
            return false;
        };
        let l0 = b0.rbp.abs_position();
        let l1 = b1.rbp.abs_position();
        let meshes = self
            .bodies
            .arena()
            .ids()
            .filter(|&id| id != body0 && id != body1)
            .filter_map(|id| self.bodies.get(id))
            .flat_map(|b| b.transformed_meshes.iter());
        closest_ray_hit(meshes, l0, l1, PhysicsMaterial::VISIBLE).is_none()
    }
}

impl Drop for PhysicsEngine {
    fn drop(&mut self) {
        if !self.bodies.is_empty() {
            warn!(
                "physics engine dropped with {} bodies still registered",
                self.bodies.len()
            );
        }
        let providers = self.external_force_providers.iter().flatten().count();
        let controllables = self.controllables.iter().flatten().count();
        let observers = self.advance_times.iter().flatten().count();
        if providers + controllables + observers > 0 {
            warn!(
                "physics engine dropped with {providers} force providers, \
                 {controllables} controllables and {observers} advance-time \
                 observers still registered"
            );
        }
    }
}

fn collide_with_movables(
    bodies: &BodyRegistry,
    cfg: &PhysicsConfig,
    direction: CollisionDirection,
    movable: &[BodyId],
    records: &mut CollisionRecords,
) {
    let mut ids = movable.to_vec();
    if direction == CollisionDirection::Backward {
        ids.reverse();
    }
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (Some(b0), Some(b1)) = (bodies.get(ids[i]), bodies.get(ids[j])) else {
                continue;
            };
            collide_body_pair(cfg, ids[i], b0, ids[j], b1, records);
            collide_body_pair(cfg, ids[j], b1, ids[i], b0, records);
        }
    }
}

fn collide_with_terrain(
    bodies: &BodyRegistry,
    cfg: &PhysicsConfig,
    movable: &[BodyId],
    records: &mut CollisionRecords,
) {
    let static_ids: Vec<BodyId> = bodies
        .arena()
        .ids()
        .filter(|&id| bodies.get(id).is_some_and(|b| b.rbp.is_static()))
        .collect();
    for &id1 in movable {
        let Some(b1) = bodies.get(id1) else {
            continue;
        };
        for &id0 in &static_ids {
            let Some(b0) = bodies.get(id0) else {
                continue;
            };
            collide_body_pair(cfg, id0, b0, id1, b1, records);
        }
    }
}

fn collide_body_pair(
    cfg: &PhysicsConfig,
    id0: BodyId,
    b0: &RigidBody,
    id1: BodyId,
    b1: &RigidBody,
    records: &mut CollisionRecords,
) {
    for mesh0 in &b0.transformed_meshes {
        for mesh1 in &b1.transformed_meshes {
            if !mesh0.bounding_sphere.intersects(&mesh1.bounding_sphere) {
                continue;
            }
            collide_mesh_pair(cfg, id0, b0, id1, b1, mesh0, mesh1, records);
        }
    }
}

/// Detection between one ordered mesh pair. `mesh0` contributes faces and
/// rails, `mesh1` contributes lines, ridges, and faces.
#[allow(clippy::too_many_arguments)]
fn collide_mesh_pair(
    cfg: &PhysicsConfig,
    id0: BodyId,
    b0: &RigidBody,
    id1: BodyId,
    b1: &RigidBody,
    mesh0: &CollisionMesh,
    mesh1: &CollisionMesh,
    records: &mut CollisionRecords,
) {
    // Line primitives of mesh1 raycast against the faces of mesh0.
    if mesh1.material.intersects(PhysicsMaterial::TIRE_LINE) {
        if mesh1.lines.len() != b1.tires.len() {
            panic!(
                "number of tire lines ({}) does not match the number of tires ({}) in body {:?}",
                mesh1.lines.len(),
                b1.tires.len(),
                b1.name
            );
        }
        for (tire_id, line) in mesh1.lines.iter().enumerate() {
            raycast_line(id0, id1, Some(tire_id), line.line, mesh0, records);
        }
    } else if !mesh1.lines.is_empty() && mesh1.material.intersects(PhysicsMaterial::CHASSIS) {
        for line in &mesh1.lines {
            raycast_line(id0, id1, None, line.line, mesh0, records);
        }
    }

    // Faces of mesh1 against the grind rails of mesh0.
    if mesh1.material.intersects(PhysicsMaterial::GRIND_CONTACT)
        && mesh0.material.intersects(PhysicsMaterial::GRIND_LINE)
    {
        for rail in &mesh0.lines {
            for polygon in &mesh1.polygons {
                if !polygon.bounding_sphere.intersects(&rail.bounding_sphere) {
                    continue;
                }
                if let Some((point, _)) = polygon.intersect_line(rail.line[0], rail.line[1]) {
                    records.grind_infos.insert(
                        id1,
                        GrindInfo {
                            squared_distance: (point - b1.abs_grind_point()).length_squared(),
                            intersection_point: point,
                            rail_direction: rail.direction(),
                            rail_body: id0,
                        },
                    );
                }
            }
        }
    }

    let convex0 = mesh0.material.contains(PhysicsMaterial::CONVEX);
    let convex1 = mesh1.material.contains(PhysicsMaterial::CONVEX);
    let concave0 = mesh0.material.contains(PhysicsMaterial::CONCAVE);

    if convex0 && convex1 {
        // Edges of mesh1 against the faces of mesh0; the SAT plane is
        // memoized per mesh pair.
        for polygon1 in &mesh1.polygons {
            let n = polygon1.corners.len();
            for k in 0..n {
                let l0 = polygon1.corners[k];
                let l1 = polygon1.corners[(k + 1) % n];
                for polygon0 in &mesh0.polygons {
                    if !polygon0
                        .bounding_sphere
                        .intersects(&polygon1.bounding_sphere)
                    {
                        continue;
                    }
                    let Some((point, _)) = polygon0.intersect_line(l0, l1) else {
                        continue;
                    };
                    let scene = IntersectionScene {
                        body0: id0,
                        body1: id1,
                        mesh0_material: mesh0.material,
                        mesh1_material: mesh1.material,
                        mesh0,
                        mesh1: Some(mesh1),
                        polygon0,
                        ridge1: None,
                        line1: None,
                        tire_id1: None,
                    };
                    let ctx = overlap_context(b0, b1);
                    if let Some(eo) =
                        compute_edge_overlap(&scene, &ctx, point, &mut records.st, cfg)
                    {
                        push_face_contact(
                            cfg, b0, b1, id0, id1, point, eo.normal, eo.overlap, records,
                        );
                    }
                }
            }
        }
    } else if concave0 && convex1 {
        // Terrain faces against the convex body's edge ridges, deferred so
        // ridge contacts of the same substep can suppress them.
        for polygon0 in &mesh0.polygons {
            for ridge1 in mesh1.ridges.values() {
                if !polygon0.bounding_sphere.intersects(&ridge1.bounding_sphere) {
                    continue;
                }
                let Some((point, _)) = polygon0.intersect_line(ridge1.edge[0], ridge1.edge[1])
                else {
                    continue;
                };
                let scene = IntersectionScene {
                    body0: id0,
                    body1: id1,
                    mesh0_material: mesh0.material,
                    mesh1_material: mesh1.material,
                    mesh0,
                    mesh1: Some(mesh1),
                    polygon0,
                    ridge1: Some(ridge1),
                    line1: None,
                    tire_id1: None,
                };
                let ctx = overlap_context(b0, b1);
                if let Some(eo) = compute_edge_overlap(&scene, &ctx, point, &mut records.st, cfg)
                {
                    records.concave_contacts.push(DeferredConcaveContact {
                        body0: id0,
                        body1: id1,
                        intersection_point: point,
                        normal: eo.normal,
                        overlap: eo.overlap,
                    });
                }
            }
        }
        // Terrain ridges against the convex body's faces, with the roles
        // swapped so the ridge takes the mesh1 slot.
        for ridge0 in mesh0.ridges.values() {
            for polygon1 in &mesh1.polygons {
                if !polygon1.bounding_sphere.intersects(&ridge0.bounding_sphere) {
                    continue;
                }
                let Some((point, _)) = polygon1.intersect_line(ridge0.edge[0], ridge0.edge[1])
                else {
                    continue;
                };
                let scene = IntersectionScene {
                    body0: id1,
                    body1: id0,
                    mesh0_material: mesh1.material,
                    mesh1_material: mesh0.material,
                    mesh0: mesh1,
                    mesh1: Some(mesh0),
                    polygon0: polygon1,
                    ridge1: Some(ridge0),
                    line1: None,
                    tire_id1: None,
                };
                let ctx = overlap_context(b1, b0);
                if let Some(eo) = compute_edge_overlap(&scene, &ctx, point, &mut records.st, cfg)
                {
                    push_face_contact(
                        cfg, b1, b0, id1, id0, point, eo.normal, eo.overlap, records,
                    );
                }
            }
        }
    }
}

fn overlap_context<'a>(b0: &RigidBody, b1: &RigidBody) -> EdgeOverlapContext<'a> {
    EdgeOverlapContext {
        abs_position0: b0.rbp.abs_position(),
        abs_position1: b1.rbp.abs_position(),
        surface_normal0: None,
        surface_normal1: None,
        normal_modifier0: None,
        normal_modifier1: None,
    }
}

fn raycast_line(
    id0: BodyId,
    id1: BodyId,
    tire_id1: Option<usize>,
    line: [Vec3; 2],
    mesh0: &CollisionMesh,
    records: &mut CollisionRecords,
) {
    for polygon0 in &mesh0.polygons {
        if let Some((point, ray_t)) = polygon0.intersect_line(line[0], line[1]) {
            records.raycast_intersections.insert(RaycastHit {
                body0: id0,
                body1: id1,
                tire_id1,
                intersection_point: point,
                normal: polygon0.plane.normal,
                ray_t,
                line,
            });
        }
    }
}

/// Assembles one face contact. The normal points from `body0` toward
/// `body1`.
#[allow(clippy::too_many_arguments)]
fn push_face_contact(
    cfg: &PhysicsConfig,
    b0: &RigidBody,
    b1: &RigidBody,
    id0: BodyId,
    id1: BodyId,
    point: Vec3,
    normal: Vec3,
    overlap: f32,
    records: &mut CollisionRecords,
) {
    if overlap < -1e-3 {
        panic!(
            "face and edge of {:?} and {:?} do not overlap, are the meshes non-convex? gap: {}",
            b0.name, b1.name, -overlap
        );
    }
    // Contacts shallower than one substep of approach travel are deferred
    // to the next substep.
    let dv = b0.rbp.velocity_at_position(point) - b1.rbp.velocity_at_position(point);
    let vn = normal.dot(dv);
    if overlap < vn * cfg.dt_substeps() * cfg.slide_factor {
        return;
    }
    records.face_pairs.insert(body_pair(id0, id1));
    if cfg.solver_strategy == SolverStrategy::Penalty {
        records.penalty_contacts.push(PenaltyContact {
            body0: id0,
            body1: id1,
            point,
            normal,
            distance: overlap,
            tire_id: None,
        });
        return;
    }
    let m0 = b0.rbp.mass;
    let m1 = b1.rbp.mass;
    let coefficients = FrictionCoefficients {
        stiction: cfg.stiction_coefficient,
        friction: cfg.friction_coefficient,
    };
    if m0 == f32::INFINITY && m1 == f32::INFINITY {
        return;
    }
    if m0 == f32::INFINITY {
        records.contacts.push(ContactInfo::Normal1(NormalContact1 {
            body: id1,
            point,
            pc: bounded_inequality(normal, overlap, 0.001, cfg, m1 * cfg.velocity_lambda_min),
            friction: Some(FrictionContact1::new(
                point,
                b0.rbp.velocity_at_position(point),
                Some(coefficients),
            )),
        }));
    } else if m1 == f32::INFINITY {
        records.contacts.push(ContactInfo::Normal1(NormalContact1 {
            body: id0,
            point,
            pc: bounded_inequality(-normal, overlap, 0.001, cfg, m0 * cfg.velocity_lambda_min),
            friction: Some(FrictionContact1::new(
                point,
                b1.rbp.velocity_at_position(point),
                Some(coefficients),
            )),
        }));
    } else {
        let lambda_min = (m0 * m1) / (m0 + m1) * cfg.velocity_lambda_min;
        records.contacts.push(ContactInfo::Normal2(NormalContact2 {
            bodies: [id1, id0],
            point,
            pc: bounded_inequality(normal, overlap, 0.0, cfg, lambda_min),
            friction: Some(FrictionContact2::new(point, coefficients)),
        }));
    }
}

fn body_pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a < b { (a, b) } else { (b, a) }
}

fn bounded_inequality(
    normal: Vec3,
    overlap: f32,
    slop: f32,
    cfg: &PhysicsConfig,
    lambda_min: f32,
) -> BoundedPlaneInequalityConstraint {
    BoundedPlaneInequalityConstraint {
        constraint: PlaneInequalityConstraint {
            normal_impulse: NormalImpulse::new(normal),
            overlap,
            b: 0.0,
            slop,
            beta: cfg.beta,
        },
        lambda_min,
        lambda_max: 0.0,
    }
}

fn resolve_raycast_intersections(
    bodies: &mut BodyRegistry,
    cfg: &PhysicsConfig,
    records: &mut CollisionRecords,
) {
    let hits: Vec<RaycastHit> = records.raycast_intersections.drain().collect();
    for hit in hits {
        let normal = hit.normal;
        // Penetration of the far line endpoint below the face plane. The
        // epsilon keeps two overlapping one-sided planes with opposing
        // normals apart.
        let overlap = normal.dot(hit.intersection_point - hit.line[1]);
        if overlap < 1e-6 {
            continue;
        }
        let Some((b1, b0)) = bodies.arena_mut().get2_mut(hit.body1, hit.body0) else {
            continue;
        };
        let m0 = b0.rbp.mass;
        let m1 = b1.rbp.mass;
        if m1 == f32::INFINITY {
            continue;
        }
        if cfg.solver_strategy == SolverStrategy::Penalty {
            records.penalty_contacts.push(PenaltyContact {
                body0: hit.body0,
                body1: hit.body1,
                point: hit.intersection_point,
                normal,
                distance: overlap,
                tire_id: hit.tire_id1,
            });
            continue;
        }
        let coefficients = FrictionCoefficients {
            stiction: cfg.stiction_coefficient,
            friction: cfg.friction_coefficient,
        };
        match hit.tire_id1 {
            Some(tire_id) if m0 == f32::INFINITY => {
                let ray_direction = (hit.line[1] - hit.line[0]).normalize_or_zero();
                let fit = -normal.dot(ray_direction);
                if fit < 1e-12 {
                    continue;
                }
                let sap = (cfg.wheel_penetration_depth - overlap / fit).min(0.05);
                b1.tires[tire_id].shock_absorber_position = -sap;
                let tire = &b1.tires[tire_id];
                let sc = BoundedShockAbsorberConstraint {
                    constraint: ShockAbsorberConstraint {
                        normal_impulse: NormalImpulse::new(normal),
                        fit,
                        distance: sap,
                        ks: tire.sks,
                        ka: tire.ska,
                    },
                    lambda_min: m1 * cfg.velocity_lambda_min,
                    lambda_max: 0.0,
                };
                let contact_position = b1.get_abs_tire_contact_position(tire_id);
                let v_street = b0.rbp.velocity_at_position(contact_position);
                let fci = FrictionContact1::new(contact_position, v_street, None);
                match TireContact1::new(hit.body1, b1, tire_id, v_street, sc, fci, 1.0, cfg) {
                    Some(tc) => records.contacts.push(ContactInfo::Tire1(tc)),
                    // Tire lying flat on its side: keep the suspension
                    // active without tangential forces.
                    None => records
                        .contacts
                        .push(ContactInfo::ShockAbsorber1(ShockAbsorberContact1 {
                            body: hit.body1,
                            point: hit.intersection_point,
                            sc,
                        })),
                }
            }
            Some(tire_id) => {
                // Tire on a movable street: a plain two-body contact at
                // the suspension foot.
                let contact_position = b1.get_abs_tire_contact_position(tire_id);
                let lambda_min = (m0 * m1) / (m0 + m1) * cfg.velocity_lambda_min;
                records.contacts.push(ContactInfo::Normal2(NormalContact2 {
                    bodies: [hit.body1, hit.body0],
                    point: contact_position,
                    pc: bounded_inequality(normal, overlap, 0.001, cfg, lambda_min),
                    friction: Some(FrictionContact2::new(contact_position, coefficients)),
                }));
            }
            None if m0 == f32::INFINITY => {
                records.contacts.push(ContactInfo::Normal1(NormalContact1 {
                    body: hit.body1,
                    point: hit.intersection_point,
                    pc: bounded_inequality(
                        normal,
                        overlap,
                        0.001,
                        cfg,
                        m1 * cfg.velocity_lambda_min,
                    ),
                    friction: Some(FrictionContact1::new(
                        hit.intersection_point,
                        b0.rbp.velocity_at_position(hit.intersection_point),
                        Some(coefficients),
                    )),
                }));
            }
            None => {
                let lambda_min = (m0 * m1) / (m0 + m1) * cfg.velocity_lambda_min;
                records.contacts.push(ContactInfo::Normal2(NormalContact2 {
                    bodies: [hit.body1, hit.body0],
                    point: hit.intersection_point,
                    pc: bounded_inequality(normal, overlap, 0.0, cfg, lambda_min),
                    friction: Some(FrictionContact2::new(hit.intersection_point, coefficients)),
                }));
            }
        }
    }
}

fn resolve_grind_infos(
    bodies: &mut BodyRegistry,
    cfg: &PhysicsConfig,
    records: &mut CollisionRecords,
) {
    let infos: Vec<(BodyId, GrindInfo)> = records.grind_infos.drain().collect();
    for (id, info) in infos {
        let Some((body, rail)) = bodies.arena_mut().get2_mut(id, info.rail_body) else {
            continue;
        };
        let rail_mass = rail.rbp.mass;
        let mass = body.rbp.mass;
        let grind_point = body.abs_grind_point();
        let rail_direction = info.rail_direction;
        if body.grind_direction.length_squared() > 1e-12 {
            // Continuing grind: lock the grind point onto the rail line.
            let lec = LineEqualityConstraint {
                pec: PointEqualityConstraint {
                    p0: grind_point,
                    p1: info.intersection_point,
                    beta: cfg.point_equality_beta,
                },
                null_space: Some(rail_direction),
            };
            if rail_mass == f32::INFINITY {
                records.contacts.push(ContactInfo::Line1(LineContact1 {
                    body: id,
                    v1: rail.rbp.velocity_at_position(info.intersection_point),
                    lec,
                }));
            } else {
                records.contacts.push(ContactInfo::Line2(LineContact2 {
                    bodies: [id, info.rail_body],
                    lec,
                }));
            }
        } else {
            // First contact: constrain to the vertical plane containing
            // the rail and push out of the rail's top plane.
            let n = rail_direction.cross(Vec3::Y);
            let len2 = n.length_squared();
            if len2 < 1e-12 {
                warn!("rail direction of body {:?} is vertical", rail.name);
                continue;
            }
            let n = n / len2.sqrt();
            let pec = PlaneEqualityConstraint {
                pec: PointEqualityConstraint {
                    p0: grind_point,
                    p1: info.intersection_point,
                    beta: cfg.plane_equality_beta,
                },
                plane_normal: n,
            };
            let top_normal = n.cross(rail_direction);
            let top_overlap = top_normal.dot(info.intersection_point - grind_point);
            let pc = bounded_inequality(
                top_normal,
                top_overlap,
                0.0,
                cfg,
                mass * cfg.velocity_lambda_min,
            );
            if rail_mass == f32::INFINITY {
                records.contacts.push(ContactInfo::Plane1(PlaneContact1 {
                    body: id,
                    v1: rail.rbp.velocity_at_position(info.intersection_point),
                    pec: BoundedPlaneEqualityConstraint {
                        constraint: pec,
                        lambda_total: 0.0,
                        lambda_min: mass * cfg.velocity_lambda_min,
                        lambda_max: -mass * cfg.velocity_lambda_min,
                    },
                }));
                records.contacts.push(ContactInfo::Normal1(NormalContact1 {
                    body: id,
                    point: grind_point,
                    pc,
                    friction: None,
                }));
            } else {
                let reduced = (mass * rail_mass) / (mass + rail_mass);
                records.contacts.push(ContactInfo::Plane2(PlaneContact2 {
                    bodies: [id, info.rail_body],
                    pec: BoundedPlaneEqualityConstraint {
                        constraint: pec,
                        lambda_total: 0.0,
                        lambda_min: reduced * cfg.velocity_lambda_min,
                        lambda_max: -reduced * cfg.velocity_lambda_min,
                    },
                }));
                records.contacts.push(ContactInfo::Normal2(NormalContact2 {
                    bodies: [id, info.rail_body],
                    point: grind_point,
                    pc,
                    friction: None,
                }));
            }
        }
        body.grinding = true;
        body.grind_direction = rail_direction;
    }
}

fn resolve_concave_contacts(
    bodies: &BodyRegistry,
    cfg: &PhysicsConfig,
    records: &mut CollisionRecords,
) {
    let contacts = std::mem::take(&mut records.concave_contacts);
    // Ridge contacts of the same substep take precedence over the deferred
    // terrain-face contacts of the same body pair.
    let covered = std::mem::take(&mut records.face_pairs);
    for contact in contacts {
        if covered.contains(&body_pair(contact.body0, contact.body1)) {
            continue;
        }
        let (Some(b0), Some(b1)) = (bodies.get(contact.body0), bodies.get(contact.body1)) else {
            continue;
        };
        push_face_contact(
            cfg,
            b0,
            b1,
            contact.body0,
            contact.body1,
            contact.intersection_point,
            contact.normal,
            contact.overlap,
            records,
        );
    }
}
