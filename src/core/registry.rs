//! Body registry: arena storage plus destruction notification.

use std::collections::HashMap;

use log::debug;

use crate::core::body::RigidBody;
use crate::utils::{Arena, BodyId};

type DestroyObserver = Box<dyn FnOnce(BodyId) + Send>;

/// Owns all rigid bodies. External systems that hold [`BodyId`]s (scene
/// nodes, players, controllers) register destroy observers instead of
/// keeping back-pointers.
#[derive(Default)]
pub struct BodyRegistry {
    bodies: Arena<RigidBody>,
    destroy_observers: HashMap<BodyId, Vec<DestroyObserver>>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, body: RigidBody) -> BodyId {
        let id = self.bodies.insert(body);
        debug!("registered body {:?}", id);
        id
    }

    /// Removes a body, invoking its destroy observers.
    pub fn remove(&mut self, id: BodyId) -> Option<RigidBody> {
        let body = self.bodies.remove(id)?;
        debug!("removing body {} ({:?})", body.name, id);
        for observer in self.destroy_observers.remove(&id).unwrap_or_default() {
            observer(id);
        }
        Some(body)
    }

    /// Runs `observer` when the body is removed from the registry.
    pub fn on_destroy(&mut self, id: BodyId, observer: DestroyObserver) {
        self.destroy_observers.entry(id).or_default().push(observer);
    }

    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> {
        self.bodies.iter_mut()
    }

    pub fn ids(&self) -> Vec<BodyId> {
        self.bodies.ids().collect()
    }

    /// IDs of bodies with finite mass.
    pub fn movable_ids(&self) -> Vec<BodyId> {
        self.bodies
            .ids()
            .filter(|id| {
                self.bodies
                    .get(*id)
                    .is_some_and(|b| !b.rbp.is_static())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn arena(&self) -> &Arena<RigidBody> {
        &self.bodies
    }

    pub fn arena_mut(&mut self) -> &mut Arena<RigidBody> {
        &mut self.bodies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn destroy_observers_fire_on_remove() {
        let mut registry = BodyRegistry::new();
        let id = registry.add(RigidBody::stationary("anchor", Vec3::ZERO));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        registry.on_destroy(
            id,
            Box::new(move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(registry.remove(id).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Stale handle is rejected.
        assert!(registry.get(id).is_none());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn movable_ids_skip_static_bodies() {
        let mut registry = BodyRegistry::new();
        registry.add(RigidBody::stationary("floor", Vec3::ZERO));
        let movable = registry.add(RigidBody::cuboid_body(
            "box",
            1.0,
            Vec3::splat(0.5),
            Vec3::ZERO,
        ));
        assert_eq!(registry.movable_ids(), vec![movable]);
    }
}
