//! Fixed-timestep physics loop on a dedicated thread.
//!
//! The loop thread is the sole mutator of body state; other threads read
//! committed poses between steps through the shared mutex. Stopping is
//! coarse-grained and only takes effect between steps.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;

use crate::engine::PhysicsEngine;

pub struct PhysicsLoop {
    engine: Arc<Mutex<PhysicsEngine>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PhysicsLoop {
    /// Takes ownership of the engine and starts stepping it in real time.
    pub fn spawn(engine: PhysicsEngine) -> io::Result<Self> {
        let engine = Arc::new(Mutex::new(engine));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = std::thread::Builder::new().name("physics".into()).spawn({
            let engine = Arc::clone(&engine);
            let stop = Arc::clone(&stop);
            move || run(&engine, &stop)
        })?;
        Ok(Self {
            engine,
            stop,
            handle: Some(handle),
        })
    }

    /// Shared handle for reading poses or mutating the registry between
    /// steps.
    pub fn engine(&self) -> &Arc<Mutex<PhysicsEngine>> {
        &self.engine
    }

    /// Signals the loop thread and waits for the current step to finish.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("physics thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.stop.load(Ordering::Relaxed)
    }
}

impl Drop for PhysicsLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(engine: &Mutex<PhysicsEngine>, stop: &AtomicBool) {
    debug!("physics loop started");
    let mut next_step = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        let dt = {
            let mut engine = engine.lock();
            engine.step();
            Duration::from_secs_f32(engine.config().dt)
        };
        next_step += dt;
        let now = Instant::now();
        if next_step > now {
            std::thread::sleep(next_step - now);
        } else {
            // Fell behind; step again immediately instead of accumulating
            // debt.
            next_step = now;
        }
    }
    debug!("physics loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::core::RigidBody;
    use crate::dynamics::GravityProvider;
    use glam::Vec3;

    #[test]
    fn loop_steps_the_engine_until_stopped() {
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let body = engine.bodies.add(RigidBody::cuboid_body(
            "probe",
            1.0,
            Vec3::splat(0.5),
            Vec3::new(0.0, 100.0, 0.0),
        ));
        engine.add_external_force_provider(Box::new(GravityProvider));
        let mut physics_loop = PhysicsLoop::spawn(engine).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        physics_loop.stop();
        assert!(!physics_loop.is_running());
        let engine = physics_loop.engine().lock();
        assert!(engine.time() > 0.0);
        let body = engine.bodies.get(body).unwrap();
        assert!(body.rbp.abs_position().y < 100.0);
    }
}
