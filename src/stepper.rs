//! Per-frame simulation tick: advance the world, then sync the scene.

use rapier3d::prelude::Real;

use crate::config::WorldConfig;
use crate::observer::StepObserver;
use crate::scene::VisualCradle;
use crate::strings::StringManager;
use crate::world::SimulationWorld;

/// Drives the world from real frame deltas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stepper {
    pub max_delta: Real,
    pub max_sub_steps: u32,
    pub fixed_time_step: Real,
}

impl Stepper {
    pub fn new(config: &WorldConfig) -> Self {
        Stepper {
            max_delta: config.max_delta,
            max_sub_steps: config.max_sub_steps,
            fixed_time_step: config.fixed_time_step,
        }
    }

    /// `min(delta, max_delta)`. Negative or non-finite deltas become 0.
    pub fn clamp_delta(&self, delta: Real) -> Real {
        if delta.is_finite() && delta > 0.0 {
            delta.min(self.max_delta)
        } else {
            0.0
        }
    }

    /// Advance by one real frame and copy the result onto the scene.
    pub fn tick(
        &self,
        real_delta: Real,
        world: &mut SimulationWorld,
        scene: &mut VisualCradle,
        strings: &mut StringManager,
        observer: &mut impl StepObserver,
    ) {
        let delta = self.clamp_delta(real_delta);
        let sub_steps = world.step_simulation(delta, self.max_sub_steps, self.fixed_time_step);
        observer.on_advance(delta, sub_steps);

        let synced = sync_bodies(world, scene);
        observer.on_bodies_synced(synced);

        let visible = strings.update_strings(world, scene, delta);
        observer.on_strings_synced(visible);

        observer.on_step_complete();
    }
}

/// Copy every body transform onto the mesh that references it.
pub fn sync_bodies(world: &SimulationWorld, scene: &mut VisualCradle) -> usize {
    let mut count = 0;
    for index in 0..scene.meshes().len() {
        let Some(mesh) = scene.mesh_mut(index) else {
            continue;
        };
        let Some(transform) = mesh.body.and_then(|h| world.body_transform(h)) else {
            continue;
        };
        mesh.transform = transform;
        count += 1;
    }
    count
}
