//! Rigid bodies for the balls and the static frame.

use log::debug;
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, RigidBodyHandle};

use crate::config::BallConfig;
use crate::error::{CradleError, Result};
use crate::scene::{FramePart, Geometry, Role, VisualCradle};
use crate::world::SimulationWorld;

/// Handles of the bodies built for one cradle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CradleBodies {
    /// One per ball, in ball order.
    pub balls: Vec<RigidBodyHandle>,
    pub frame: Vec<RigidBodyHandle>,
    /// Body the strings hang from.
    pub top_bar: Option<RigidBodyHandle>,
}

impl CradleBodies {
    pub fn len(&self) -> usize {
        self.balls.len() + self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ball(&self, index: usize) -> Option<RigidBodyHandle> {
        self.balls.get(index).copied()
    }

    /// Ball index owning `handle`.
    pub fn ball_index(&self, handle: RigidBodyHandle) -> Option<usize> {
        self.balls.iter().position(|&h| h == handle)
    }
}

/// Builds and tracks ball and frame bodies. Every build is a full replace.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    tracked: CradleBodies,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> &CradleBodies {
        &self.tracked
    }

    /// Build one dynamic body per ball mesh and one fixed body per frame
    /// mesh, linking each mesh and body to the other.
    ///
    /// Previously tracked bodies are removed first. With no world, nothing
    /// is touched and [`CradleError::EngineUnavailable`] is returned.
    pub fn build_bodies(
        &mut self,
        scene: &mut VisualCradle,
        world: Option<&mut SimulationWorld>,
        balls: &BallConfig,
    ) -> Result<&CradleBodies> {
        let world = world.ok_or(CradleError::EngineUnavailable)?;
        if !(balls.mass.is_finite() && balls.mass > 0.0) {
            return Err(CradleError::InvalidMass { field: "balls.mass" });
        }

        let removed = self.remove_all(world);
        if removed > 0 {
            debug!("replaced {removed} tracked bodies");
        }

        let mut built = CradleBodies::default();
        for mesh_index in 0..scene.meshes().len() {
            let Some(mesh) = scene.mesh(mesh_index) else {
                continue;
            };
            let translation = mesh.transform.translation.vector;
            let handle = match (&mesh.role, &mesh.geometry) {
                (Role::Ball(_), Geometry::Sphere { radius }) => {
                    let body = RigidBodyBuilder::dynamic()
                        .translation(translation)
                        .linear_damping(balls.linear_damping)
                        .angular_damping(balls.angular_damping)
                        .ccd_enabled(true)
                        .user_data(mesh_index as u128)
                        .build();
                    let collider = ColliderBuilder::ball(*radius)
                        .mass(balls.mass)
                        .friction(balls.friction)
                        .restitution(balls.restitution)
                        .build();
                    let handle = world.add_rigid_body(body, Some(collider));
                    built.balls.push(handle);
                    handle
                }
                (Role::Frame(part), Geometry::Cuboid { half_extents }) => {
                    let body = RigidBodyBuilder::fixed()
                        .translation(translation)
                        .user_data(mesh_index as u128)
                        .build();
                    let collider =
                        ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                            .friction(balls.friction)
                            .build();
                    let part = *part;
                    let handle = world.add_rigid_body(body, Some(collider));
                    if part == FramePart::Top {
                        built.top_bar = Some(handle);
                    }
                    built.frame.push(handle);
                    handle
                }
                _ => continue,
            };
            if let Some(mesh) = scene.mesh_mut(mesh_index) {
                mesh.body = Some(handle);
            }
        }

        debug!("built {} ball and {} frame bodies", built.balls.len(), built.frame.len());
        self.tracked = built;
        Ok(&self.tracked)
    }

    /// Remove every tracked body from `world`. Returns how many existed.
    pub fn remove_all(&mut self, world: &mut SimulationWorld) -> usize {
        let tracked = std::mem::take(&mut self.tracked);
        tracked
            .balls
            .into_iter()
            .chain(tracked.frame)
            .filter(|&h| world.remove_rigid_body(h))
            .count()
    }
}
