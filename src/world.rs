//! World factory and the simulation world that owns every engine object.
//!
//! A [`SimulationWorld`] is an arena: bodies, colliders, point constraints
//! and soft-body ropes all live inside it and are released together by
//! [`SimulationWorld::teardown`], which also runs on drop.

use std::num::NonZeroUsize;

use log::{debug, info};
use rapier3d::prelude::*;

use crate::config::WorldConfig;
use crate::error::{CradleError, Result};
use crate::module::{Capability, PhysicsModule};
use crate::softbody::SoftBodyRope;
use crate::solver::{SoftBodyHandle, SoftBodySolver};
use crate::constraint::Anchor;

/// Shared world parameters needed to build and step ropes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldInfo {
    pub gravity: Vector<Real>,
    pub air_density: Real,
    /// Largest distance a rope node may travel in one internal step.
    pub max_displacement: Real,
}

impl WorldInfo {
    /// `gravity` is a downward magnitude.
    pub fn new(gravity: Real, air_density: Real, max_displacement: Real) -> Self {
        WorldInfo {
            gravity: vector![0.0, -gravity, 0.0],
            air_density,
            max_displacement,
        }
    }
}

/// Counts of objects released by [`SimulationWorld::teardown`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub constraints: usize,
    pub soft_bodies: usize,
    pub rigid_bodies: usize,
}

impl TeardownReport {
    pub fn total(&self) -> usize {
        self.constraints + self.soft_bodies + self.rigid_bodies
    }
}

struct SoftWorld {
    solver: SoftBodySolver,
    info: WorldInfo,
}

/// Rigid-body world, optionally extended with a soft-body solver.
pub struct SimulationWorld {
    capability: Capability,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    soft: Option<SoftWorld>,
    accumulator: Real,
}

/// Build a world matching the module's negotiated capability.
///
/// Fails with [`CradleError::EngineUnavailable`] when the module is not
/// loaded; nothing is constructed in that case.
pub fn create_world(
    module: &PhysicsModule,
    config: &WorldConfig,
) -> Result<(SimulationWorld, Capability)> {
    let capability = module.capability().ok_or(CradleError::EngineUnavailable)?;

    let mut integration_parameters = IntegrationParameters::default();
    integration_parameters.dt = config.fixed_time_step;
    if let Some(iterations) = NonZeroUsize::new(config.solver_iterations) {
        integration_parameters.num_solver_iterations = iterations;
    }

    let soft = match capability {
        Capability::FullSoftBody => Some(SoftWorld {
            solver: SoftBodySolver::new(),
            info: WorldInfo::new(config.gravity, config.air_density, config.max_displacement),
        }),
        Capability::RigidOnly => None,
    };

    info!("created {:?} world, gravity {}", capability, config.gravity);

    let world = SimulationWorld {
        capability,
        gravity: vector![0.0, -config.gravity, 0.0],
        integration_parameters,
        physics_pipeline: PhysicsPipeline::new(),
        islands: IslandManager::new(),
        broad_phase: DefaultBroadPhase::new(),
        narrow_phase: NarrowPhase::new(),
        bodies: RigidBodySet::new(),
        colliders: ColliderSet::new(),
        impulse_joints: ImpulseJointSet::new(),
        multibody_joints: MultibodyJointSet::new(),
        ccd_solver: CCDSolver::new(),
        soft,
        accumulator: 0.0,
    };
    Ok((world, capability))
}

impl SimulationWorld {
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Rope construction parameters; `None` in a rigid-only world.
    pub fn world_info(&self) -> Option<&WorldInfo> {
        self.soft.as_ref().map(|s| &s.info)
    }

    pub fn gravity(&self) -> Vector<Real> {
        self.gravity
    }

    /// Set the downward gravity magnitude for bodies and ropes alike.
    pub fn set_gravity(&mut self, gravity: Real) {
        self.gravity = vector![0.0, -gravity, 0.0];
        if let Some(soft) = self.soft.as_mut() {
            soft.info.gravity = self.gravity;
        }
    }

    /// `(natural_frequency, damping_ratio)` of every point constraint.
    pub fn joint_softness(&self) -> (Real, Real) {
        (
            self.integration_parameters.joint_natural_frequency,
            self.integration_parameters.joint_damping_ratio,
        )
    }

    /// Softness applied to every point constraint in the world.
    pub fn set_joint_softness(&mut self, natural_frequency: Real, damping_ratio: Real) {
        self.integration_parameters.joint_natural_frequency = natural_frequency;
        self.integration_parameters.joint_damping_ratio = damping_ratio;
    }

    // --- rigid bodies ---

    pub fn add_rigid_body(&mut self, body: RigidBody, collider: Option<Collider>) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        if let Some(collider) = collider {
            self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        }
        handle
    }

    /// Remove a body with its colliders and attached constraints.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn rigid_body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Isometry<Real>> {
        self.bodies.get(handle).map(|b| *b.position())
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies.get(handle).map(|b| *b.linvel())
    }

    /// One-shot impulse on a dynamic body. Returns `false` for unknown or
    /// non-dynamic bodies.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vector<Real>) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) if body.is_dynamic() => {
                body.apply_impulse(impulse, true);
                true
            }
            _ => false,
        }
    }

    /// Drive a kinematic body toward `target` over the next internal step.
    pub fn set_kinematic_target(&mut self, handle: RigidBodyHandle, target: Point<Real>) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) if body.is_kinematic() => {
                body.set_next_kinematic_translation(target.coords);
                true
            }
            _ => false,
        }
    }

    // --- point constraints ---

    /// Pin `anchor_a` on `body_a` to `anchor_b` on `body_b` (local frames).
    pub fn add_point_constraint(
        &mut self,
        body_a: RigidBodyHandle,
        anchor_a: Point<Real>,
        body_b: RigidBodyHandle,
        anchor_b: Point<Real>,
    ) -> Result<ImpulseJointHandle> {
        for handle in [body_a, body_b] {
            if !self.bodies.contains(handle) {
                return Err(CradleError::UnknownBody(handle));
            }
        }
        let joint = SphericalJointBuilder::new()
            .local_anchor1(anchor_a)
            .local_anchor2(anchor_b)
            .build();
        Ok(self.impulse_joints.insert(body_a, body_b, joint, true))
    }

    pub fn remove_constraint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.remove(handle, true).is_some()
    }

    pub fn constraint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    // --- soft bodies ---

    pub fn add_soft_body(&mut self, rope: SoftBodyRope) -> Result<SoftBodyHandle> {
        let soft = self.soft.as_mut().ok_or(CradleError::SoftBodiesUnsupported)?;
        Ok(soft.solver.insert(rope))
    }

    pub fn remove_soft_body(&mut self, handle: SoftBodyHandle) -> bool {
        self.soft
            .as_mut()
            .map_or(false, |s| s.solver.remove(handle).is_some())
    }

    pub fn soft_body(&self, handle: SoftBodyHandle) -> Option<&SoftBodyRope> {
        self.soft.as_ref().and_then(|s| s.solver.get(handle))
    }

    pub fn soft_body_mut(&mut self, handle: SoftBodyHandle) -> Option<&mut SoftBodyRope> {
        self.soft.as_mut().and_then(|s| s.solver.get_mut(handle))
    }

    pub fn soft_body_count(&self) -> usize {
        self.soft.as_ref().map_or(0, |s| s.solver.len())
    }

    /// Bind `node` of `rope` to `body` at the node's current position.
    ///
    /// Returns the anchor index, or `None` when the rope, node or body does
    /// not exist or `influence` is not finite. Callers must check the result.
    pub fn append_anchor(
        &mut self,
        rope: SoftBodyHandle,
        node: usize,
        body: RigidBodyHandle,
        disable_collision: bool,
        influence: Real,
    ) -> Option<usize> {
        if !influence.is_finite() {
            return None;
        }
        let body_position = *self.bodies.get(body)?.position();
        let rope_ref = self.soft.as_mut()?.solver.get_mut(rope)?;
        let world_point = rope_ref.node_position(node)?;
        if !world_point.iter().all(|c| c.is_finite()) {
            return None;
        }
        rope_ref.push_anchor(Anchor {
            node,
            body,
            local_point: body_position.inverse_transform_point(&world_point),
            influence: influence.clamp(0.0, 1.0),
            disable_collision,
        });
        Some(rope_ref.anchors().len() - 1)
    }

    // --- stepping ---

    /// Advance by `delta` seconds in fixed internal steps.
    ///
    /// Time accumulates across calls. At most `max_sub_steps` internal steps
    /// run per call; time beyond that is dropped. Returns the number of
    /// internal steps taken.
    pub fn step_simulation(&mut self, delta: Real, max_sub_steps: u32, fixed_time_step: Real) -> u32 {
        if !(delta.is_finite() && delta > 0.0 && fixed_time_step > 0.0) {
            return 0;
        }
        self.accumulator += delta;
        let available = (self.accumulator / fixed_time_step + 1.0e-4).floor() as u32;
        let steps = if available > max_sub_steps {
            self.accumulator = 0.0;
            max_sub_steps
        } else {
            self.accumulator = (self.accumulator - available as Real * fixed_time_step).max(0.0);
            available
        };

        self.integration_parameters.dt = fixed_time_step;
        for _ in 0..steps {
            self.step_once(fixed_time_step);
        }
        steps
    }

    fn step_once(&mut self, dt: Real) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        if let Some(soft) = self.soft.as_mut() {
            soft.solver.step(dt, &soft.info, &mut self.bodies, &self.colliders);
        }
    }

    // --- teardown ---

    /// Release every constraint, rope and body, in that order.
    pub fn teardown(&mut self) -> TeardownReport {
        let joints: Vec<ImpulseJointHandle> = self.impulse_joints.iter().map(|(h, _)| h).collect();
        let mut report = TeardownReport::default();
        for handle in joints {
            if self.impulse_joints.remove(handle, false).is_some() {
                report.constraints += 1;
            }
        }

        if let Some(soft) = self.soft.as_mut() {
            report.soft_bodies = soft.solver.clear();
        }

        let bodies: Vec<RigidBodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
        for handle in bodies {
            if self.remove_rigid_body(handle) {
                report.rigid_bodies += 1;
            }
        }
        self.accumulator = 0.0;

        if report.total() > 0 {
            debug!(
                "world teardown: {} constraints, {} soft bodies, {} rigid bodies",
                report.constraints, report.soft_bodies, report.rigid_bodies
            );
        }
        report
    }
}

impl Drop for SimulationWorld {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(capability_features: crate::module::EngineFeatures) -> SimulationWorld {
        let module = PhysicsModule::load_with(capability_features);
        create_world(&module, &WorldConfig::default()).unwrap().0
    }

    #[test]
    fn accumulator_carries_remainder() {
        let mut w = world(crate::module::EngineFeatures::RIGID_ONLY);
        let fixed = 0.01;
        assert_eq!(w.step_simulation(0.015, 10, fixed), 1);
        assert_eq!(w.step_simulation(0.005, 10, fixed), 1);
        assert_eq!(w.step_simulation(0.004, 10, fixed), 0);
    }

    #[test]
    fn sub_steps_are_capped() {
        let mut w = world(crate::module::EngineFeatures::RIGID_ONLY);
        assert_eq!(w.step_simulation(1.0, 3, 0.01), 3);
        // dropped time is not replayed
        assert_eq!(w.step_simulation(0.001, 3, 0.01), 0);
    }

    #[test]
    fn anchor_on_missing_body_fails() {
        let mut w = world(crate::module::EngineFeatures::ALL);
        let rope = crate::softbody::SoftBodyHelpers::create_rope(
            point![0.0, 2.0, 0.0],
            point![0.0, 0.0, 0.0],
            4,
            true,
            false,
        );
        let rope = w.add_soft_body(rope).unwrap();
        let body = w.add_rigid_body(RigidBodyBuilder::fixed().build(), None);
        assert!(w.remove_rigid_body(body));
        assert_eq!(w.append_anchor(rope, 0, body, true, 1.0), None);
        assert_eq!(w.soft_body(rope).unwrap().anchors().len(), 0);
    }
}
