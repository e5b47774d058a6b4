//! Rigid-chain strings for worlds without soft bodies.
//!
//! A chain is a column of capsule segments joined by point constraints.
//! The top segment hangs from a kinematic anchor body at the string start
//! and the bottom segment holds the top of the ball.

use log::debug;
use rapier3d::prelude::{
    point, vector, ColliderBuilder, ImpulseJointHandle, InteractionGroups, Point, Real, RigidBodyBuilder,
    RigidBodyHandle,
};

use crate::config::ChainConfig;
use crate::error::{CradleError, Result};
use crate::world::SimulationWorld;

/// Bodies and constraints making up one string.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidChain {
    anchor: RigidBodyHandle,
    segments: Vec<RigidBodyHandle>,
    joints: Vec<ImpulseJointHandle>,
    ball: RigidBodyHandle,
    segment_length: Real,
}

impl RigidChain {
    /// Build `segment_count` segments from `start` down to the top of `ball`.
    ///
    /// On failure every body and constraint added so far is removed again.
    pub fn build(
        world: &mut SimulationWorld,
        start: Point<Real>,
        ball: RigidBodyHandle,
        ball_radius: Real,
        length: Real,
        segment_count: usize,
        config: &ChainConfig,
    ) -> Result<Self> {
        if segment_count == 0 {
            return Err(CradleError::InsufficientSegments { min: 1, got: 0 });
        }
        if world.rigid_body(ball).is_none() {
            return Err(CradleError::UnknownBody(ball));
        }

        let segment_length = length / segment_count as Real;
        let half = segment_length * 0.5;
        let capsule_half_height = (half - config.segment_radius).max(half * 0.1);

        let anchor = world.add_rigid_body(
            RigidBodyBuilder::kinematic_position_based()
                .translation(start.coords)
                .build(),
            None,
        );
        let mut chain = RigidChain {
            anchor,
            segments: Vec::with_capacity(segment_count),
            joints: Vec::with_capacity(segment_count + 1),
            ball,
            segment_length,
        };

        for i in 0..segment_count {
            let center = start - vector![0.0, segment_length * (i as Real + 0.5), 0.0];
            let body = RigidBodyBuilder::dynamic().translation(center.coords).build();
            let collider = ColliderBuilder::capsule_y(capsule_half_height, config.segment_radius)
                .mass(config.segment_mass)
                .collision_groups(InteractionGroups::none())
                .build();
            chain.segments.push(world.add_rigid_body(body, Some(collider)));
        }

        if let Err(err) = chain.link(world, ball_radius) {
            chain.release(world);
            return Err(err);
        }
        debug!("built rigid chain of {segment_count} segments");
        Ok(chain)
    }

    fn link(&mut self, world: &mut SimulationWorld, ball_radius: Real) -> Result<()> {
        let half = self.segment_length * 0.5;
        let top = point![0.0, half, 0.0];
        let bottom = point![0.0, -half, 0.0];

        let mut upper = (self.anchor, Point::origin());
        for &segment in &self.segments {
            self.joints.push(world.add_point_constraint(upper.0, upper.1, segment, top)?);
            upper = (segment, bottom);
        }
        self.joints.push(world.add_point_constraint(
            upper.0,
            upper.1,
            self.ball,
            point![0.0, ball_radius, 0.0],
        )?);
        Ok(())
    }

    pub fn anchor(&self) -> RigidBodyHandle {
        self.anchor
    }

    pub fn segments(&self) -> &[RigidBodyHandle] {
        &self.segments
    }

    pub fn ball(&self) -> RigidBodyHandle {
        self.ball
    }

    /// World positions of the `segments + 1` joint points, top to bottom.
    /// `None` where the segment body no longer exists.
    pub fn joint_points(&self, world: &SimulationWorld) -> Vec<Option<Point<Real>>> {
        let half = self.segment_length * 0.5;
        let mut points: Vec<Option<Point<Real>>> = self
            .segments
            .iter()
            .map(|&h| world.body_transform(h).map(|iso| iso * point![0.0, half, 0.0]))
            .collect();
        let last = self
            .segments
            .last()
            .and_then(|&h| world.body_transform(h))
            .map(|iso| iso * point![0.0, -half, 0.0]);
        points.push(last);
        points
    }

    /// Remove the chain's constraints and bodies. The ball is left alone.
    pub fn release(self, world: &mut SimulationWorld) -> usize {
        let mut removed = 0;
        for joint in self.joints {
            if world.remove_constraint(joint) {
                removed += 1;
            }
        }
        for body in self.segments.into_iter().chain(std::iter::once(self.anchor)) {
            if world.remove_rigid_body(body) {
                removed += 1;
            }
        }
        removed
    }
}
