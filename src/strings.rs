//! String/rope manager: builds, syncs and tears down the cradle strings.
//!
//! With soft-body support every string is a [`SoftBodyRope`] anchored to the
//! top bar and its ball. Without it, each string is a [`RigidChain`].
//!
//! Rope solves can diverge and produce non-finite node positions. The
//! per-frame sync never forwards those to the scene: it substitutes a
//! previous valid node (or a point on the straight line from the string
//! start to the ball) and skips the bounding box for that frame.

use log::{debug, warn};
use rapier3d::prelude::{point, Point, Real, RigidBodyHandle, Vector};

use crate::bodies::CradleBodies;
use crate::chain::RigidChain;
use crate::config::CradleConfig;
use crate::error::{CradleError, Result};
use crate::module::Capability;
use crate::scene::{BoundingBox, VisualCradle};
use crate::softbody::{SoftBodyConfig, SoftBodyHelpers, SoftMaterial};
use crate::solver::SoftBodyHandle;
use crate::world::SimulationWorld;

/// Lifecycle of the manager's strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StringState {
    Uninitialized,
    Built,
    TornDown,
}

/// Allows one warning per cooldown window of simulated time.
#[derive(Clone, Debug, PartialEq)]
pub struct WarnLimiter {
    cooldown: f64,
    last: Option<f64>,
}

impl WarnLimiter {
    pub fn new(cooldown: f64) -> Self {
        WarnLimiter { cooldown, last: None }
    }

    /// `true` if a warning may be emitted at `now`; records it if so.
    pub fn allow(&mut self, now: f64) -> bool {
        match self.last {
            Some(last) if now - last < self.cooldown => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Result of [`sanitize_polyline`].
#[derive(Clone, Debug, PartialEq)]
pub struct SanitizedPolyline {
    pub points: Vec<Point<Real>>,
    pub valid: usize,
    pub invalid: usize,
}

impl SanitizedPolyline {
    pub fn is_clean(&self) -> bool {
        self.invalid == 0
    }

    pub fn is_visible(&self) -> bool {
        self.valid > 0
    }
}

fn is_finite(p: &Point<Real>) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// Replace non-finite nodes so the result is safe to render.
///
/// An invalid node takes the last valid node before it, or, when none
/// exists yet, the point at the same fraction along `start..ball`.
pub fn sanitize_polyline(
    nodes: &[Point<Real>],
    start: Point<Real>,
    ball: Point<Real>,
) -> SanitizedPolyline {
    let last_index = nodes.len().saturating_sub(1).max(1) as Real;
    let mut points = Vec::with_capacity(nodes.len());
    let mut last_valid: Option<Point<Real>> = None;
    let mut valid = 0;

    for (i, node) in nodes.iter().enumerate() {
        if is_finite(node) {
            points.push(*node);
            last_valid = Some(*node);
            valid += 1;
        } else {
            let fallback = last_valid.unwrap_or_else(|| start + (ball - start) * (i as Real / last_index));
            points.push(fallback);
        }
    }
    SanitizedPolyline { invalid: nodes.len() - valid, points, valid }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StringBody {
    Soft(SoftBodyHandle),
    Chain(RigidChain),
}

/// One built string.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveString {
    pub index: usize,
    pub start: Point<Real>,
    pub ball: RigidBodyHandle,
    pub body: StringBody,
    limiter: WarnLimiter,
}

/// Owns every string of the cradle.
#[derive(Debug)]
pub struct StringManager {
    state: StringState,
    strings: Vec<LiveString>,
    anchor_failures: usize,
    ball_radius: Real,
    clock: f64,
}

impl Default for StringManager {
    fn default() -> Self {
        StringManager {
            state: StringState::Uninitialized,
            strings: Vec::new(),
            anchor_failures: 0,
            ball_radius: 0.0,
            clock: 0.0,
        }
    }
}

impl StringManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StringState {
        self.state
    }

    pub fn strings(&self) -> &[LiveString] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Anchor calls that reported failure since the manager was created.
    pub fn anchor_failures(&self) -> usize {
        self.anchor_failures
    }

    /// Build one string per ball, tearing down any previous strings first.
    pub fn build(
        &mut self,
        world: &mut SimulationWorld,
        scene: &VisualCradle,
        bodies: &CradleBodies,
        config: &CradleConfig,
    ) -> Result<usize> {
        if self.state == StringState::Built {
            self.teardown(world);
        }
        self.ball_radius = config.balls.radius;

        for (index, &ball) in bodies.balls.iter().enumerate() {
            if scene.string(index).is_none() {
                self.teardown(world);
                return Err(CradleError::MissingMesh(format!("string_{index}")));
            }
            let start = scene.layout.string_start(index);
            let result = match world.capability() {
                Capability::FullSoftBody => self
                    .build_rope(world, index, start, ball, bodies.top_bar, config)
                    .map(StringBody::Soft),
                Capability::RigidOnly => RigidChain::build(
                    world,
                    start,
                    ball,
                    config.balls.radius,
                    config.string.length,
                    config.string.segments,
                    &config.chain,
                )
                .map(StringBody::Chain),
            };
            let body = match result {
                Ok(body) => body,
                Err(err) => {
                    self.teardown(world);
                    return Err(err);
                }
            };
            self.strings.push(LiveString {
                index,
                start,
                ball,
                body,
                limiter: WarnLimiter::new(config.string.warn_cooldown as f64),
            });
        }

        self.state = StringState::Built;
        debug!("built {} strings ({:?})", self.strings.len(), world.capability());
        Ok(self.strings.len())
    }

    fn build_rope(
        &mut self,
        world: &mut SimulationWorld,
        index: usize,
        start: Point<Real>,
        ball: RigidBodyHandle,
        top_bar: Option<RigidBodyHandle>,
        config: &CradleConfig,
    ) -> Result<SoftBodyHandle> {
        let ball_top = world
            .body_transform(ball)
            .map(|iso| iso * point![0.0, config.balls.radius, 0.0])
            .ok_or(CradleError::UnknownBody(ball))?;

        let segments = config.string.segments;
        let mut rope = SoftBodyHelpers::create_rope(start, ball_top, segments, false, false);

        // Lay the nodes on the straight line and start them at rest.
        let count = rope.node_count();
        let last = (count - 1).max(1) as Real;
        // Frame end pinned, the rope mass shared evenly by the other nodes.
        let rope_mass = config.balls.mass * config.string.mass_fraction;
        let node_inverse = (count - 1) as Real / rope_mass;
        for i in 0..count {
            let t = i as Real / last;
            let p = start + (ball_top - start) * t;
            rope.set_node_position(i, p);
            rope.set_node_previous_position(i, p);
            rope.set_node_velocity(i, Vector::zeros());
            rope.set_node_inverse_mass(i, if i == 0 { 0.0 } else { node_inverse });
        }
        rope.reset_rest_lengths();
        rope.material = SoftMaterial::from_config(&config.soft_body);
        rope.config = SoftBodyConfig::from_config(&config.soft_body);

        let handle = world.add_soft_body(rope)?;

        let anchor = &config.string.anchor;
        let ends = [(0, top_bar), (count - 1, Some(ball))];
        for (node, target) in ends {
            let bound = target.and_then(|body| {
                world.append_anchor(handle, node, body, anchor.disable_collision, anchor.influence)
            });
            if bound.is_none() {
                self.anchor_failures += 1;
                warn!("string {index}: anchoring node {node} failed, rope kept unanchored");
            }
        }
        Ok(handle)
    }

    /// Remove every live string from `world`.
    pub fn teardown(&mut self, world: &mut SimulationWorld) -> usize {
        let mut removed = 0;
        for string in self.strings.drain(..) {
            match string.body {
                StringBody::Soft(handle) => {
                    if world.remove_soft_body(handle) {
                        removed += 1;
                    }
                }
                StringBody::Chain(chain) => {
                    chain.release(world);
                    removed += 1;
                }
            }
        }
        if self.state != StringState::Uninitialized {
            self.state = StringState::TornDown;
        }
        removed
    }

    /// Alias of [`StringManager::teardown`].
    pub fn clear_soft_bodies(&mut self, world: &mut SimulationWorld) -> usize {
        self.teardown(world)
    }

    /// Copy every string's current shape into its scene polyline.
    ///
    /// `elapsed` is the simulated time since the previous sync and drives
    /// warning rate limits. Returns the number of visible strings.
    pub fn update_strings(
        &mut self,
        world: &SimulationWorld,
        scene: &mut VisualCradle,
        elapsed: Real,
    ) -> usize {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.clock += elapsed as f64;
        }
        let mut visible = 0;
        for string in &mut self.strings {
            let ball_point = world
                .body_transform(string.ball)
                .map(|iso| iso * point![0.0, self.ball_radius, 0.0])
                .unwrap_or_else(|| scene.layout.ball_top(string.index));

            let reads: Option<Vec<Point<Real>>> = match &string.body {
                StringBody::Soft(handle) => world
                    .soft_body(*handle)
                    .map(|rope| rope.nodes().iter().map(|n| n.position).collect()),
                StringBody::Chain(chain) => {
                    let points = chain.joint_points(world);
                    if points.iter().all(Option::is_none) {
                        None
                    } else {
                        let nan = point![Real::NAN, Real::NAN, Real::NAN];
                        Some(points.into_iter().map(|p| p.unwrap_or(nan)).collect())
                    }
                }
            };

            let Some(mesh) = scene.string_mut(string.index) else {
                continue;
            };
            let Some(line) = mesh.line_mut() else {
                continue;
            };

            let reads = match reads {
                Some(reads) if !reads.is_empty() => reads,
                _ => {
                    let fallback = [string.start, ball_point];
                    line.positions.set_points(&fallback);
                    line.bounding_box = BoundingBox::from_points(&fallback);
                    mesh.visible = true;
                    visible += 1;
                    continue;
                }
            };

            let polyline = sanitize_polyline(&reads, string.start, ball_point);
            line.positions.set_points(&polyline.points);
            if polyline.is_clean() {
                line.bounding_box = BoundingBox::from_points(&polyline.points);
            } else if string.limiter.allow(self.clock) {
                warn!(
                    "string {}: {} of {} nodes non-finite, substituted",
                    string.index,
                    polyline.invalid,
                    reads.len()
                );
            }
            mesh.visible = polyline.is_visible();
            if mesh.visible {
                visible += 1;
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_waits_out_the_cooldown() {
        let mut limiter = WarnLimiter::new(1.0);
        assert!(limiter.allow(0.0));
        assert!(!limiter.allow(0.5));
        assert!(limiter.allow(1.0));
    }

    #[test]
    fn leading_invalid_nodes_fall_on_the_straight_line() {
        let nan = point![Real::NAN, 0.0, 0.0];
        let nodes = [nan, nan, point![0.0, 0.0, 0.0]];
        let out = sanitize_polyline(&nodes, point![0.0, 2.0, 0.0], point![0.0, 0.0, 0.0]);
        assert_eq!(out.points[0], point![0.0, 2.0, 0.0]);
        assert_eq!(out.points[1], point![0.0, 1.0, 0.0]);
        assert_eq!(out.valid, 1);
        assert_eq!(out.invalid, 2);
    }
}
