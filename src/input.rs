//! Pointer, touch and keyboard interaction.
//!
//! Mouse and touch events are normalized to one pointer path: select the
//! nearest ball under the pointer, drag it with a kinematic anchor, and on
//! release throw it with the velocity estimated from recent drag samples.

use std::collections::VecDeque;

use log::debug;
use rapier3d::prelude::{
    ImpulseJointHandle, Point, Ray, Real, RigidBodyBuilder, RigidBodyHandle, Vector,
};

use crate::bodies::CradleBodies;
use crate::camera::{Camera, Viewport};
use crate::config::InputConfig;
use crate::scene::{Geometry, VisualCradle};
use crate::world::SimulationWorld;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Space,
    S,
    Other,
}

/// Host input, in client pixels and seconds.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseDown { x: Real, y: Real, time: f64 },
    MouseMove { x: Real, y: Real, time: f64 },
    MouseUp { x: Real, y: Real, time: f64 },
    /// Active touch points; only the first one is tracked.
    TouchStart { touches: Vec<(Real, Real)>, time: f64 },
    TouchMove { touches: Vec<(Real, Real)>, time: f64 },
    TouchEnd { time: f64 },
    KeyDown(Key),
    Resize { width: Real, height: Real },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

/// A mouse or touch event reduced to one pointer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub kind: PointerKind,
    /// `None` when the event carries no position (touch end).
    pub position: Option<(Real, Real)>,
    pub time: f64,
}

impl InputEvent {
    /// The pointer view of this event, if it is a pointer event.
    pub fn pointer(&self) -> Option<PointerEvent> {
        use PointerKind::{Mouse, Touch};
        use PointerPhase::{Down, Move, Up};
        let (phase, kind, position, time) = match self {
            InputEvent::MouseDown { x, y, time } => (Down, Mouse, Some((*x, *y)), *time),
            InputEvent::MouseMove { x, y, time } => (Move, Mouse, Some((*x, *y)), *time),
            InputEvent::MouseUp { x, y, time } => (Up, Mouse, Some((*x, *y)), *time),
            InputEvent::TouchStart { touches, time } => (Down, Touch, touches.first().copied(), *time),
            InputEvent::TouchMove { touches, time } => (Move, Touch, touches.first().copied(), *time),
            InputEvent::TouchEnd { time } => (Up, Touch, None, *time),
            _ => return None,
        };
        Some(PointerEvent { phase, kind, position, time })
    }
}

/// One drag position sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragSample {
    pub position: Point<Real>,
    pub time: f64,
}

/// Rolling window of the most recent drag samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DragHistory {
    samples: VecDeque<DragSample>,
    capacity: usize,
}

impl DragHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        DragHistory { samples: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, position: Point<Real>, time: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(DragSample { position, time });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &DragSample> {
        self.samples.iter()
    }

    /// Average velocity between the oldest and newest samples.
    pub fn velocity(&self) -> Option<Vector<Real>> {
        if self.samples.len() < 2 {
            return None;
        }
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let span = last.time - first.time;
        if !(span > 0.0) {
            return None;
        }
        Some((last.position - first.position) / span as Real)
    }
}

/// Impulse thrown into a ball of `mass` on release.
pub fn release_impulse(history: &DragHistory, mass: Real, scale: Real) -> Option<Vector<Real>> {
    history.velocity().map(|v| v * (mass * scale))
}

/// Distance along `ray` to the first hit on a sphere, if any.
pub fn ray_sphere(ray: &Ray, center: &Point<Real>, radius: Real) -> Option<Real> {
    let oc = ray.origin - center;
    let b = oc.dot(&ray.dir);
    let c = oc.norm_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let near = -b - sqrt;
    let far = -b + sqrt;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Intersection of `ray` with the plane through `point` with `normal`.
pub fn ray_plane(ray: &Ray, point: &Point<Real>, normal: &Vector<Real>) -> Option<Point<Real>> {
    let denom = normal.dot(&ray.dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = normal.dot(&(point - ray.origin)) / denom;
    if t < 0.0 {
        return None;
    }
    Some(ray.point_at(t))
}

/// Nearest visible ball hit by `ray`: `(ball index, hit distance)`.
pub fn pick_ball(scene: &VisualCradle, ray: &Ray) -> Option<(usize, Real)> {
    let mut best: Option<(usize, Real)> = None;
    for ball in 0..scene.ball_count() {
        let Some(mesh) = scene.ball(ball) else {
            continue;
        };
        let Geometry::Sphere { radius } = mesh.geometry else {
            continue;
        };
        if !mesh.visible {
            continue;
        }
        if let Some(toi) = ray_sphere(ray, &mesh.position(), radius) {
            if best.map_or(true, |(_, d)| toi < d) {
                best = Some((ball, toi));
            }
        }
    }
    best
}

/// Kinematic anchor pulling a selected ball around.
#[derive(Clone, Debug, PartialEq)]
pub struct DragConstraint {
    pub ball_index: usize,
    pub ball: RigidBodyHandle,
    pub anchor: RigidBodyHandle,
    pub joint: ImpulseJointHandle,
    /// The drag plane faces the camera through the initial hit point.
    pub plane_point: Point<Real>,
    pub plane_normal: Vector<Real>,
    pub history: DragHistory,
    pub kind: PointerKind,
}

impl DragConstraint {
    fn release(&self, world: &mut SimulationWorld) {
        world.remove_constraint(self.joint);
        world.remove_rigid_body(self.anchor);
    }
}

/// What an event did.
#[derive(Clone, Debug, PartialEq)]
pub enum InputOutcome {
    Ignored,
    Selected(usize),
    Dragged(usize),
    Released { ball: usize, impulse: Option<Vector<Real>> },
    Kicked,
    SettingsToggled(bool),
    Resized,
}

/// Everything an input handler may touch.
pub struct InputContext<'a> {
    pub world: &'a mut SimulationWorld,
    pub scene: &'a VisualCradle,
    pub bodies: &'a CradleBodies,
    pub camera: &'a mut Camera,
    pub viewport: &'a mut Viewport,
}

/// Pointer and keyboard state machine.
#[derive(Debug)]
pub struct InputController {
    config: InputConfig,
    drag: Option<DragConstraint>,
    last_tap: Option<f64>,
    pending_click: bool,
    settings_visible: bool,
}

impl InputController {
    pub fn new(config: InputConfig) -> Self {
        InputController {
            config,
            drag: None,
            last_tap: None,
            pending_click: false,
            settings_visible: false,
        }
    }

    pub fn set_config(&mut self, config: InputConfig) {
        self.config = config;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag(&self) -> Option<&DragConstraint> {
        self.drag.as_ref()
    }

    pub fn settings_visible(&self) -> bool {
        self.settings_visible
    }

    pub fn handle(&mut self, event: &InputEvent, ctx: InputContext<'_>) -> InputOutcome {
        if let Some(pointer) = event.pointer() {
            return match pointer.phase {
                PointerPhase::Down => self.pointer_down(pointer, ctx),
                PointerPhase::Move => self.pointer_move(pointer, ctx),
                PointerPhase::Up => self.pointer_up(ctx),
            };
        }
        match event {
            InputEvent::KeyDown(Key::Space) => {
                if self.kick(ctx.world, ctx.bodies) {
                    InputOutcome::Kicked
                } else {
                    InputOutcome::Ignored
                }
            }
            InputEvent::KeyDown(Key::S) => {
                self.settings_visible = !self.settings_visible;
                InputOutcome::SettingsToggled(self.settings_visible)
            }
            InputEvent::Resize { width, height } => {
                *ctx.viewport = Viewport::new(*width, *height);
                ctx.camera.set_aspect(ctx.viewport.aspect());
                InputOutcome::Resized
            }
            _ => InputOutcome::Ignored,
        }
    }

    /// Apply the configured kick-off impulse to the first ball.
    pub fn kick(&mut self, world: &mut SimulationWorld, bodies: &CradleBodies) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let [x, y, z] = self.config.kick_impulse;
        bodies
            .ball(0)
            .map_or(false, |ball| world.apply_impulse(ball, Vector::new(x, y, z)))
    }

    fn pointer_down(&mut self, pointer: PointerEvent, ctx: InputContext<'_>) -> InputOutcome {
        self.pending_click = false;
        if let Some(drag) = self.drag.take() {
            drag.release(ctx.world);
        }
        let Some((x, y)) = pointer.position else {
            return InputOutcome::Ignored;
        };
        let (nx, ny) = ctx.viewport.to_ndc(x, y);
        let ray = ctx.camera.ray_from_ndc(nx, ny);

        let Some((ball_index, toi)) = pick_ball(ctx.scene, &ray) else {
            return self.empty_press(pointer, ctx);
        };
        let Some(ball) = ctx.bodies.ball(ball_index) else {
            return InputOutcome::Ignored;
        };
        let Some(ball_pose) = ctx.world.body_transform(ball) else {
            return InputOutcome::Ignored;
        };

        let hit = ray.point_at(toi);
        let anchor = ctx.world.add_rigid_body(
            RigidBodyBuilder::kinematic_position_based()
                .translation(hit.coords)
                .build(),
            None,
        );
        let local_hit = ball_pose.inverse_transform_point(&hit);
        let joint = match ctx.world.add_point_constraint(anchor, Point::origin(), ball, local_hit) {
            Ok(joint) => joint,
            Err(_) => {
                ctx.world.remove_rigid_body(anchor);
                return InputOutcome::Ignored;
            }
        };

        let mut history = DragHistory::new(self.config.drag_history);
        history.push(hit, pointer.time);
        self.drag = Some(DragConstraint {
            ball_index,
            ball,
            anchor,
            joint,
            plane_point: hit,
            plane_normal: -ctx.camera.forward(),
            history,
            kind: pointer.kind,
        });
        debug!("selected ball {ball_index}");
        InputOutcome::Selected(ball_index)
    }

    /// A press that hit no ball: a click, or half of a double tap.
    fn empty_press(&mut self, pointer: PointerEvent, ctx: InputContext<'_>) -> InputOutcome {
        match pointer.kind {
            PointerKind::Mouse => {
                self.pending_click = true;
                InputOutcome::Ignored
            }
            PointerKind::Touch => {
                let double = self
                    .last_tap
                    .map_or(false, |last| pointer.time - last <= self.config.double_tap_window);
                if double {
                    self.last_tap = None;
                    if self.kick(ctx.world, ctx.bodies) {
                        return InputOutcome::Kicked;
                    }
                    InputOutcome::Ignored
                } else {
                    self.last_tap = Some(pointer.time);
                    InputOutcome::Ignored
                }
            }
        }
    }

    fn pointer_move(&mut self, pointer: PointerEvent, ctx: InputContext<'_>) -> InputOutcome {
        let Some((x, y)) = pointer.position else {
            return InputOutcome::Ignored;
        };
        let Some(drag) = self.drag.as_mut() else {
            return InputOutcome::Ignored;
        };
        let (nx, ny) = ctx.viewport.to_ndc(x, y);
        let ray = ctx.camera.ray_from_ndc(nx, ny);
        let Some(target) = ray_plane(&ray, &drag.plane_point, &drag.plane_normal) else {
            return InputOutcome::Ignored;
        };
        ctx.world.set_kinematic_target(drag.anchor, target);
        drag.history.push(target, pointer.time);
        InputOutcome::Dragged(drag.ball_index)
    }

    fn pointer_up(&mut self, ctx: InputContext<'_>) -> InputOutcome {
        let Some(drag) = self.drag.take() else {
            if std::mem::take(&mut self.pending_click) && self.kick(ctx.world, ctx.bodies) {
                return InputOutcome::Kicked;
            }
            return InputOutcome::Ignored;
        };
        drag.release(ctx.world);

        let mass = ctx.world.rigid_body(drag.ball).map_or(0.0, |b| b.mass());
        let impulse = release_impulse(&drag.history, mass, self.config.release_scale);
        if let Some(impulse) = impulse {
            ctx.world.apply_impulse(drag.ball, impulse);
        }
        debug!("released ball {} with impulse {:?}", drag.ball_index, impulse);
        InputOutcome::Released { ball: drag.ball_index, impulse }
    }

    /// Forget an in-progress drag whose world is gone.
    pub fn forget_drag(&mut self) {
        self.drag = None;
        self.pending_click = false;
    }
}
