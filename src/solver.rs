//! Position-based solver stepping every soft-body rope in a world.

use std::collections::BTreeMap;

use rapier3d::prelude::{ColliderSet, Point, Real, RigidBodyHandle, RigidBodySet, Vector};

use crate::constraint::Anchor;
use crate::node::{inverse_of, Node};
use crate::softbody::{SoftBodyConfig, SoftBodyRope};
use crate::world::WorldInfo;

/// Handle to a rope owned by a [`SoftBodySolver`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoftBodyHandle(pub u32);

/// Owns live ropes and advances them against the rigid-body set.
#[derive(Debug, Default)]
pub struct SoftBodySolver {
    ropes: BTreeMap<SoftBodyHandle, SoftBodyRope>,
    next_id: u32,
}

impl SoftBodySolver {
    pub fn new() -> Self {
        SoftBodySolver { ropes: BTreeMap::new(), next_id: 0 }
    }

    pub fn insert(&mut self, rope: SoftBodyRope) -> SoftBodyHandle {
        let handle = SoftBodyHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.ropes.insert(handle, rope);
        handle
    }

    pub fn remove(&mut self, handle: SoftBodyHandle) -> Option<SoftBodyRope> {
        self.ropes.remove(&handle)
    }

    pub fn get(&self, handle: SoftBodyHandle) -> Option<&SoftBodyRope> {
        self.ropes.get(&handle)
    }

    pub fn get_mut(&mut self, handle: SoftBodyHandle) -> Option<&mut SoftBodyRope> {
        self.ropes.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.ropes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ropes.is_empty()
    }

    /// Remove every rope, returning how many were live.
    pub fn clear(&mut self) -> usize {
        let count = self.ropes.len();
        self.ropes.clear();
        count
    }

    /// Advance every rope by one internal step of `dt`.
    ///
    /// Anchors pull dynamic bodies through velocity impulses, applied after
    /// all ropes are solved. Bodies hanging from a pinned rope are then
    /// held within the rope's rest length of its root.
    pub fn step(
        &mut self,
        dt: Real,
        info: &WorldInfo,
        bodies: &mut RigidBodySet,
        colliders: &ColliderSet,
    ) {
        if dt <= 0.0 {
            return;
        }
        let mut shifts: Vec<(RigidBodyHandle, Vector<Real>)> = Vec::new();
        let mut tethers: Vec<Tether> = Vec::new();

        for rope in self.ropes.values_mut() {
            let (nodes, links, bending, anchors, material, config) = rope.parts_mut();

            // 1. External forces and prediction
            for i in 0..nodes.len() {
                if nodes[i].is_fixed() {
                    continue;
                }
                let tangent = tangent_at(nodes, i);
                nodes[i].apply_acceleration(info.gravity, dt);
                apply_aero(&mut nodes[i], tangent, config, info, dt);
                nodes[i].velocity *= (1.0 - config.damping).clamp(0.0, 1.0);
                nodes[i].predict(dt, info.max_displacement);
            }

            // 2. Constraint projection
            for _ in 0..config.position_iterations {
                for link in links {
                    link.solve(nodes, material.linear_stiffness);
                }
                if material.angular_stiffness > 0.0 {
                    for link in bending {
                        link.solve(nodes, material.angular_stiffness);
                    }
                }
                for anchor in anchors {
                    solve_anchor(anchor, nodes, bodies, &mut shifts);
                }
            }
            resolve_contacts(nodes, anchors, config, bodies, colliders);

            // 3. Velocities from corrected positions
            for node in nodes.iter_mut() {
                node.update_velocity(dt);
            }

            // 4. A rope hung from a pinned node cannot stretch past its rest length
            let Some(root) = nodes.first().filter(|n| n.is_fixed()).map(|n| n.position) else {
                continue;
            };
            for anchor in anchors.iter().filter(|a| a.node > 0) {
                let reach: Real = links
                    .iter()
                    .filter(|l| l.b <= anchor.node)
                    .map(|l| l.rest_length)
                    .sum();
                tethers.push(Tether {
                    body: anchor.body,
                    local_point: anchor.local_point,
                    root,
                    reach,
                });
            }
        }

        for (handle, shift) in shifts {
            if let Some(body) = bodies.get_mut(handle) {
                if body.is_dynamic() && shift.iter().all(|c| c.is_finite()) {
                    let impulse = shift * (body.mass() / dt);
                    body.apply_impulse(impulse, true);
                }
            }
        }
        for tether in &tethers {
            tether.apply(bodies);
        }
    }
}

/// Upper bound on the distance from a rope's pinned root to the body point
/// the rope holds.
struct Tether {
    body: RigidBodyHandle,
    local_point: Point<Real>,
    root: Point<Real>,
    reach: Real,
}

impl Tether {
    /// Pull the body back onto the reach sphere and drop its outward
    /// velocity. Tangential motion is untouched.
    fn apply(&self, bodies: &mut RigidBodySet) {
        let Some(body) = bodies.get_mut(self.body) else {
            return;
        };
        if !body.is_dynamic() {
            return;
        }
        let offset = body.position() * self.local_point - self.root;
        let dist = offset.norm();
        if !dist.is_finite() || dist <= self.reach {
            return;
        }
        let dir = offset / dist;
        let mut pose = *body.position();
        pose.translation.vector -= dir * (dist - self.reach);
        body.set_position(pose, true);

        let velocity = *body.linvel();
        let outward = velocity.dot(&dir);
        if outward > 0.0 {
            body.set_linvel(velocity - dir * outward, true);
        }
    }
}

fn tangent_at(nodes: &[Node], i: usize) -> Vector<Real> {
    let prev = if i > 0 { i - 1 } else { i };
    let next = if i + 1 < nodes.len() { i + 1 } else { i };
    let t = nodes[next].position - nodes[prev].position;
    let len = t.norm();
    if len < 1e-10 {
        Vector::zeros()
    } else {
        t / len
    }
}

/// Drag opposes motion across the rope; lift pushes perpendicular to it.
fn apply_aero(
    node: &mut Node,
    tangent: Vector<Real>,
    config: &SoftBodyConfig,
    info: &WorldInfo,
    dt: Real,
) {
    if config.drag <= 0.0 && config.lift <= 0.0 {
        return;
    }
    let v = node.velocity;
    let normal_v = v - tangent * tangent.dot(&v);
    let speed = normal_v.norm();
    if speed < 1e-6 {
        return;
    }
    let k = 0.5 * info.air_density * speed * node.inverse_mass * dt;
    let drag = (config.drag * k).min(1.0);
    node.velocity -= normal_v * drag;
    if config.lift > 0.0 {
        let side = tangent.cross(&normal_v);
        let side_len = side.norm();
        if side_len > 1e-10 {
            node.velocity += side * (config.lift * k * speed / side_len);
        }
    }
}

fn solve_anchor(
    anchor: &Anchor,
    nodes: &mut [Node],
    bodies: &RigidBodySet,
    shifts: &mut Vec<(RigidBodyHandle, Vector<Real>)>,
) {
    let Some(body) = bodies.get(anchor.body) else {
        return;
    };
    let Some(node) = nodes.get_mut(anchor.node) else {
        return;
    };
    let slot = shifts.iter().position(|(h, _)| *h == anchor.body);
    let shift = slot.map_or_else(Vector::zeros, |i| shifts[i].1);
    let target = body.position() * anchor.local_point + shift;
    let delta = target - node.position;

    let w_body = if body.is_dynamic() { inverse_of(body.mass()) } else { 0.0 };
    let w_node = node.inverse_mass;
    let w_total = w_node + w_body;
    if w_total < 1e-10 {
        // Fixed node on an immovable body follows it kinematically.
        node.position += delta * anchor.influence;
        return;
    }

    node.position += delta * (anchor.influence * w_node / w_total);
    if w_body > 0.0 {
        let push = delta * (anchor.influence * w_body / w_total);
        match slot {
            Some(i) => shifts[i].1 -= push,
            None => shifts.push((anchor.body, -push)),
        }
    }
}

fn resolve_contacts(
    nodes: &mut [Node],
    anchors: &[Anchor],
    config: &SoftBodyConfig,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
) {
    for (_, collider) in colliders.iter() {
        let Some(ball) = collider.shape().as_ball() else {
            continue;
        };
        let Some(parent) = collider.parent() else {
            continue;
        };
        let Some(body) = bodies.get(parent) else {
            continue;
        };
        let hardness = if body.is_dynamic() {
            config.rigid_contact_hardness
        } else {
            config.kinetic_contact_hardness
        };
        let center = collider.translation();

        for (i, node) in nodes.iter_mut().enumerate() {
            if node.is_fixed() {
                continue;
            }
            let excluded = anchors
                .iter()
                .any(|a| a.node == i && a.body == parent && a.disable_collision);
            if excluded {
                continue;
            }
            let offset = node.position.coords - center;
            let dist = offset.norm();
            if dist >= ball.radius || dist < 1e-8 {
                continue;
            }
            let normal = offset / dist;
            node.position += normal * ((ball.radius - dist) * hardness);

            let moved = node.displacement();
            let tangential = moved - normal * moved.dot(&normal);
            node.position -= tangential * config.dynamic_friction;
        }
    }
}
