//! Rope constraints: links between nodes and anchors onto rigid bodies.

use rapier3d::prelude::{Point, Real, RigidBodyHandle};

use crate::node::Node;

/// Distance constraint between two nodes of the same rope.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    pub rest_length: Real,
}

impl Link {
    pub fn new(a: usize, b: usize, rest_length: Real) -> Self {
        Link { a, b, rest_length }
    }

    pub fn from_nodes(a: usize, b: usize, nodes: &[Node]) -> Self {
        let rest_length = (nodes[b].position - nodes[a].position).norm();
        Link { a, b, rest_length }
    }

    /// Project both nodes toward the rest length, weighted by inverse mass.
    pub fn solve(&self, nodes: &mut [Node], stiffness: Real) {
        let a_inv = nodes[self.a].inverse_mass;
        let b_inv = nodes[self.b].inverse_mass;
        let w_total = a_inv + b_inv;
        if w_total < 1e-10 {
            return; // both fixed
        }

        let delta = nodes[self.b].position - nodes[self.a].position;
        let dist = delta.norm();
        if dist < 1e-10 {
            return;
        }

        let error = dist - self.rest_length;
        let correction = delta * (error * stiffness / dist);

        nodes[self.a].position += correction * (a_inv / w_total);
        nodes[self.b].position -= correction * (b_inv / w_total);
    }
}

/// Binds one node to a point fixed in a rigid body's frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub node: usize,
    pub body: RigidBodyHandle,
    /// Attachment point in the body's local frame.
    pub local_point: Point<Real>,
    /// 1.0 snaps the node fully onto the attachment point each iteration.
    pub influence: Real,
    /// Skip node-vs-body contacts for this pair.
    pub disable_collision: bool,
}
