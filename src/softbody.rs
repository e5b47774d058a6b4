//! Soft-body ropes: nodes, links, material and configuration scalars.
//!
//! A [`SoftBodyRope`] is constructed by [`SoftBodyHelpers::create_rope`],
//! configured node by node, then handed to the world. Stepping lives in
//! [`crate::solver`].

use rapier3d::prelude::{Point, Real, Vector};

use crate::config::SoftBodyMaterialConfig;
use crate::constraint::{Anchor, Link};
use crate::node::Node;

/// Stiffness coefficients, each in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SoftMaterial {
    pub linear_stiffness: Real,
    pub angular_stiffness: Real,
    /// Carried for closed bodies; a rope has no volume.
    pub volume_stiffness: Real,
}

impl Default for SoftMaterial {
    fn default() -> Self {
        SoftMaterial { linear_stiffness: 1.0, angular_stiffness: 1.0, volume_stiffness: 1.0 }
    }
}

/// Per-rope simulation scalars.
///
/// `pressure`, `volume_conservation`, `pose_matching`,
/// `soft_contact_hardness` and `max_volume` only matter for closed bodies
/// and soft-soft contacts. Ropes keep them so tuning round-trips.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SoftBodyConfig {
    pub damping: Real,
    pub drag: Real,
    pub lift: Real,
    pub pressure: Real,
    pub volume_conservation: Real,
    pub dynamic_friction: Real,
    pub pose_matching: Real,
    pub rigid_contact_hardness: Real,
    pub kinetic_contact_hardness: Real,
    pub soft_contact_hardness: Real,
    pub max_volume: Real,
    pub position_iterations: usize,
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        SoftBodyConfig {
            damping: 0.0,
            drag: 0.0,
            lift: 0.0,
            pressure: 0.0,
            volume_conservation: 0.0,
            dynamic_friction: 0.2,
            pose_matching: 0.0,
            rigid_contact_hardness: 1.0,
            kinetic_contact_hardness: 0.1,
            soft_contact_hardness: 1.0,
            max_volume: 1.0,
            position_iterations: 1,
        }
    }
}

impl SoftMaterial {
    pub fn from_config(config: &SoftBodyMaterialConfig) -> Self {
        SoftMaterial {
            linear_stiffness: config.linear_stiffness,
            angular_stiffness: config.angular_stiffness,
            volume_stiffness: config.volume_stiffness,
        }
    }
}

impl SoftBodyConfig {
    pub fn from_config(config: &SoftBodyMaterialConfig) -> Self {
        SoftBodyConfig {
            damping: config.damping,
            drag: config.drag,
            lift: config.lift,
            pressure: config.pressure,
            volume_conservation: config.volume_conservation,
            dynamic_friction: config.dynamic_friction,
            pose_matching: config.pose_matching,
            rigid_contact_hardness: config.rigid_contact_hardness,
            kinetic_contact_hardness: config.kinetic_contact_hardness,
            soft_contact_hardness: config.soft_contact_hardness,
            max_volume: config.max_volume,
            position_iterations: config.position_iterations.max(1),
        }
    }
}

/// A flexible string of nodes joined by links.
#[derive(Clone, Debug)]
pub struct SoftBodyRope {
    nodes: Vec<Node>,
    links: Vec<Link>,
    bending: Vec<Link>,
    anchors: Vec<Anchor>,
    pub material: SoftMaterial,
    pub config: SoftBodyConfig,
}

impl SoftBodyRope {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Current position of `index`, if it exists.
    pub fn node_position(&self, index: usize) -> Option<Point<Real>> {
        self.nodes.get(index).map(|n| n.position)
    }

    pub fn set_node_position(&mut self, index: usize, position: Point<Real>) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_node_previous_position(&mut self, index: usize, position: Point<Real>) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.previous_position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_node_velocity(&mut self, index: usize, velocity: Vector<Real>) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.velocity = velocity;
                true
            }
            None => false,
        }
    }

    pub fn set_node_inverse_mass(&mut self, index: usize, inverse_mass: Real) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.inverse_mass = inverse_mass.max(0.0);
                true
            }
            None => false,
        }
    }

    /// Recompute link and bending rest lengths from the current positions.
    pub fn reset_rest_lengths(&mut self) {
        for link in self.links.iter_mut().chain(self.bending.iter_mut()) {
            link.rest_length = (self.nodes[link.b].position - self.nodes[link.a].position).norm();
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub(crate) fn push_anchor(&mut self, anchor: Anchor) {
        self.anchors.push(anchor);
    }

    pub fn rest_length(&self) -> Real {
        self.links.iter().map(|l| l.rest_length).sum()
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut [Node], &[Link], &[Link], &[Anchor], &SoftMaterial, &SoftBodyConfig) {
        (
            &mut self.nodes,
            &self.links,
            &self.bending,
            &self.anchors,
            &self.material,
            &self.config,
        )
    }
}

/// Rope construction helpers.
pub struct SoftBodyHelpers;

impl SoftBodyHelpers {
    /// Build a straight rope of `segments` links (`segments + 1` nodes)
    /// from `from` to `to`. Every node starts with unit mass; `fixed_start`
    /// and `fixed_end` zero the inverse mass of the corresponding end.
    pub fn create_rope(
        from: Point<Real>,
        to: Point<Real>,
        segments: usize,
        fixed_start: bool,
        fixed_end: bool,
    ) -> SoftBodyRope {
        let segments = segments.max(1);
        let count = segments + 1;
        let mut nodes = Vec::with_capacity(count);
        for i in 0..count {
            let t = i as Real / segments as Real;
            nodes.push(Node::new(from + (to - from) * t, 1.0));
        }
        if fixed_start {
            nodes[0].inverse_mass = 0.0;
        }
        if fixed_end {
            nodes[count - 1].inverse_mass = 0.0;
        }

        let links = (0..segments).map(|i| Link::from_nodes(i, i + 1, &nodes)).collect();
        let bending = (0..count.saturating_sub(2))
            .map(|i| Link::from_nodes(i, i + 2, &nodes))
            .collect();

        SoftBodyRope {
            nodes,
            links,
            bending,
            anchors: Vec::new(),
            material: SoftMaterial::default(),
            config: SoftBodyConfig::default(),
        }
    }
}
