//! Soft-body rope nodes: point masses with position-based dynamics.

use rapier3d::prelude::{Point, Real, Vector};

/// One point mass of a rope.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub position: Point<Real>,
    pub previous_position: Point<Real>,
    pub velocity: Vector<Real>,
    /// 0 marks the node as immovable.
    pub inverse_mass: Real,
}

impl Node {
    pub fn new(position: Point<Real>, mass: Real) -> Self {
        Node {
            position,
            previous_position: position,
            velocity: Vector::zeros(),
            inverse_mass: inverse_of(mass),
        }
    }

    pub fn fixed(position: Point<Real>) -> Self {
        Node {
            position,
            previous_position: position,
            velocity: Vector::zeros(),
            inverse_mass: 0.0,
        }
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Move to `position` without introducing velocity.
    pub fn reset_to(&mut self, position: Point<Real>) {
        self.position = position;
        self.previous_position = position;
        self.velocity = Vector::zeros();
    }

    pub fn apply_acceleration(&mut self, accel: Vector<Real>, dt: Real) {
        if !self.is_fixed() {
            self.velocity += accel * dt;
        }
    }

    /// Predict the next position, clamping travel to `max_displacement`.
    pub fn predict(&mut self, dt: Real, max_displacement: Real) {
        self.previous_position = self.position;
        if self.is_fixed() {
            return;
        }
        let mut step = self.velocity * dt;
        let len = step.norm();
        if len > max_displacement {
            step *= max_displacement / len;
        }
        self.position += step;
    }

    /// Derive velocity from the corrected position.
    pub fn update_velocity(&mut self, dt: Real) {
        if self.is_fixed() || dt <= 1e-30 {
            self.velocity = Vector::zeros();
            return;
        }
        self.velocity = (self.position - self.previous_position) / dt;
    }

    pub fn displacement(&self) -> Vector<Real> {
        self.position - self.previous_position
    }
}

pub(crate) fn inverse_of(mass: Real) -> Real {
    if mass.abs() < 1e-10 {
        0.0
    } else {
        1.0 / mass
    }
}
