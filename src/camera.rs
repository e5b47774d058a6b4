//! Perspective camera, viewport and pointer-to-ray mapping.

use rapier3d::na::{Isometry3, Perspective3, Point3};
use rapier3d::prelude::{point, vector, Point, Ray, Real, Vector};

use crate::config::VisualConfig;

/// Canvas size in client pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub width: Real,
    pub height: Real,
}

impl Viewport {
    pub fn new(width: Real, height: Real) -> Self {
        Viewport { width: width.max(1.0), height: height.max(1.0) }
    }

    pub fn aspect(&self) -> Real {
        self.width / self.height
    }

    /// Client pixels (origin top-left, y down) to normalized device
    /// coordinates (origin centre, y up, range [-1, 1]).
    pub fn to_ndc(&self, x: Real, y: Real) -> (Real, Real) {
        (2.0 * x / self.width - 1.0, 1.0 - 2.0 * y / self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1280.0, 720.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point<Real>,
    pub target: Point<Real>,
    pub up: Vector<Real>,
    /// Vertical field of view in radians.
    pub fov_y: Real,
    pub aspect: Real,
    pub near: Real,
    pub far: Real,
}

impl Camera {
    pub fn from_config(visual: &VisualConfig, aspect: Real) -> Self {
        let p = visual.camera_position;
        let t = visual.camera_target;
        Camera {
            position: point![p[0], p[1], p[2]],
            target: point![t[0], t[1], t[2]],
            up: vector![0.0, 1.0, 0.0],
            fov_y: visual.camera_fov_degrees.to_radians(),
            aspect,
            near: visual.camera_near,
            far: visual.camera_far,
        }
    }

    pub fn set_aspect(&mut self, aspect: Real) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vector<Real> {
        let dir = self.target - self.position;
        let len = dir.norm();
        if len > 0.0 {
            dir / len
        } else {
            vector![0.0, 0.0, -1.0]
        }
    }

    /// World-to-camera transform.
    pub fn view(&self) -> Isometry3<Real> {
        Isometry3::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection(&self) -> Perspective3<Real> {
        Perspective3::new(self.aspect, self.fov_y, self.near, self.far)
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, x: Real, y: Real) -> Ray {
        let projection = self.projection();
        let camera_to_world = self.view().inverse();
        let near = camera_to_world * projection.unproject_point(&Point3::new(x, y, -1.0));
        let far = camera_to_world * projection.unproject_point(&Point3::new(x, y, 1.0));
        let dir = far - near;
        let len = dir.norm();
        let dir = if len > 0.0 { dir / len } else { self.forward() };
        Ray::new(near, dir)
    }
}
