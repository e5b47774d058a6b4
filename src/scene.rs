//! Visual scene: named meshes, lights and the cradle layout.
//!
//! The scene never drives physics. Bodies write into it (transforms,
//! polylines, visibility) and a renderer reads it.

use rapier3d::prelude::{point, vector, Isometry, Point, Real, RigidBodyHandle, Vector};

use crate::config::{CradleConfig, VisualConfig};

/// Positions derived from the configuration. The base top sits at y = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub ball_count: usize,
    pub ball_radius: Real,
    pub spacing: Real,
    pub string_length: Real,
    pub frame_width: Real,
    pub frame_height: Real,
    pub frame_depth: Real,
    pub bar_thickness: Real,
    pub post_thickness: Real,
    pub base_thickness: Real,
    pub floor_size: Real,
}

impl Layout {
    pub fn new(config: &CradleConfig) -> Self {
        Layout {
            ball_count: config.balls.count,
            ball_radius: config.balls.radius,
            spacing: config.balls.spacing,
            string_length: config.string.length,
            frame_width: config.frame.width,
            frame_height: config.frame.height,
            frame_depth: config.frame.depth,
            bar_thickness: config.frame.bar_thickness,
            post_thickness: config.frame.post_thickness,
            base_thickness: config.frame.base_thickness,
            floor_size: config.frame.floor_size,
        }
    }

    /// Balls are centred on x = 0.
    pub fn ball_x(&self, index: usize) -> Real {
        (index as Real - (self.ball_count as Real - 1.0) * 0.5) * self.spacing
    }

    /// Underside of the top bar.
    pub fn bar_bottom(&self) -> Real {
        self.frame_height - self.bar_thickness * 0.5
    }

    /// Where string `index` meets the top bar.
    pub fn string_start(&self, index: usize) -> Point<Real> {
        point![self.ball_x(index), self.bar_bottom(), 0.0]
    }

    /// Rest position of ball `index`.
    pub fn ball_center(&self, index: usize) -> Point<Real> {
        point![
            self.ball_x(index),
            self.bar_bottom() - self.string_length - self.ball_radius,
            0.0
        ]
    }

    pub fn ball_top(&self, index: usize) -> Point<Real> {
        self.ball_center(index) + vector![0.0, self.ball_radius, 0.0]
    }

    pub fn top_bar_center(&self) -> Point<Real> {
        point![0.0, self.frame_height, 0.0]
    }

    pub fn top_bar_half_extents(&self) -> Vector<Real> {
        vector![
            (self.frame_width + self.post_thickness) * 0.5,
            self.bar_thickness * 0.5,
            self.bar_thickness * 0.5
        ]
    }

    /// `side` is -1 for the left post and +1 for the right.
    pub fn post_center(&self, side: Real) -> Point<Real> {
        point![side * self.frame_width * 0.5, self.frame_height * 0.5, 0.0]
    }

    pub fn post_half_extents(&self) -> Vector<Real> {
        vector![
            self.post_thickness * 0.5,
            self.frame_height * 0.5,
            self.post_thickness * 0.5
        ]
    }

    pub fn base_center(&self) -> Point<Real> {
        point![0.0, -self.base_thickness * 0.5, 0.0]
    }

    pub fn base_half_extents(&self) -> Vector<Real> {
        vector![
            self.frame_width * 0.5 + self.post_thickness,
            self.base_thickness * 0.5,
            self.frame_depth * 0.5
        ]
    }

    pub fn floor_y(&self) -> Real {
        -self.base_thickness
    }
}

/// Axis-aligned bounds of a polyline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point<Real>,
    pub max: Point<Real>,
}

impl BoundingBox {
    /// `None` for an empty slice.
    pub fn from_points(points: &[Point<Real>]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = BoundingBox { min: *first, max: *first };
        for p in &points[1..] {
            bounds.min = bounds.min.inf(p);
            bounds.max = bounds.max.sup(p);
        }
        Some(bounds)
    }

    pub fn contains(&self, p: &Point<Real>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

/// Flat xyz position buffer of a line geometry.
///
/// `replace` reallocates, `overwrite` writes in place. Both bump `version`
/// so a renderer knows to re-upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionAttribute {
    data: Vec<f32>,
    version: u32,
    reallocations: u32,
}

impl PositionAttribute {
    pub fn from_points(points: &[Point<Real>]) -> Self {
        let mut attr = PositionAttribute::default();
        attr.replace(flatten(points));
        attr
    }

    pub fn replace(&mut self, data: Vec<f32>) {
        self.data = data;
        self.version = self.version.wrapping_add(1);
        self.reallocations += 1;
    }

    /// Overwrite in place. Returns `false` (and writes nothing) when the
    /// lengths differ.
    pub fn overwrite(&mut self, data: &[f32]) -> bool {
        if data.len() != self.data.len() {
            return false;
        }
        self.data.copy_from_slice(data);
        self.version = self.version.wrapping_add(1);
        true
    }

    /// Write `points`, reallocating only when the point count changed.
    pub fn set_points(&mut self, points: &[Point<Real>]) {
        if points.len() * 3 == self.data.len() {
            for (chunk, p) in self.data.chunks_exact_mut(3).zip(points) {
                chunk.copy_from_slice(&[p.x, p.y, p.z]);
            }
            self.version = self.version.wrapping_add(1);
        } else {
            self.replace(flatten(points));
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn point_count(&self) -> usize {
        self.data.len() / 3
    }

    pub fn point(&self, index: usize) -> Option<Point<Real>> {
        let c = self.data.get(index * 3..index * 3 + 3)?;
        Some(point![c[0], c[1], c[2]])
    }

    pub fn points(&self) -> Vec<Point<Real>> {
        self.data.chunks_exact(3).map(|c| point![c[0], c[1], c[2]]).collect()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }
}

fn flatten(points: &[Point<Real>]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineGeometry {
    pub positions: PositionAttribute,
    pub bounding_box: Option<BoundingBox>,
}

impl LineGeometry {
    pub fn new(points: &[Point<Real>]) -> Self {
        LineGeometry {
            positions: PositionAttribute::from_points(points),
            bounding_box: BoundingBox::from_points(points),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Sphere { radius: Real },
    Cuboid { half_extents: Vector<Real> },
    Polyline(LineGeometry),
    /// Horizontal square of edge `size`.
    Plane { size: Real },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FramePart {
    Top,
    Left,
    Right,
    Base,
}

impl FramePart {
    pub fn name(self) -> &'static str {
        match self {
            FramePart::Top => "frame_top",
            FramePart::Left => "frame_left",
            FramePart::Right => "frame_right",
            FramePart::Base => "frame_base",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Ball(usize),
    Frame(FramePart),
    String(usize),
    Floor,
}

/// One renderable object.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub role: Role,
    pub geometry: Geometry,
    pub material: MaterialDesc,
    pub transform: Isometry<Real>,
    pub visible: bool,
    /// Body driving this mesh, if any.
    pub body: Option<RigidBodyHandle>,
}

impl Mesh {
    pub fn position(&self) -> Point<Real> {
        Point::from(self.transform.translation.vector)
    }

    pub fn line(&self) -> Option<&LineGeometry> {
        match &self.geometry {
            Geometry::Polyline(line) => Some(line),
            _ => None,
        }
    }

    pub fn line_mut(&mut self) -> Option<&mut LineGeometry> {
        match &mut self.geometry {
            Geometry::Polyline(line) => Some(line),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Light {
    Ambient { color: [f32; 3], intensity: f32 },
    Directional { direction: Vector<Real>, intensity: f32 },
}

/// Scene container for the cradle.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualCradle {
    pub layout: Layout,
    meshes: Vec<Mesh>,
    lights: Vec<Light>,
    balls: Vec<usize>,
    frame: Vec<usize>,
    strings: Vec<usize>,
}

impl VisualCradle {
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut Mesh> {
        self.meshes.get_mut(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.meshes.iter().position(|m| m.name == name)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Mesh indices of the balls, in ball order.
    pub fn ball_meshes(&self) -> &[usize] {
        &self.balls
    }

    pub fn frame_meshes(&self) -> &[usize] {
        &self.frame
    }

    pub fn string_meshes(&self) -> &[usize] {
        &self.strings
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn ball(&self, index: usize) -> Option<&Mesh> {
        self.balls.get(index).and_then(|&i| self.meshes.get(i))
    }

    pub fn string(&self, index: usize) -> Option<&Mesh> {
        self.strings.get(index).and_then(|&i| self.meshes.get(i))
    }

    pub fn string_mut(&mut self, index: usize) -> Option<&mut Mesh> {
        let mesh = *self.strings.get(index)?;
        self.meshes.get_mut(mesh)
    }

    fn push(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }
}

fn material(color: [f32; 3], visual: &VisualConfig) -> MaterialDesc {
    MaterialDesc { color, metalness: visual.metalness, roughness: visual.roughness }
}

/// Build every mesh and light for `config`. Bodies are attached later.
pub fn build_scene(config: &CradleConfig) -> VisualCradle {
    let layout = Layout::new(config);
    let visual = &config.visual;
    let mut scene = VisualCradle {
        layout: layout.clone(),
        meshes: Vec::new(),
        lights: Vec::new(),
        balls: Vec::new(),
        frame: Vec::new(),
        strings: Vec::new(),
    };

    let frame_parts = [
        (FramePart::Top, layout.top_bar_center(), layout.top_bar_half_extents()),
        (FramePart::Left, layout.post_center(-1.0), layout.post_half_extents()),
        (FramePart::Right, layout.post_center(1.0), layout.post_half_extents()),
        (FramePart::Base, layout.base_center(), layout.base_half_extents()),
    ];
    for (part, center, half_extents) in frame_parts {
        let index = scene.push(Mesh {
            name: part.name().to_string(),
            role: Role::Frame(part),
            geometry: Geometry::Cuboid { half_extents },
            material: material(visual.frame_color, visual),
            transform: Isometry::translation(center.x, center.y, center.z),
            visible: true,
            body: None,
        });
        scene.frame.push(index);
    }

    for i in 0..layout.ball_count {
        let center = layout.ball_center(i);
        let index = scene.push(Mesh {
            name: format!("ball_{i}"),
            role: Role::Ball(i),
            geometry: Geometry::Sphere { radius: layout.ball_radius },
            material: material(visual.ball_color, visual),
            transform: Isometry::translation(center.x, center.y, center.z),
            visible: true,
            body: None,
        });
        scene.balls.push(index);

        let index = scene.push(Mesh {
            name: format!("string_{i}"),
            role: Role::String(i),
            geometry: Geometry::Polyline(LineGeometry::new(&[
                layout.string_start(i),
                layout.ball_top(i),
            ])),
            material: MaterialDesc { color: visual.string_color, metalness: 0.0, roughness: 1.0 },
            transform: Isometry::identity(),
            visible: true,
            body: None,
        });
        scene.strings.push(index);
    }

    scene.push(Mesh {
        name: "floor".to_string(),
        role: Role::Floor,
        geometry: Geometry::Plane { size: layout.floor_size },
        material: MaterialDesc { color: visual.floor_color, metalness: 0.0, roughness: 0.9 },
        transform: Isometry::translation(0.0, layout.floor_y(), 0.0),
        visible: true,
        body: None,
    });

    let d = visual.light_direction;
    let direction = vector![d[0], d[1], d[2]];
    let norm = direction.norm();
    scene.lights = vec![
        Light::Ambient { color: [1.0, 1.0, 1.0], intensity: visual.ambient_intensity },
        Light::Directional {
            direction: if norm > 0.0 { direction / norm } else { vector![0.0, -1.0, 0.0] },
            intensity: visual.directional_intensity,
        },
    ];
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balls_are_centred_and_hang_below_the_bar() {
        let config = CradleConfig::new().with_ball_count(3).with_ball_spacing(1.2);
        let layout = Layout::new(&config);
        assert!((layout.ball_x(0) + 1.2).abs() < 1e-6);
        assert!(layout.ball_x(1).abs() < 1e-6);
        let gap = layout.string_start(2).y - layout.ball_top(2).y;
        assert!((gap - config.string.length).abs() < 1e-5);
    }

    #[test]
    fn scene_names_every_mesh() {
        let scene = build_scene(&CradleConfig::new().with_ball_count(2));
        for name in ["ball_0", "ball_1", "string_0", "string_1", "frame_top", "frame_left", "frame_right", "frame_base", "floor"] {
            assert!(scene.find(name).is_some(), "missing {name}");
        }
        assert_eq!(scene.frame_meshes().len(), 4);
        assert_eq!(scene.lights().len(), 2);
    }

    #[test]
    fn same_length_points_overwrite_in_place() {
        let mut attr = PositionAttribute::from_points(&[Point::origin(), point![1.0, 0.0, 0.0]]);
        let reallocs = attr.reallocations();
        attr.set_points(&[point![0.0, 1.0, 0.0], point![2.0, 0.0, 0.0]]);
        assert_eq!(attr.reallocations(), reallocs);
        attr.set_points(&[Point::origin(); 3]);
        assert_eq!(attr.reallocations(), reallocs + 1);
        assert_eq!(attr.point_count(), 3);
        assert!(!attr.overwrite(&[0.0; 3]));
    }
}
