//! Configuration records for the cradle.
//!
//! Every record is a plain nested key/value structure. All fields have
//! defaults, so a settings panel can send partial JSON and the rest is
//! filled in.

use serde::{Deserialize, Serialize};

use crate::error::{CradleError, Result};

/// Full cradle configuration.
///
/// # Builder Pattern
/// ```
/// use cradle::config::CradleConfig;
///
/// let config = CradleConfig::new()
///     .with_ball_count(5)
///     .with_ball_spacing(1.2)
///     .with_rope_length(3.0)
///     .with_rope_segments(10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CradleConfig {
    pub balls: BallConfig,
    pub string: StringConfig,
    pub chain: ChainConfig,
    pub frame: FrameConfig,
    pub soft_body: SoftBodyMaterialConfig,
    pub world: WorldConfig,
    pub input: InputConfig,
    pub visual: VisualConfig,
}

/// Ball layout and per-ball rigid-body parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// Number of balls. Default: 5.
    pub count: usize,
    /// Sphere radius. Default: 0.5.
    pub radius: f32,
    /// Centre-to-centre distance between neighbouring balls. Default: 1.02.
    pub spacing: f32,
    /// Mass of each ball. Default: 1.0.
    pub mass: f32,
    pub friction: f32,
    /// Near 1.0 so momentum passes through the row. Default: 0.98.
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for BallConfig {
    fn default() -> Self {
        BallConfig {
            count: 5,
            radius: 0.5,
            spacing: 1.02,
            mass: 1.0,
            friction: 0.0,
            restitution: 0.98,
            linear_damping: 0.0,
            angular_damping: 0.05,
        }
    }
}

/// String geometry shared by soft ropes and rigid chains.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringConfig {
    /// Distance from the underside of the top bar to the top of the ball.
    pub length: f32,
    /// Number of links (soft rope) or capsules (rigid chain). Default: 10.
    pub segments: usize,
    /// Soft-rope mass as a fraction of one ball's mass, spread evenly over
    /// every node but the pinned frame end. Default: 0.05.
    pub mass_fraction: f32,
    /// Seconds of simulated time between divergence warnings for one string.
    pub warn_cooldown: f32,
    pub anchor: AnchorConfig,
}

impl Default for StringConfig {
    fn default() -> Self {
        StringConfig {
            length: 3.0,
            segments: 10,
            mass_fraction: 0.05,
            warn_cooldown: 1.0,
            anchor: AnchorConfig::default(),
        }
    }
}

/// How soft-rope end nodes bind to the frame and ball bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Skip contacts between an anchored node and its target body.
    pub disable_collision: bool,
    /// Blend weight of the anchor, 1.0 = rigid.
    pub influence: f32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig { disable_collision: true, influence: 1.0 }
    }
}

/// Rigid-chain strings used when the engine has no soft bodies.
///
/// The joint softness is world-wide: it applies to every point constraint,
/// including the drag anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub segment_radius: f32,
    pub segment_mass: f32,
    /// Point-constraint target stiffness, as a natural frequency.
    pub joint_natural_frequency: f32,
    /// Point-constraint damping ratio.
    pub joint_damping_ratio: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            segment_radius: 0.02,
            segment_mass: 0.1,
            joint_natural_frequency: 1.0e6,
            joint_damping_ratio: 1.0,
        }
    }
}

/// Static frame dimensions. The base top sits at y = 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Distance between the two posts.
    pub width: f32,
    /// Height of the top bar centre above the base.
    pub height: f32,
    pub depth: f32,
    pub bar_thickness: f32,
    pub post_thickness: f32,
    pub base_thickness: f32,
    /// Edge length of the square floor under the frame.
    pub floor_size: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            width: 8.0,
            height: 5.0,
            depth: 2.0,
            bar_thickness: 0.2,
            post_thickness: 0.2,
            base_thickness: 0.2,
            floor_size: 30.0,
        }
    }
}

/// Soft-rope material and configuration scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftBodyMaterialConfig {
    pub linear_stiffness: f32,
    pub angular_stiffness: f32,
    pub volume_stiffness: f32,
    pub damping: f32,
    pub drag: f32,
    pub lift: f32,
    pub pressure: f32,
    pub volume_conservation: f32,
    pub dynamic_friction: f32,
    pub pose_matching: f32,
    pub rigid_contact_hardness: f32,
    pub kinetic_contact_hardness: f32,
    pub soft_contact_hardness: f32,
    pub max_volume: f32,
    pub position_iterations: usize,
}

impl Default for SoftBodyMaterialConfig {
    fn default() -> Self {
        SoftBodyMaterialConfig {
            linear_stiffness: 1.0,
            angular_stiffness: 0.1,
            volume_stiffness: 1.0,
            damping: 0.01,
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
            position_iterations: 8,
        }
    }
}

/// World and stepping parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Downward gravity magnitude. Default: 9.81.
    pub gravity: f32,
    /// Largest real frame delta handed to the world. Default: 0.2s.
    pub max_delta: f32,
    pub max_sub_steps: u32,
    pub fixed_time_step: f32,
    pub solver_iterations: usize,
    pub air_density: f32,
    /// Largest distance a rope node may travel in one internal step.
    pub max_displacement: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            gravity: 9.81,
            max_delta: 0.2,
            max_sub_steps: 10,
            fixed_time_step: 1.0 / 120.0,
            solver_iterations: 8,
            air_density: 1.2,
            max_displacement: 0.5,
        }
    }
}

/// Pointer, touch and keyboard interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Drag samples kept for release-velocity estimation. Default: 5.
    pub drag_history: usize,
    /// Multiplier on the estimated release momentum.
    pub release_scale: f32,
    /// Impulse applied to the first ball by the kick-off gesture.
    pub kick_impulse: [f32; 3],
    /// Two taps closer than this many seconds form a double tap.
    pub double_tap_window: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            drag_history: 5,
            release_scale: 1.0,
            kick_impulse: [-10.0, 0.0, 0.0],
            double_tap_window: 0.3,
        }
    }
}

/// Materials, lights and camera for the visual scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub ball_color: [f32; 3],
    pub frame_color: [f32; 3],
    pub string_color: [f32; 3],
    pub floor_color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub light_direction: [f32; 3],
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub camera_fov_degrees: f32,
    pub camera_near: f32,
    pub camera_far: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        VisualConfig {
            ball_color: [0.8, 0.8, 0.85],
            frame_color: [0.25, 0.2, 0.15],
            string_color: [0.9, 0.9, 0.9],
            floor_color: [0.12, 0.12, 0.14],
            metalness: 0.9,
            roughness: 0.2,
            ambient_intensity: 0.4,
            directional_intensity: 1.0,
            light_direction: [-0.5, -1.0, -0.3],
            camera_position: [0.0, 3.0, 12.0],
            camera_target: [0.0, 2.0, 0.0],
            camera_fov_degrees: 45.0,
            camera_near: 0.1,
            camera_far: 100.0,
        }
    }
}

impl CradleConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_ball_count(mut self, count: usize) -> Self {
        self.balls.count = count;
        self
    }

    pub fn with_ball_spacing(mut self, spacing: f32) -> Self {
        self.balls.spacing = spacing;
        self
    }

    pub fn with_ball_radius(mut self, radius: f32) -> Self {
        self.balls.radius = radius;
        self
    }

    pub fn with_ball_mass(mut self, mass: f32) -> Self {
        self.balls.mass = mass;
        self
    }

    pub fn with_rope_length(mut self, length: f32) -> Self {
        self.string.length = length;
        self
    }

    pub fn with_rope_segments(mut self, segments: usize) -> Self {
        self.string.segments = segments;
        self
    }

    pub fn with_rope_mass_fraction(mut self, fraction: f32) -> Self {
        self.string.mass_fraction = fraction;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.world.gravity = gravity;
        self
    }

    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.world.max_delta = max_delta;
        self
    }

    pub fn with_kick_impulse(mut self, impulse: [f32; 3]) -> Self {
        self.input.kick_impulse = impulse;
        self
    }

    /// Check every field a rebuild depends on.
    pub fn validate(&self) -> Result<()> {
        let b = &self.balls;
        if b.count == 0 {
            return Err(CradleError::NoBalls);
        }
        positive("balls.radius", b.radius)?;
        positive("balls.spacing", b.spacing)?;
        if !(b.mass.is_finite() && b.mass > 0.0) {
            return Err(CradleError::InvalidMass { field: "balls.mass" });
        }
        unit_range("balls.restitution", b.restitution)?;
        non_negative("balls.friction", b.friction)?;
        unit_range("balls.linear_damping", b.linear_damping)?;
        unit_range("balls.angular_damping", b.angular_damping)?;

        positive("string.length", self.string.length)?;
        if self.string.segments < 2 {
            return Err(CradleError::InsufficientSegments { min: 2, got: self.string.segments });
        }
        positive("string.mass_fraction", self.string.mass_fraction)?;
        unit_range("string.mass_fraction", self.string.mass_fraction)?;
        non_negative("string.warn_cooldown", self.string.warn_cooldown)?;
        unit_range("string.anchor.influence", self.string.anchor.influence)?;

        positive("chain.segment_radius", self.chain.segment_radius)?;
        if !(self.chain.segment_mass.is_finite() && self.chain.segment_mass > 0.0) {
            return Err(CradleError::InvalidMass { field: "chain.segment_mass" });
        }
        positive("chain.joint_natural_frequency", self.chain.joint_natural_frequency)?;
        non_negative("chain.joint_damping_ratio", self.chain.joint_damping_ratio)?;

        let f = &self.frame;
        positive("frame.width", f.width)?;
        positive("frame.height", f.height)?;
        positive("frame.depth", f.depth)?;
        positive("frame.bar_thickness", f.bar_thickness)?;
        positive("frame.post_thickness", f.post_thickness)?;
        positive("frame.base_thickness", f.base_thickness)?;
        positive("frame.floor_size", f.floor_size)?;
        let half_span = (b.count as f32 - 1.0) * 0.5 * b.spacing + b.radius;
        let inner = f.width * 0.5 - f.post_thickness * 0.5;
        if half_span >= inner {
            return Err(CradleError::InvalidLength { field: "frame.width", value: f.width });
        }
        let ball_bottom = f.height - f.bar_thickness * 0.5 - self.string.length - 2.0 * b.radius;
        if ball_bottom <= 0.0 {
            return Err(CradleError::InvalidLength { field: "frame.height", value: f.height });
        }

        let s = &self.soft_body;
        unit_range("soft_body.linear_stiffness", s.linear_stiffness)?;
        unit_range("soft_body.angular_stiffness", s.angular_stiffness)?;
        unit_range("soft_body.volume_stiffness", s.volume_stiffness)?;
        unit_range("soft_body.damping", s.damping)?;
        unit_range("soft_body.dynamic_friction", s.dynamic_friction)?;
        unit_range("soft_body.pose_matching", s.pose_matching)?;
        unit_range("soft_body.rigid_contact_hardness", s.rigid_contact_hardness)?;
        unit_range("soft_body.kinetic_contact_hardness", s.kinetic_contact_hardness)?;
        unit_range("soft_body.soft_contact_hardness", s.soft_contact_hardness)?;
        non_negative("soft_body.drag", s.drag)?;
        non_negative("soft_body.lift", s.lift)?;

        let w = &self.world;
        non_negative("world.gravity", w.gravity)?;
        positive("world.max_delta", w.max_delta)?;
        positive("world.fixed_time_step", w.fixed_time_step)?;
        positive("world.max_displacement", w.max_displacement)?;
        non_negative("world.air_density", w.air_density)?;
        if w.max_sub_steps == 0 {
            return Err(CradleError::OutOfRange {
                field: "world.max_sub_steps",
                value: 0.0,
                min: 1.0,
                max: f32::MAX,
            });
        }

        if self.input.drag_history < 2 {
            return Err(CradleError::OutOfRange {
                field: "input.drag_history",
                value: self.input.drag_history as f32,
                min: 2.0,
                max: f32::MAX,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CradleError::InvalidLength { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CradleError::OutOfRange { field, value, min: 0.0, max: f32::MAX })
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CradleError::OutOfRange { field, value, min: 0.0, max: 1.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CradleConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = CradleConfig::from_json(r#"{ "balls": { "count": 3 } }"#).unwrap();
        assert_eq!(config.balls.count, 3);
        assert_eq!(config.balls.radius, BallConfig::default().radius);
        assert_eq!(config.string, StringConfig::default());
    }

    #[test]
    fn rejects_single_segment_string() {
        let err = CradleConfig::new().with_rope_segments(1).validate().unwrap_err();
        assert!(matches!(err, CradleError::InsufficientSegments { min: 2, got: 1 }));
    }

    #[test]
    fn rejects_balls_wider_than_frame() {
        let err = CradleConfig::new().with_ball_count(12).validate().unwrap_err();
        assert!(matches!(err, CradleError::InvalidLength { field: "frame.width", .. }));
    }

    #[test]
    fn rope_mass_fraction_must_be_in_unit_range() {
        for bad in [0.0, -0.1, 1.5] {
            let err = CradleConfig::new().with_rope_mass_fraction(bad).validate();
            assert!(err.is_err(), "accepted {bad}");
        }
        assert!(CradleConfig::new().with_rope_mass_fraction(1.0).validate().is_ok());
    }
}
