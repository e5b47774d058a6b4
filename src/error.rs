//! Error types for cradle construction and configuration.

use rapier3d::prelude::RigidBodyHandle;
use thiserror::Error;

/// Errors that can occur while building or reconfiguring a cradle.
///
/// Nothing on the per-frame path returns these: stepping, syncing and input
/// handling recover locally.
#[derive(Debug, Error)]
pub enum CradleError {
    /// The physics module has not been loaded.
    #[error("physics module is not loaded")]
    EngineUnavailable,
    /// A soft body was requested from a rigid-only world.
    #[error("soft bodies are not supported by the loaded physics module")]
    SoftBodiesUnsupported,
    /// Mass must be positive and finite.
    #[error("{field}: mass must be positive and finite")]
    InvalidMass { field: &'static str },
    /// A length or radius must be positive and finite.
    #[error("{field}: must be positive and finite, got {value}")]
    InvalidLength { field: &'static str, value: f32 },
    /// A coefficient is outside its allowed range.
    #[error("{field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// The cradle needs at least one ball.
    #[error("cradle needs at least one ball")]
    NoBalls,
    /// A string needs at least two segments.
    #[error("string needs at least {min} segments, got {got}")]
    InsufficientSegments { min: usize, got: usize },
    /// A rigid body handle does not belong to the world.
    #[error("unknown rigid body {0:?}")]
    UnknownBody(RigidBodyHandle),
    /// A visual mesh was not found in the scene.
    #[error("missing visual mesh `{0}`")]
    MissingMesh(String),
    /// Configuration could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, CradleError>;
