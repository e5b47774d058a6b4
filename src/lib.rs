//! Newton's cradle: physics-to-visual orchestration.
//!
//! `cradle` builds a row of pendulum balls hung from a static frame, steps
//! them with a rigid-body engine, and copies the result onto a renderable
//! scene every frame. Strings are soft-body ropes when the physics module
//! supports them and rigid capsule chains otherwise.
//!
//! # Features
//!
//! - **Capability negotiation**: probed once at startup into
//!   [`Capability::FullSoftBody`] or [`Capability::RigidOnly`]
//! - **Arena world**: every body, constraint and rope is released with its
//!   [`SimulationWorld`]
//! - **Soft-body ropes**: position-based nodes anchored to rigid bodies
//! - **Divergence containment**: non-finite rope nodes never reach the scene
//! - **Interaction**: drag-and-throw, kick-off gesture, settings toggle
//! - **Observable**: monitor ticks via the `StepObserver` trait
//!
//! # Example
//! ```
//! use cradle::{Cradle, CradleConfig, NoOpStepObserver, PhysicsModule};
//!
//! let mut cradle = Cradle::new(PhysicsModule::load(), CradleConfig::new()).unwrap();
//! cradle.kick();
//! for _ in 0..10 {
//!     cradle.tick(1.0 / 60.0, &mut NoOpStepObserver);
//! }
//! assert!(cradle.ball_position(0).is_some());
//! ```

pub mod config;
pub mod error;
pub mod module;
pub mod world;
pub mod node;
pub mod constraint;
pub mod softbody;
pub mod solver;
pub mod scene;
pub mod bodies;
pub mod chain;
pub mod strings;
pub mod stepper;
pub mod camera;
pub mod input;
pub mod observer;
pub mod app;

// Re-export primary API
pub use app::{Cradle, NullRenderer, Renderer};
pub use bodies::{BodyBuilder, CradleBodies};
pub use camera::{Camera, Viewport};
pub use chain::RigidChain;
pub use config::CradleConfig;
pub use constraint::{Anchor, Link};
pub use error::{CradleError, Result};
pub use input::{DragConstraint, DragHistory, InputController, InputEvent, InputOutcome, Key};
pub use module::{Capability, EngineFeatures, PhysicsModule};
pub use node::Node;
pub use observer::{NoOpStepObserver, StepObserver};
pub use scene::{build_scene, Layout, Mesh, VisualCradle};
pub use softbody::{SoftBodyConfig, SoftBodyHelpers, SoftBodyRope, SoftMaterial};
pub use solver::{SoftBodyHandle, SoftBodySolver};
pub use stepper::Stepper;
pub use strings::{sanitize_polyline, StringManager, StringState, WarnLimiter};
pub use world::{create_world, SimulationWorld, TeardownReport, WorldInfo};
