//! Physics module loading and capability negotiation.
//!
//! The module is probed exactly once, at startup. The resulting
//! [`Capability`] travels with the world so nothing downstream probes again.

use log::info;

/// Soft-body entry points a loaded physics module may expose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineFeatures {
    /// Soft-body constraint solver.
    pub soft_body_solver: bool,
    /// World type that steps soft and rigid bodies together.
    pub soft_rigid_world: bool,
    /// Rope generator helpers.
    pub soft_body_helpers: bool,
    /// Shared world-info block handed to rope construction.
    pub soft_body_world_info: bool,
}

impl EngineFeatures {
    /// Every entry point present.
    pub const ALL: EngineFeatures = EngineFeatures {
        soft_body_solver: true,
        soft_rigid_world: true,
        soft_body_helpers: true,
        soft_body_world_info: true,
    };

    /// Rigid-body dynamics only.
    pub const RIGID_ONLY: EngineFeatures = EngineFeatures {
        soft_body_solver: false,
        soft_rigid_world: false,
        soft_body_helpers: false,
        soft_body_world_info: false,
    };

    /// All four entry points are required; any one missing means no soft bodies.
    pub fn supports_soft_bodies(&self) -> bool {
        self.soft_body_solver
            && self.soft_rigid_world
            && self.soft_body_helpers
            && self.soft_body_world_info
    }
}

/// What the world factory may build.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Soft-body ropes anchored to rigid bodies.
    FullSoftBody,
    /// Rigid bodies and point constraints only; strings become rigid chains.
    RigidOnly,
}

impl Capability {
    pub fn negotiate(features: &EngineFeatures) -> Self {
        if features.supports_soft_bodies() {
            Capability::FullSoftBody
        } else {
            Capability::RigidOnly
        }
    }

    pub fn has_soft_bodies(self) -> bool {
        matches!(self, Capability::FullSoftBody)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ModuleState {
    Unloaded,
    Loaded(EngineFeatures),
}

/// Handle to the physics module.
#[derive(Clone, Debug)]
pub struct PhysicsModule {
    state: ModuleState,
}

impl PhysicsModule {
    /// A module that failed to load, or has not been loaded yet.
    pub fn unloaded() -> Self {
        PhysicsModule { state: ModuleState::Unloaded }
    }

    /// Load the module with every soft-body entry point available.
    pub fn load() -> Self {
        Self::load_with(EngineFeatures::ALL)
    }

    /// Load the module exposing only the given entry points.
    pub fn load_with(features: EngineFeatures) -> Self {
        info!(
            "physics module loaded (soft bodies: {})",
            features.supports_soft_bodies()
        );
        PhysicsModule { state: ModuleState::Loaded(features) }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModuleState::Loaded(_))
    }

    pub fn features(&self) -> Option<EngineFeatures> {
        match self.state {
            ModuleState::Loaded(features) => Some(features),
            ModuleState::Unloaded => None,
        }
    }

    /// Negotiated capability, or `None` while unloaded.
    pub fn capability(&self) -> Option<Capability> {
        self.features().map(|f| Capability::negotiate(&f))
    }
}
