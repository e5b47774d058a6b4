//! Step observer trait for monitoring simulation ticks.

/// Trait for observing simulation ticks.
///
/// Implement this trait to monitor stepping (e.g., for debugging, tests,
/// or performance profiling). All methods have default no-op
/// implementations.
pub trait StepObserver {
    /// Called after the world advanced by the clamped `delta`, taking
    /// `sub_steps` internal steps.
    fn on_advance(&mut self, _delta: f32, _sub_steps: u32) {}

    /// Called after body transforms were copied onto `count` meshes.
    fn on_bodies_synced(&mut self, _count: usize) {}

    /// Called after string polylines were synced; `visible` strings remain shown.
    fn on_strings_synced(&mut self, _visible: usize) {}

    /// Called when a tick is fully complete.
    fn on_step_complete(&mut self) {}
}

/// A no-op observer that does nothing. Use as default when no observation needed.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}
