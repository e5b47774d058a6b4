//! The owning context for one interactive cradle.
//!
//! [`Cradle`] holds the world, the scene and every manager, and hands them
//! to each component by reference. A rebuild replaces all of them at once,
//! so no component can keep a handle into a discarded world.

use log::{debug, info};
use rapier3d::prelude::{Point, Real, Vector};

use crate::bodies::BodyBuilder;
use crate::camera::{Camera, Viewport};
use crate::config::CradleConfig;
use crate::error::Result;
use crate::input::{InputContext, InputController, InputEvent, InputOutcome};
use crate::module::{Capability, PhysicsModule};
use crate::observer::StepObserver;
use crate::scene::{build_scene, VisualCradle};
use crate::stepper::Stepper;
use crate::strings::StringManager;
use crate::world::{create_world, SimulationWorld};

/// Draws the scene once per frame.
pub trait Renderer {
    fn render(&mut self, scene: &VisualCradle, camera: &Camera);
}

/// A renderer that draws nothing.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _scene: &VisualCradle, _camera: &Camera) {}
}

struct Assembly {
    world: SimulationWorld,
    capability: Capability,
    scene: VisualCradle,
    bodies: BodyBuilder,
    strings: StringManager,
}

fn assemble(module: &PhysicsModule, config: &CradleConfig) -> Result<Assembly> {
    let (mut world, capability) = create_world(module, &config.world)?;
    world.set_joint_softness(config.chain.joint_natural_frequency, config.chain.joint_damping_ratio);
    let mut scene = build_scene(config);
    let mut bodies = BodyBuilder::new();
    bodies.build_bodies(&mut scene, Some(&mut world), &config.balls)?;
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, bodies.bodies(), config)?;
    Ok(Assembly { world, capability, scene, bodies, strings })
}

pub struct Cradle {
    module: PhysicsModule,
    config: CradleConfig,
    capability: Capability,
    world: SimulationWorld,
    scene: VisualCradle,
    bodies: BodyBuilder,
    strings: StringManager,
    stepper: Stepper,
    camera: Camera,
    viewport: Viewport,
    input: InputController,
}

impl Cradle {
    /// Validate `config` and build everything. Fails with
    /// [`crate::CradleError::EngineUnavailable`] if `module` is not loaded.
    pub fn new(module: PhysicsModule, config: CradleConfig) -> Result<Self> {
        config.validate()?;
        let parts = assemble(&module, &config)?;
        let viewport = Viewport::default();
        info!(
            "cradle ready: {} balls, {:?}",
            config.balls.count, parts.capability
        );
        Ok(Cradle {
            capability: parts.capability,
            world: parts.world,
            scene: parts.scene,
            bodies: parts.bodies,
            strings: parts.strings,
            stepper: Stepper::new(&config.world),
            camera: Camera::from_config(&config.visual, viewport.aspect()),
            viewport,
            input: InputController::new(config.input.clone()),
            module,
            config,
        })
    }

    /// Advance one real frame and sync the scene.
    pub fn tick(&mut self, real_delta: Real, observer: &mut impl StepObserver) {
        self.stepper.tick(
            real_delta,
            &mut self.world,
            &mut self.scene,
            &mut self.strings,
            observer,
        );
    }

    /// Tick, then render.
    pub fn frame(
        &mut self,
        real_delta: Real,
        observer: &mut impl StepObserver,
        renderer: &mut impl Renderer,
    ) {
        self.tick(real_delta, observer);
        renderer.render(&self.scene, &self.camera);
    }

    pub fn handle(&mut self, event: &InputEvent) -> InputOutcome {
        let ctx = InputContext {
            world: &mut self.world,
            scene: &self.scene,
            bodies: self.bodies.bodies(),
            camera: &mut self.camera,
            viewport: &mut self.viewport,
        };
        self.input.handle(event, ctx)
    }

    /// Apply the kick-off impulse to the first ball.
    pub fn kick(&mut self) -> bool {
        self.input.kick(&mut self.world, self.bodies.bodies())
    }

    /// Replace world, scene, bodies and strings with ones built from
    /// `config`. On error the current cradle is left untouched.
    pub fn reconfigure(&mut self, config: CradleConfig) -> Result<()> {
        config.validate()?;
        let parts = assemble(&self.module, &config)?;

        // The old world's teardown also releases any drag anchor.
        self.input.forget_drag();
        let report = self.world.teardown();
        debug!("rebuild released {} engine objects", report.total());

        self.world = parts.world;
        self.capability = parts.capability;
        self.scene = parts.scene;
        self.bodies = parts.bodies;
        self.strings = parts.strings;
        self.stepper = Stepper::new(&config.world);
        let aspect = self.camera.aspect;
        self.camera = Camera::from_config(&config.visual, aspect);
        self.input.set_config(config.input.clone());
        self.config = config;
        Ok(())
    }

    /// Rebuild from the current configuration.
    pub fn restart(&mut self) -> Result<()> {
        self.reconfigure(self.config.clone())
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    pub fn scene(&self) -> &VisualCradle {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn config(&self) -> &CradleConfig {
        &self.config
    }

    pub fn strings(&self) -> &StringManager {
        &self.strings
    }

    pub fn bodies(&self) -> &BodyBuilder {
        &self.bodies
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn settings_visible(&self) -> bool {
        self.input.settings_visible()
    }

    pub fn ball_position(&self, index: usize) -> Option<Point<Real>> {
        let handle = self.bodies.bodies().ball(index)?;
        self.world
            .body_transform(handle)
            .map(|iso| Point::from(iso.translation.vector))
    }

    pub fn ball_velocity(&self, index: usize) -> Option<Vector<Real>> {
        let handle = self.bodies.bodies().ball(index)?;
        self.world.body_velocity(handle)
    }
}
