use cradle::{Cradle, CradleConfig, EngineFeatures, PhysicsModule, StepObserver, Stepper};
use cradle::config::WorldConfig;

#[derive(Default)]
struct Recorder {
    advances: Vec<(f32, u32)>,
    events: Vec<&'static str>,
    synced: usize,
    visible: usize,
}

impl StepObserver for Recorder {
    fn on_advance(&mut self, delta: f32, sub_steps: u32) {
        self.advances.push((delta, sub_steps));
        self.events.push("advance");
    }

    fn on_bodies_synced(&mut self, count: usize) {
        self.synced = count;
        self.events.push("bodies");
    }

    fn on_strings_synced(&mut self, visible: usize) {
        self.visible = visible;
        self.events.push("strings");
    }

    fn on_step_complete(&mut self) {
        self.events.push("complete");
    }
}

#[test]
fn advanced_delta_is_clamped_to_the_cap() {
    let config = CradleConfig::new().with_max_delta(0.2);
    let mut cradle = Cradle::new(PhysicsModule::load_with(EngineFeatures::RIGID_ONLY), config).unwrap();
    let mut recorder = Recorder::default();

    for d in [0.001, 0.2, 5.0] {
        cradle.tick(d, &mut recorder);
    }
    let deltas: Vec<f32> = recorder.advances.iter().map(|(d, _)| *d).collect();
    assert_eq!(deltas, vec![0.001, 0.2, 0.2]);
}

#[test]
fn clamp_is_min_of_delta_and_cap() {
    let stepper = Stepper::new(&WorldConfig { max_delta: 0.2, ..WorldConfig::default() });
    for d in [0.001f32, 0.2, 5.0] {
        assert_eq!(stepper.clamp_delta(d), d.min(0.2));
    }
}

#[test]
fn long_frames_are_capped_in_sub_steps() {
    let mut config = CradleConfig::new();
    config.world.max_sub_steps = 4;
    config.world.fixed_time_step = 0.01;
    let mut cradle = Cradle::new(PhysicsModule::load_with(EngineFeatures::RIGID_ONLY), config).unwrap();
    let mut recorder = Recorder::default();
    cradle.tick(5.0, &mut recorder);
    assert_eq!(recorder.advances[0].1, 4);
}

#[test]
fn tick_runs_in_order_and_syncs_every_body() {
    let mut cradle = Cradle::new(PhysicsModule::load(), CradleConfig::default()).unwrap();
    let mut recorder = Recorder::default();
    cradle.tick(1.0 / 60.0, &mut recorder);

    assert_eq!(recorder.events, vec!["advance", "bodies", "strings", "complete"]);
    // five balls and four frame parts
    assert_eq!(recorder.synced, 9);
    assert_eq!(recorder.visible, 5);
}

#[test]
fn ball_meshes_follow_their_bodies() {
    let mut cradle = Cradle::new(PhysicsModule::load_with(EngineFeatures::RIGID_ONLY), CradleConfig::default()).unwrap();
    cradle.kick();
    for _ in 0..10 {
        cradle.tick(1.0 / 60.0, &mut cradle::NoOpStepObserver);
    }
    let body = cradle.ball_position(0).unwrap();
    let mesh = cradle.scene().ball(0).unwrap().position();
    assert!((body - mesh).norm() < 1e-6);
    assert!(body.x < cradle.scene().layout.ball_center(0).x);
}
