use cradle::{
    build_scene, create_world, BodyBuilder, CradleConfig, NoOpStepObserver, PhysicsModule,
    SimulationWorld, StringManager, StringState, VisualCradle,
};
use cradle::bodies::CradleBodies;
use cradle::strings::StringBody;

fn soft_cradle(config: &CradleConfig) -> (SimulationWorld, VisualCradle, CradleBodies) {
    let (mut world, _) = create_world(&PhysicsModule::load(), &config.world).unwrap();
    let mut scene = build_scene(config);
    let mut builder = BodyBuilder::new();
    let bodies = builder.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap().clone();
    (world, scene, bodies)
}

fn rope_handle(strings: &StringManager, index: usize) -> cradle::SoftBodyHandle {
    match strings.strings()[index].body {
        StringBody::Soft(handle) => handle,
        StringBody::Chain(_) => panic!("expected a soft rope"),
    }
}

#[test]
fn rope_mass_is_a_light_even_share_of_the_ball() {
    let config = CradleConfig::new()
        .with_ball_mass(2.0)
        .with_rope_segments(8)
        .with_rope_mass_fraction(0.1);
    let (mut world, scene, bodies) = soft_cradle(&config);
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, &bodies, &config).unwrap();

    let rope = world.soft_body(rope_handle(&strings, 0)).unwrap();
    let n = rope.node_count();
    assert_eq!(n, 9);
    assert_eq!(rope.node(0).unwrap().inverse_mass, 0.0);
    for i in 1..n {
        let w = rope.node(i).unwrap().inverse_mass;
        assert!((w - 40.0).abs() < 1e-3, "node {i} has inverse mass {w}");
    }
    let rope_mass: f32 = rope.nodes()[1..].iter().map(|node| 1.0 / node.inverse_mass).sum();
    assert!((rope_mass - 0.2).abs() < 1e-4);
}

#[test]
fn nodes_start_on_the_straight_line_at_rest() {
    let config = CradleConfig::default();
    let (mut world, scene, bodies) = soft_cradle(&config);
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, &bodies, &config).unwrap();

    let start = scene.layout.string_start(2);
    let end = scene.layout.ball_top(2);
    let rope = world.soft_body(rope_handle(&strings, 2)).unwrap();
    let last = (rope.node_count() - 1) as f32;
    for (i, node) in rope.nodes().iter().enumerate() {
        let expected = start + (end - start) * (i as f32 / last);
        assert!((node.position - expected).norm() < 1e-5);
        assert_eq!(node.position, node.previous_position);
        assert_eq!(node.velocity.norm(), 0.0);
    }
    assert!((rope.rest_length() - config.string.length).abs() < 1e-4);
}

#[test]
fn both_ends_are_anchored_with_configured_flags() {
    let mut config = CradleConfig::default();
    config.string.anchor.disable_collision = false;
    let (mut world, scene, bodies) = soft_cradle(&config);
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, &bodies, &config).unwrap();
    assert_eq!(strings.anchor_failures(), 0);

    let rope = world.soft_body(rope_handle(&strings, 1)).unwrap();
    let anchors = rope.anchors();
    assert_eq!(anchors.len(), 2);
    assert_eq!(anchors[0].node, 0);
    assert_eq!(Some(anchors[0].body), bodies.top_bar);
    assert_eq!(anchors[1].node, rope.node_count() - 1);
    assert_eq!(anchors[1].body, bodies.balls[1]);
    assert!(anchors.iter().all(|a| !a.disable_collision && a.influence == 1.0));
}

#[test]
fn failed_anchor_is_logged_and_rope_kept() {
    let config = CradleConfig::new().with_ball_count(3);
    let (mut world, scene, mut bodies) = soft_cradle(&config);
    bodies.top_bar = None;
    let mut strings = StringManager::new();
    let built = strings.build(&mut world, &scene, &bodies, &config).unwrap();

    assert_eq!(built, 3);
    assert_eq!(strings.anchor_failures(), 3);
    assert_eq!(world.soft_body_count(), 3);
    let rope = world.soft_body(rope_handle(&strings, 0)).unwrap();
    assert_eq!(rope.anchors().len(), 1);
}

#[test]
fn rebuild_tears_down_previous_ropes() {
    let config = CradleConfig::default();
    let (mut world, scene, bodies) = soft_cradle(&config);
    let mut strings = StringManager::new();
    assert_eq!(strings.state(), StringState::Uninitialized);

    strings.build(&mut world, &scene, &bodies, &config).unwrap();
    let old = rope_handle(&strings, 0);
    strings.build(&mut world, &scene, &bodies, &config).unwrap();
    assert_eq!(strings.state(), StringState::Built);
    assert_eq!(world.soft_body_count(), 5);
    assert!(world.soft_body(old).is_none());

    strings.teardown(&mut world);
    assert_eq!(strings.state(), StringState::TornDown);
    assert!(strings.is_empty());
}

#[test]
fn soft_cradle_stays_finite_and_visible() {
    let mut cradle = cradle::Cradle::new(PhysicsModule::load(), CradleConfig::default()).unwrap();
    cradle.kick();
    for _ in 0..120 {
        cradle.tick(1.0 / 60.0, &mut NoOpStepObserver);
    }
    for i in 0..5 {
        let string = cradle.scene().string(i).unwrap();
        assert!(string.visible);
        let line = string.line().unwrap();
        assert!(line.positions.as_slice().iter().all(|c| c.is_finite()));
    }
    let p = cradle.ball_position(0).unwrap();
    assert!(p.iter().all(|c| c.is_finite()));
}
