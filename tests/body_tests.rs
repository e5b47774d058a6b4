use cradle::{build_scene, create_world, BodyBuilder, CradleConfig, CradleError, PhysicsModule};
use cradle::scene::Role;

fn setup(config: &CradleConfig) -> (cradle::SimulationWorld, cradle::VisualCradle) {
    let (world, _) = create_world(&PhysicsModule::load(), &config.world).unwrap();
    (world, build_scene(config))
}

#[test]
fn rebuild_replaces_instead_of_duplicating() {
    let config = CradleConfig::default();
    let (mut world, mut scene) = setup(&config);
    let mut builder = BodyBuilder::new();

    let first = builder.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap().clone();
    let count = world.rigid_body_count();
    assert_eq!(first.balls.len(), 5);
    assert_eq!(first.frame.len(), 4);
    assert_eq!(count, 9);

    let second = builder.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap().clone();
    assert_eq!(world.rigid_body_count(), count);
    assert_eq!(second.len(), first.len());
    for handle in &first.balls {
        assert!(world.rigid_body(*handle).is_none(), "old body survived rebuild");
    }
}

#[test]
fn missing_world_leaves_no_partial_state() {
    let config = CradleConfig::default();
    let (world, mut scene) = setup(&config);
    let mut builder = BodyBuilder::new();

    let result = builder.build_bodies(&mut scene, None, &config.balls);
    assert!(matches!(result, Err(CradleError::EngineUnavailable)));
    assert!(builder.bodies().is_empty());
    assert_eq!(world.rigid_body_count(), 0);
    assert!(scene.meshes().iter().all(|m| m.body.is_none()));
}

#[test]
fn meshes_and_bodies_reference_each_other() {
    let config = CradleConfig::new().with_ball_count(3);
    let (mut world, mut scene) = setup(&config);
    let mut builder = BodyBuilder::new();
    builder.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap();

    for (index, mesh) in scene.meshes().iter().enumerate() {
        match mesh.role {
            Role::Ball(_) | Role::Frame(_) => {
                let body = world.rigid_body(mesh.body.unwrap()).unwrap();
                assert_eq!(body.user_data, index as u128);
            }
            _ => assert!(mesh.body.is_none()),
        }
    }

    let ball = world.rigid_body(builder.bodies().ball(1).unwrap()).unwrap();
    assert!(ball.is_dynamic());
    assert!((ball.mass() - config.balls.mass).abs() < 1e-4);
    let frame = world.rigid_body(builder.bodies().frame[0]).unwrap();
    assert!(frame.is_fixed());
    assert!(builder.bodies().top_bar.is_some());
}

#[test]
fn rest_positions_match_the_layout() {
    let config = CradleConfig::new().with_ball_count(4).with_ball_spacing(1.2);
    let (mut world, mut scene) = setup(&config);
    let mut builder = BodyBuilder::new();
    builder.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap();

    for i in 0..4 {
        let expected = scene.layout.ball_center(i);
        let actual = world.body_transform(builder.bodies().ball(i).unwrap()).unwrap();
        assert!((actual.translation.vector - expected.coords).norm() < 1e-5);
    }
}
