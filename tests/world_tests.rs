use cradle::{
    build_scene, create_world, BodyBuilder, Capability, CradleConfig, CradleError, EngineFeatures,
    PhysicsModule, SoftBodyHelpers, StringManager,
};
use cradle::config::WorldConfig;
use rapier3d::prelude::{point, vector, ColliderBuilder, RigidBodyBuilder};

#[test]
fn unloaded_module_builds_nothing() {
    let result = create_world(&PhysicsModule::unloaded(), &WorldConfig::default());
    assert!(matches!(result, Err(CradleError::EngineUnavailable)));
}

#[test]
fn capability_follows_module_features() {
    let (_, full) = create_world(&PhysicsModule::load(), &WorldConfig::default()).unwrap();
    assert_eq!(full, Capability::FullSoftBody);

    let mut features = EngineFeatures::ALL;
    features.soft_body_world_info = false;
    let (world, reduced) = create_world(&PhysicsModule::load_with(features), &WorldConfig::default()).unwrap();
    assert_eq!(reduced, Capability::RigidOnly);
    assert!(world.world_info().is_none());
}

#[test]
fn rigid_only_world_rejects_soft_bodies() {
    let module = PhysicsModule::load_with(EngineFeatures::RIGID_ONLY);
    let (mut world, _) = create_world(&module, &WorldConfig::default()).unwrap();
    let rope = SoftBodyHelpers::create_rope(point![0.0, 1.0, 0.0], point![0.0, 0.0, 0.0], 4, true, false);
    assert!(matches!(world.add_soft_body(rope), Err(CradleError::SoftBodiesUnsupported)));
    assert_eq!(world.soft_body_count(), 0);
}

#[test]
fn gravity_pulls_dynamic_bodies_down() {
    let config = WorldConfig { gravity: 9.81, ..WorldConfig::default() };
    let (mut world, _) = create_world(&PhysicsModule::load(), &config).unwrap();
    let body = world.add_rigid_body(
        RigidBodyBuilder::dynamic().translation(vector![0.0, 10.0, 0.0]).build(),
        Some(ColliderBuilder::ball(0.5).build()),
    );
    for _ in 0..60 {
        world.step_simulation(1.0 / 60.0, 10, 1.0 / 120.0);
    }
    let y = world.body_transform(body).unwrap().translation.vector.y;
    assert!(y < 9.0, "body should fall, y = {y}");

    world.set_gravity(0.0);
    assert_eq!(world.gravity(), vector![0.0, 0.0, 0.0]);
    assert_eq!(world.world_info().unwrap().gravity, vector![0.0, 0.0, 0.0]);
}

#[test]
fn point_constraint_needs_both_bodies() {
    let (mut world, _) = create_world(&PhysicsModule::load(), &WorldConfig::default()).unwrap();
    let a = world.add_rigid_body(RigidBodyBuilder::fixed().build(), None);
    let b = world.add_rigid_body(RigidBodyBuilder::dynamic().build(), None);
    assert!(world.remove_rigid_body(b));
    let err = world.add_point_constraint(a, point![0.0, 0.0, 0.0], b, point![0.0, 0.0, 0.0]);
    assert!(matches!(err, Err(CradleError::UnknownBody(h)) if h == b));
    assert_eq!(world.constraint_count(), 0);
}

fn built_world(features: EngineFeatures) -> (cradle::SimulationWorld, StringManager) {
    let config = CradleConfig::default();
    let (mut world, _) = create_world(&PhysicsModule::load_with(features), &config.world).unwrap();
    let mut scene = build_scene(&config);
    let mut bodies = BodyBuilder::new();
    bodies.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap();
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, bodies.bodies(), &config).unwrap();
    (world, strings)
}

#[test]
fn teardown_empties_a_soft_body_world() {
    let (mut world, mut strings) = built_world(EngineFeatures::ALL);
    assert_eq!(world.soft_body_count(), 5);
    assert!(world.rigid_body_count() > 0);

    strings.clear_soft_bodies(&mut world);
    assert_eq!(world.soft_body_count(), 0);

    let report = world.teardown();
    assert!(report.rigid_bodies > 0);
    assert_eq!(world.soft_body_count(), 0);
    assert_eq!(world.rigid_body_count(), 0);
    assert_eq!(world.constraint_count(), 0);
}

#[test]
fn teardown_empties_a_rigid_chain_world() {
    let (mut world, _strings) = built_world(EngineFeatures::RIGID_ONLY);
    assert!(world.constraint_count() > 0);

    let report = world.teardown();
    assert_eq!(report.soft_bodies, 0);
    assert!(report.constraints > 0);
    assert_eq!(world.soft_body_count(), 0);
    assert_eq!(world.rigid_body_count(), 0);
    assert_eq!(world.constraint_count(), 0);
    // a second teardown has nothing left to release
    assert_eq!(world.teardown().total(), 0);
}

#[test]
fn building_chains_leaves_joint_softness_alone() {
    let config = CradleConfig::default();
    let (mut world, _) = create_world(&PhysicsModule::load_with(EngineFeatures::RIGID_ONLY), &config.world).unwrap();
    world.set_joint_softness(250.0, 0.7);
    let mut scene = build_scene(&config);
    let mut bodies = BodyBuilder::new();
    bodies.build_bodies(&mut scene, Some(&mut world), &config.balls).unwrap();
    let mut strings = StringManager::new();
    strings.build(&mut world, &scene, bodies.bodies(), &config).unwrap();
    assert_eq!(world.joint_softness(), (250.0, 0.7));
}
