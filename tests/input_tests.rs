use cradle::{Cradle, CradleConfig, DragHistory, EngineFeatures, InputEvent, InputOutcome, Key, PhysicsModule};
use cradle::input::release_impulse;
use rapier3d::prelude::{point, Point, Real};

fn screen_position(cradle: &Cradle, p: Point<Real>) -> (Real, Real) {
    let camera = cradle.camera();
    let ndc = camera.projection().project_point(&(camera.view() * p));
    let viewport = cradle.viewport();
    (
        (ndc.x + 1.0) * 0.5 * viewport.width,
        (1.0 - ndc.y) * 0.5 * viewport.height,
    )
}

fn rigid_cradle() -> Cradle {
    Cradle::new(PhysicsModule::load_with(EngineFeatures::RIGID_ONLY), CradleConfig::default()).unwrap()
}

#[test]
fn release_impulse_is_parallel_to_drag_and_inverse_to_duration() {
    let p0 = point![0.0, 0.0, 0.0];
    let p1 = point![1.0, 2.0, 0.0];

    let mut slow = DragHistory::new(5);
    slow.push(p0, 0.0);
    slow.push(p1, 0.5);
    let mut fast = DragHistory::new(5);
    fast.push(p0, 0.0);
    fast.push(p1, 0.25);

    let slow = release_impulse(&slow, 2.0, 1.0).unwrap();
    let fast = release_impulse(&fast, 2.0, 1.0).unwrap();
    let dir = p1 - p0;
    assert!(slow.cross(&dir).norm() < 1e-5);
    assert!(slow.dot(&dir) > 0.0);
    assert!((fast - slow * 2.0).norm() < 1e-4);
    assert!((slow - dir * 4.0).norm() < 1e-4);
}

#[test]
fn no_impulse_without_a_time_span() {
    let mut history = DragHistory::new(5);
    history.push(point![0.0, 0.0, 0.0], 1.0);
    assert!(release_impulse(&history, 1.0, 1.0).is_none());
    history.push(point![1.0, 0.0, 0.0], 1.0);
    assert!(release_impulse(&history, 1.0, 1.0).is_none());
}

#[test]
fn drag_and_release_throws_the_ball() {
    let mut cradle = rigid_cradle();
    let center = cradle.scene().layout.ball_center(2);
    let (x, y) = screen_position(&cradle, center);
    let bodies_before = cradle.world().rigid_body_count();

    let outcome = cradle.handle(&InputEvent::MouseDown { x, y, time: 0.0 });
    assert_eq!(outcome, InputOutcome::Selected(2));
    assert!(cradle.input().is_dragging());
    assert_eq!(cradle.world().rigid_body_count(), bodies_before + 1);

    let outcome = cradle.handle(&InputEvent::MouseMove { x: x + 40.0, y, time: 0.05 });
    assert_eq!(outcome, InputOutcome::Dragged(2));

    match cradle.handle(&InputEvent::MouseUp { x: x + 40.0, y, time: 0.06 }) {
        InputOutcome::Released { ball, impulse } => {
            assert_eq!(ball, 2);
            assert!(impulse.unwrap().x > 0.0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!cradle.input().is_dragging());
    assert_eq!(cradle.world().rigid_body_count(), bodies_before);
}

#[test]
fn touch_selects_like_the_mouse() {
    let mut cradle = rigid_cradle();
    let (x, y) = screen_position(&cradle, cradle.scene().layout.ball_center(4));
    let outcome = cradle.handle(&InputEvent::TouchStart { touches: vec![(x, y)], time: 0.0 });
    assert_eq!(outcome, InputOutcome::Selected(4));
    let outcome = cradle.handle(&InputEvent::TouchEnd { time: 0.1 });
    assert!(matches!(outcome, InputOutcome::Released { ball: 4, impulse: None }));
}

#[test]
fn click_on_empty_space_kicks_the_first_ball() {
    let mut cradle = rigid_cradle();
    assert_eq!(cradle.handle(&InputEvent::MouseDown { x: 2.0, y: 2.0, time: 0.0 }), InputOutcome::Ignored);
    assert_eq!(cradle.handle(&InputEvent::MouseUp { x: 2.0, y: 2.0, time: 0.1 }), InputOutcome::Kicked);
    cradle.tick(1.0 / 60.0, &mut cradle::NoOpStepObserver);
    assert!(cradle.ball_velocity(0).unwrap().x < 0.0);
}

#[test]
fn double_tap_kicks_single_tap_does_not() {
    let mut cradle = rigid_cradle();
    let tap = |time| InputEvent::TouchStart { touches: vec![(2.0, 2.0)], time };
    assert_eq!(cradle.handle(&tap(0.0)), InputOutcome::Ignored);
    assert_eq!(cradle.handle(&InputEvent::TouchEnd { time: 0.05 }), InputOutcome::Ignored);
    assert_eq!(cradle.handle(&tap(1.0)), InputOutcome::Ignored);
    assert_eq!(cradle.handle(&tap(1.2)), InputOutcome::Kicked);
}

#[test]
fn keys_kick_and_toggle_settings() {
    let mut cradle = rigid_cradle();
    assert!(!cradle.settings_visible());
    assert_eq!(cradle.handle(&InputEvent::KeyDown(Key::S)), InputOutcome::SettingsToggled(true));
    assert_eq!(cradle.handle(&InputEvent::KeyDown(Key::S)), InputOutcome::SettingsToggled(false));
    assert_eq!(cradle.handle(&InputEvent::KeyDown(Key::Other)), InputOutcome::Ignored);
    assert_eq!(cradle.handle(&InputEvent::KeyDown(Key::Space)), InputOutcome::Kicked);
}

#[test]
fn kick_is_ignored_while_dragging() {
    let mut cradle = rigid_cradle();
    let (x, y) = screen_position(&cradle, cradle.scene().layout.ball_center(1));
    cradle.handle(&InputEvent::MouseDown { x, y, time: 0.0 });
    assert_eq!(cradle.handle(&InputEvent::KeyDown(Key::Space)), InputOutcome::Ignored);
    assert!(!cradle.kick());
}

#[test]
fn restart_drops_an_active_drag() {
    let mut cradle = rigid_cradle();
    let (x, y) = screen_position(&cradle, cradle.scene().layout.ball_center(3));
    assert_eq!(cradle.handle(&InputEvent::MouseDown { x, y, time: 0.0 }), InputOutcome::Selected(3));
    let fresh_bodies = cradle.world().rigid_body_count() - 1;

    cradle.restart().unwrap();
    assert!(!cradle.input().is_dragging());
    assert_eq!(cradle.world().rigid_body_count(), fresh_bodies);
    assert_eq!(cradle.handle(&InputEvent::MouseUp { x, y, time: 0.1 }), InputOutcome::Ignored);
    assert_eq!(cradle.world().rigid_body_count(), fresh_bodies);
}

#[test]
fn resize_updates_camera_aspect() {
    let mut cradle = rigid_cradle();
    assert_eq!(cradle.handle(&InputEvent::Resize { width: 1000.0, height: 500.0 }), InputOutcome::Resized);
    assert!((cradle.camera().aspect - 2.0).abs() < 1e-6);
    assert_eq!(cradle.viewport().width, 1000.0);
}
