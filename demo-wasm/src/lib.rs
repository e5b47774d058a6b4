use cradle::{
    Capability, Cradle, CradleConfig, InputEvent, InputOutcome, Key, NoOpStepObserver,
    PhysicsModule,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) keeps the first logger.
    let _ = console_log::init_with_level(log::Level::Info);
}

fn js_error(err: cradle::CradleError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ---- Cradle Demo ----

#[wasm_bindgen]
pub struct CradleDemo {
    cradle: Cradle,
}

#[wasm_bindgen]
impl CradleDemo {
    /// `soft_bodies = false` forces the rigid-chain strings.
    #[wasm_bindgen(constructor)]
    pub fn new(soft_bodies: bool) -> Result<CradleDemo, JsValue> {
        let module = if soft_bodies {
            PhysicsModule::load()
        } else {
            PhysicsModule::load_with(cradle::EngineFeatures::RIGID_ONLY)
        };
        let cradle = Cradle::new(module, CradleConfig::new()).map_err(js_error)?;
        Ok(CradleDemo { cradle })
    }

    pub fn tick(&mut self, dt: f32) {
        self.cradle.tick(dt, &mut NoOpStepObserver);
    }

    pub fn has_soft_bodies(&self) -> bool {
        self.cradle.capability() == Capability::FullSoftBody
    }

    /// Replace the configuration from (possibly partial) JSON and rebuild.
    pub fn reconfigure(&mut self, json: &str) -> Result<(), JsValue> {
        let config = CradleConfig::from_json(json).map_err(js_error)?;
        self.cradle.reconfigure(config).map_err(js_error)
    }

    pub fn restart(&mut self) -> Result<(), JsValue> {
        self.cradle.restart().map_err(js_error)
    }

    pub fn config_json(&self) -> Result<String, JsValue> {
        self.cradle.config().to_json().map_err(js_error)
    }

    pub fn kick(&mut self) -> bool {
        self.cradle.kick()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, time: f64, touch: bool) -> bool {
        let event = if touch {
            InputEvent::TouchStart { touches: vec![(x, y)], time }
        } else {
            InputEvent::MouseDown { x, y, time }
        };
        matches!(self.cradle.handle(&event), InputOutcome::Selected(_) | InputOutcome::Kicked)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, time: f64, touch: bool) {
        let event = if touch {
            InputEvent::TouchMove { touches: vec![(x, y)], time }
        } else {
            InputEvent::MouseMove { x, y, time }
        };
        self.cradle.handle(&event);
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, time: f64, touch: bool) {
        let event = if touch {
            InputEvent::TouchEnd { time }
        } else {
            InputEvent::MouseUp { x, y, time }
        };
        self.cradle.handle(&event);
    }

    /// Returns whether the settings panel should be shown.
    pub fn key_down(&mut self, code: &str) -> bool {
        let key = match code {
            "Space" => Key::Space,
            "KeyS" => Key::S,
            _ => Key::Other,
        };
        self.cradle.handle(&InputEvent::KeyDown(key));
        self.cradle.settings_visible()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.cradle.handle(&InputEvent::Resize { width, height });
    }

    pub fn ball_count(&self) -> usize {
        self.cradle.scene().ball_count()
    }

    /// Returns flat [x, y, z, qx, qy, qz, qw] per ball
    pub fn ball_transforms(&self) -> Vec<f32> {
        let scene = self.cradle.scene();
        let mut out = Vec::with_capacity(scene.ball_count() * 7);
        for i in 0..scene.ball_count() {
            if let Some(mesh) = scene.ball(i) {
                let t = mesh.transform.translation.vector;
                let q = mesh.transform.rotation;
                out.extend_from_slice(&[t.x, t.y, t.z, q.i, q.j, q.k, q.w]);
            }
        }
        out
    }

    /// Returns flat [x0, y0, z0, x1, ...] of string `index`, empty when hidden
    pub fn string_positions(&self, index: usize) -> Vec<f32> {
        self.cradle
            .scene()
            .string(index)
            .filter(|mesh| mesh.visible)
            .and_then(|mesh| mesh.line())
            .map(|line| line.positions.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Returns [eye x, y, z, target x, y, z, fov_y, aspect]
    pub fn camera(&self) -> Vec<f32> {
        let c = self.cradle.camera();
        vec![
            c.position.x, c.position.y, c.position.z,
            c.target.x, c.target.y, c.target.z,
            c.fov_y, c.aspect,
        ]
    }
}
