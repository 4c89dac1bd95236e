// Headless stand-ins for the physics body, the vehicle materials and the HUD.
use std::{fmt, sync::Arc};

use hud::{Color, HudSurface};
use model::Vec3;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};
use twin_ingest_core::{KinematicActuator, VisualEffects};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyView {
    pub velocity: Vec3,
    pub gear: i32,
    pub steering: f32,
    pub brake: f32,
    pub handbrake: bool,
}

/// Flat-ground body with a fixed heading; keeps whatever it was told.
pub struct GhostBody {
    heading_rad: f32,
    view: Arc<Mutex<BodyView>>,
}

impl GhostBody {
    pub fn new(heading_rad: f32) -> Self {
        Self { heading_rad, view: Arc::default() }
    }

    pub fn view(&self) -> Arc<Mutex<BodyView>> {
        self.view.clone()
    }
}

impl KinematicActuator for GhostBody {
    fn set_brake_input(&mut self, brake: f32) { self.view.lock().brake = brake; }
    fn set_handbrake_input(&mut self, engaged: bool) { self.view.lock().handbrake = engaged; }
    fn set_target_gear(&mut self, gear: i32, _immediate: bool) { self.view.lock().gear = gear; }
    fn set_steering_input(&mut self, steering: f32) { self.view.lock().steering = steering; }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        trace!(?velocity, "body velocity");
        self.view.lock().velocity = velocity;
    }

    fn forward_vector(&self) -> Vec3 {
        Vec3::new(self.heading_rad.cos(), self.heading_rad.sin(), 0.0)
    }

    fn vertical_velocity(&self) -> f32 {
        self.view.lock().velocity.z
    }
}

pub struct LogEffects;

impl VisualEffects for LogEffects {
    fn on_tire_temperature_update(&mut self, temps: &[f32; 4]) {
        debug!(fl = temps[0], fr = temps[1], rl = temps[2], rr = temps[3], "tire temps");
    }

    fn on_aero_state_changed(&mut self, drs_open: bool) {
        debug!(drs_open, "aero");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudView {
    pub speed: String,
    pub rpm: String,
    pub gear: String,
    pub throttle: f32,
    pub brake: f32,
    pub temp: String,
    pub warning: Option<String>,
}

impl fmt::Display for HudView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Speed: {} km/h | RPM: {} | Gear: {} | Throttle: {:.2} | Brake: {:.2} | Temp: {}",
            self.speed, self.rpm, self.gear, self.throttle, self.brake, self.temp
        )?;
        if let Some(w) = &self.warning {
            write!(f, " | {w}")?;
        }
        Ok(())
    }
}

/// Text HUD; the latest frame is kept for the `status` command.
#[derive(Default)]
pub struct ConsoleHud {
    view: Arc<Mutex<HudView>>,
}

impl ConsoleHud {
    pub fn new() -> Self {
        Self { view: Arc::default() }
    }

    pub fn view(&self) -> Arc<Mutex<HudView>> {
        self.view.clone()
    }
}

impl HudSurface for ConsoleHud {
    fn set_speed_text(&mut self, text: &str) { self.view.lock().speed = text.into(); }
    fn set_rpm_text(&mut self, text: &str, _color: Color) { self.view.lock().rpm = text.into(); }
    fn set_gear_text(&mut self, text: &str) { self.view.lock().gear = text.into(); }
    fn set_throttle_bar(&mut self, percent: f32, _fill: Color) { self.view.lock().throttle = percent; }
    fn set_brake_bar(&mut self, percent: f32, _fill: Color) { self.view.lock().brake = percent; }
    fn set_temp_text(&mut self, text: &str, _color: Color) { self.view.lock().temp = text.into(); }

    fn show_warning(&mut self, text: &str, _color: Color) {
        let mut v = self.view.lock();
        if v.warning.is_none() {
            warn!("{text}");
        }
        v.warning = Some(text.into());
    }

    fn hide_warning(&mut self) {
        let mut v = self.view.lock();
        if v.warning.take().is_some() {
            info!("anomaly cleared");
        }
    }
}
