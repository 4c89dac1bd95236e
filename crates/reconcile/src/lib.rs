//! Kinematic override: every decoded sample is pushed straight into the
//! actuator. The actuator's own engine/brake/gearbox model is bypassed;
//! horizontal velocity comes from telemetry, vertical velocity stays with
//! the physics engine so gravity and collisions still apply.

use std::time::{Duration, Instant};

use model::{TelemetrySample, Vec3};
use tracing::{debug, error, warn};
use twin_ingest_core::{
    DisplaySink, DisplayUpdate, IngestError, KinematicActuator, LogThrottle, Snapshot, VisualEffects,
};

const KMH_TO_MPS: f32 = 1000.0 / 3600.0;

pub fn kmh_to_units(speed_kmh: f32, units_per_meter: f32) -> f32 {
    speed_kmh * KMH_TO_MPS * units_per_meter
}

/// Velocity along `forward` at the telemetry speed, keeping the body's
/// current vertical component.
pub fn target_velocity(speed_kmh: f32, forward: Vec3, vertical: f32, units_per_meter: f32) -> Vec3 {
    let mut v = forward * kmh_to_units(speed_kmh, units_per_meter);
    v.z = vertical;
    v
}

#[derive(Default)]
pub struct Reconciler {
    actuator: Option<Box<dyn KinematicActuator>>,
    display: Option<Box<dyn DisplaySink>>,
    effects: Option<Box<dyn VisualEffects>>,
    warnings: LogThrottle,
    warnings_logged: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warnings = LogThrottle::new(interval);
        self
    }

    pub fn with_actuator(mut self, actuator: impl KinematicActuator + 'static) -> Self {
        self.actuator = Some(Box::new(actuator));
        self
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn with_effects(mut self, effects: impl VisualEffects + 'static) -> Self {
        self.effects = Some(Box::new(effects));
        self
    }

    /// Missing-collaborator messages actually written, after throttling.
    pub fn warnings_logged(&self) -> u64 {
        self.warnings_logged
    }

    /// Runs once per decoded sample. Returns the velocity pushed into the
    /// actuator, if one is wired.
    pub fn reconcile(&mut self, snap: &Snapshot) -> Option<Vec3> {
        self.reconcile_at(snap, Instant::now())
    }

    pub fn reconcile_at(&mut self, snap: &Snapshot, now: Instant) -> Option<Vec3> {
        let sample = snap.current.as_deref()?;

        if let Some(fx) = self.effects.as_mut() {
            if snap.tires_updated {
                if let Some(temps) = &sample.tire_temperatures {
                    fx.on_tire_temperature_update(temps);
                }
            }
            if snap.aero_updated {
                fx.on_aero_state_changed(sample.drs_active);
            }
        }

        match self.display.as_mut() {
            Some(display) => display.update_telemetry(&DisplayUpdate::from_sample(sample)),
            None => {
                if self.warnings.allow_at("display", now) {
                    self.warnings_logged += 1;
                    warn!(error = %IngestError::MissingCollaborator("display"), "HUD update skipped");
                }
            }
        }

        match self.actuator.as_mut() {
            Some(actuator) => Some(actuate(&mut **actuator, sample)),
            None => {
                if self.warnings.allow_at("actuator", now) {
                    self.warnings_logged += 1;
                    error!(error = %IngestError::MissingCollaborator("actuator"), "kinematic override skipped");
                }
                None
            }
        }
    }
}

fn actuate(actuator: &mut dyn KinematicActuator, s: &TelemetrySample) -> Vec3 {
    // telemetry brake is display-only
    actuator.set_handbrake_input(false);
    actuator.set_brake_input(0.0);
    actuator.set_target_gear(s.gear, true);
    actuator.set_steering_input(s.steering);

    let velocity = target_velocity(
        s.speed_kmh,
        actuator.forward_vector(),
        actuator.vertical_velocity(),
        actuator.units_per_meter(),
    );
    actuator.set_linear_velocity(velocity);
    debug!(speed_kmh = s.speed_kmh, ?velocity, "kinematic target");
    velocity
}
