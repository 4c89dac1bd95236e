//! Core telemetry decoding, state and collaborator traits used by the twin

use std::sync::Arc;

use model::{TelemetrySample, Vec3};
use parking_lot::Mutex;

pub mod decode;
pub mod store;
pub mod throttle;

pub use decode::{decode, DecodeError, TelemetryFrame};
pub use store::{ingest, Snapshot, StateReader, StateStore};
pub use throttle::LogThrottle;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("transport: {0}")]
    Transport(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("collaborator `{0}` is not wired up")]
    MissingCollaborator(&'static str),
}

/// Notifications raised by a transport. They are produced on the I/O
/// context and consumed on the tick thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    ConnectionError(String),
    Message(String),
    Disconnected,
}

pub type TransportTx = crossbeam_channel::Sender<TransportEvent>;
pub type TransportRx = crossbeam_channel::Receiver<TransportEvent>;

pub fn transport_channel() -> (TransportTx, TransportRx) {
    crossbeam_channel::unbounded()
}

/// Physics body whose horizontal velocity is dictated by telemetry.
///
/// Velocities are in the actuator's native units; `units_per_meter`
/// tells the reconciler how to convert from SI.
pub trait KinematicActuator: Send {
    fn set_brake_input(&mut self, brake: f32);
    fn set_handbrake_input(&mut self, engaged: bool);
    fn set_target_gear(&mut self, gear: i32, immediate: bool);
    fn set_steering_input(&mut self, steering: f32);
    fn set_linear_velocity(&mut self, velocity: Vec3);

    fn forward_vector(&self) -> Vec3;
    fn vertical_velocity(&self) -> f32;

    fn units_per_meter(&self) -> f32 {
        100.0
    }
}

/// Batched per-message HUD update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayUpdate {
    pub speed_kmh: f32,
    pub rpm: f32,
    pub gear: i32,
    pub throttle: f32,
    pub brake: f32,
    pub steering: f32,
    pub engine_temp: f32,
    pub is_anomaly: bool,
}

impl DisplayUpdate {
    pub fn from_sample(s: &TelemetrySample) -> Self {
        Self {
            speed_kmh: s.speed_kmh,
            rpm: s.engine_rpm,
            gear: s.gear,
            throttle: s.throttle,
            brake: s.brake,
            steering: s.steering,
            engine_temp: s.engine_temp,
            is_anomaly: s.is_anomaly,
        }
    }
}

pub trait DisplaySink: Send {
    fn update_telemetry(&mut self, update: &DisplayUpdate);
}

// The tick loop keeps its own handle to the smoother.
impl<T: DisplaySink> DisplaySink for Arc<Mutex<T>> {
    fn update_telemetry(&mut self, update: &DisplayUpdate) {
        self.lock().update_telemetry(update);
    }
}

/// Presentation hooks (tire materials, rear wing). Called only for frames
/// that carried the corresponding field.
pub trait VisualEffects: Send {
    fn on_tire_temperature_update(&mut self, temps: &[f32; 4]);
    fn on_aero_state_changed(&mut self, drs_open: bool);
}
