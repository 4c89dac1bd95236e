use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// One reconciled vehicle state. Tire temps and DRS carry over from earlier
/// frames when a frame omits them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TelemetrySample {
    pub speed_kmh: f32,
    pub engine_rpm: f32,
    pub gear: i32,       // -1 reverse, 0 neutral
    pub throttle: f32,   // 0..1
    pub brake: f32,      // 0..1
    pub steering: f32,   // -1..1
    pub engine_temp: f32, // degC
    pub is_anomaly: bool,
    // FL, FR, RL, RR
    pub tire_temperatures: Option<[f32; 4]>,
    pub drs_active: bool,
}

impl TelemetrySample {
    pub fn tire_temp(&self, wheel: Wheel) -> Option<f32> {
        self.tire_temperatures.map(|t| t[wheel.index()])
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [Wheel::FrontLeft, Wheel::FrontRight, Wheel::RearLeft, Wheel::RearRight];

    pub fn index(self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::FrontRight => 1,
            Wheel::RearLeft => 2,
            Wheel::RearRight => 3,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, k: f32) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionState {
    /// Connecting or Connected: a connect request must be skipped.
    pub fn is_busy(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    Live,
    Playback,
}

/// Outbound control frame. Serializes to `{"command":"start_live"}` etc.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Command {
    pub command: CommandKind,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    StartPlayback,
    StartLive,
}

impl Command {
    pub fn for_mode(mode: PlaybackMode) -> Self {
        let command = match mode {
            PlaybackMode::Live => CommandKind::StartLive,
            PlaybackMode::Playback => CommandKind::StartPlayback,
        };
        Self { command }
    }

    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_frames_are_literal() {
        assert_eq!(Command::for_mode(PlaybackMode::Playback).to_frame(), r#"{"command":"start_playback"}"#);
        assert_eq!(Command::for_mode(PlaybackMode::Live).to_frame(), r#"{"command":"start_live"}"#);
    }

    #[test]
    fn tire_lookup_follows_wheel_order() {
        let s = TelemetrySample {
            speed_kmh: 0.0, engine_rpm: 0.0, gear: 0, throttle: 0.0, brake: 0.0,
            steering: 0.0, engine_temp: 0.0, is_anomaly: false,
            tire_temperatures: Some([80.0, 81.0, 90.0, 91.0]),
            drs_active: false,
        };
        assert_eq!(s.tire_temp(Wheel::FrontRight), Some(81.0));
        assert_eq!(s.tire_temp(Wheel::RearLeft), Some(90.0));
        assert_eq!(Wheel::ALL.iter().map(|w| w.index()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn busy_states_block_connect() {
        assert!(ConnectionState::Connecting.is_busy());
        assert!(ConnectionState::Connected.is_busy());
        assert!(!ConnectionState::Errored.is_busy());
        assert!(!ConnectionState::Disconnected.is_busy());
    }
}
