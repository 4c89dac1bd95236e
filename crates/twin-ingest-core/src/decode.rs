use model::TelemetrySample;
use serde::Deserialize;
use serde_json::Value;

const REQUIRED_FIELDS: [&str; 8] = [
    "speed_kmh", "rpm", "gear", "throttle", "brake", "steering", "engine_temp", "is_anomaly",
];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field has the wrong type: {0}")]
    Invalid(#[source] serde_json::Error),
    #[error("expected 4 tire entries, got {0}")]
    TireCount(usize),
}

/// A validated inbound frame. `None` in the optional groups means the
/// frame carried no update for them.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub speed_kmh: f32,
    pub rpm: f32,
    pub gear: i32,
    pub throttle: f32,
    pub brake: f32,
    pub steering: f32,
    pub engine_temp: f32,
    pub is_anomaly: bool,
    pub tires: Option<[f32; 4]>,
    pub drs: Option<bool>,
}

impl TelemetryFrame {
    /// Builds the full sample, carrying over tires/DRS from `prior` when
    /// this frame omits them.
    pub fn into_sample(self, prior: Option<&TelemetrySample>) -> TelemetrySample {
        TelemetrySample {
            speed_kmh: self.speed_kmh,
            engine_rpm: self.rpm,
            gear: self.gear,
            throttle: self.throttle,
            brake: self.brake,
            steering: self.steering,
            engine_temp: self.engine_temp,
            is_anomaly: self.is_anomaly,
            tire_temperatures: self.tires.or_else(|| prior.and_then(|p| p.tire_temperatures)),
            drs_active: self.drs.or_else(|| prior.map(|p| p.drs_active)).unwrap_or(false),
        }
    }
}

#[derive(Deserialize)]
struct WireFrame {
    speed_kmh: f32,
    rpm: f32,
    gear: i32,
    throttle: f32,
    brake: f32,
    steering: f32,
    engine_temp: f32,
    is_anomaly: bool,
    #[serde(default)]
    tires: Option<Vec<WireTire>>,
    #[serde(default)]
    aero: Option<WireAero>,
}

#[derive(Deserialize)]
struct WireTire {
    temp: f32,
}

#[derive(Deserialize)]
struct WireAero {
    drs: bool,
}

pub fn decode(text: &str) -> Result<TelemetryFrame, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|k| !obj.contains_key(**k)) {
        return Err(DecodeError::MissingField(*missing));
    }

    let wire: WireFrame = serde_json::from_value(value).map_err(DecodeError::Invalid)?;

    let tires = match wire.tires {
        Some(list) => {
            let temps: Vec<f32> = list.iter().map(|t| t.temp).collect();
            let arr: [f32; 4] = temps.try_into().map_err(|v: Vec<f32>| DecodeError::TireCount(v.len()))?;
            Some(arr)
        }
        None => None,
    };

    Ok(TelemetryFrame {
        speed_kmh: wire.speed_kmh,
        rpm: wire.rpm,
        gear: wire.gear,
        throttle: wire.throttle,
        brake: wire.brake,
        steering: wire.steering,
        engine_temp: wire.engine_temp,
        is_anomaly: wire.is_anomaly,
        tires,
        drs: wire.aero.map(|a| a.drs),
    })
}
