use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use model::PlaybackMode;
use serde::{Deserialize, Serialize};

pub const URL_ENV: &str = "TWIN_SERVER_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TwinConfig {
    pub server_url: String,     // e.g. "ws://localhost:8765"
    pub tick_hz: u32,
    pub log_level: String,      // fallback when RUST_LOG is unset
    pub initial_mode: Option<PlaybackMode>, // sent once per Connected
    pub warn_interval_s: f32,
    pub auto_connect: bool,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            server_url: twin_ingest_ws::DEFAULT_URL.into(),
            tick_hz: 60,
            log_level: "info".into(),
            initial_mode: None,
            warn_interval_s: 5.0,
            auto_connect: true,
        }
    }
}

impl TwinConfig {
    /// Reads the optional JSON file, then applies `TWIN_SERVER_URL`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parse {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env(std::env::var(URL_ENV).ok());
        cfg.validate().context("invalid config")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Duration::try_from_secs_f32(self.warn_interval_s)
            .with_context(|| format!("warn_interval_s = {}", self.warn_interval_s))?;
        Ok(())
    }

    pub fn apply_env(&mut self, server_url: Option<String>) {
        if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
            self.server_url = url;
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }

    pub fn warn_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.warn_interval_s.max(0.0)).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let cfg = TwinConfig::default();
        assert_eq!(cfg.server_url, "ws://localhost:8765");
        assert_eq!(cfg.tick_interval(), Duration::from_secs_f64(1.0 / 60.0));
        assert_eq!(cfg.warn_interval(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = std::env::temp_dir().join(format!("twin-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"tick_hz": 30, "initial_mode": "playback"}"#).unwrap();
        let cfg = TwinConfig::load(Some(&path)).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(cfg.tick_hz, 30);
        assert_eq!(cfg.initial_mode, Some(PlaybackMode::Playback));
        assert!(cfg.auto_connect);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = TwinConfig::load(Some(Path::new("/nonexistent/twin.json"))).unwrap_err();
        assert!(err.to_string().contains("twin.json"));
    }

    #[test]
    fn out_of_range_warn_interval_is_rejected() {
        let path = std::env::temp_dir().join(format!("twin-config-range-{}.json", std::process::id()));
        fs::write(&path, r#"{"warn_interval_s": 1e30}"#).unwrap();
        let err = TwinConfig::load(Some(&path)).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(format!("{err:#}").contains("warn_interval_s"));

        let cfg: TwinConfig = serde_json::from_str(r#"{"warn_interval_s": 1e30}"#).unwrap();
        assert_eq!(cfg.warn_interval(), Duration::MAX);
        let cfg: TwinConfig = serde_json::from_str(r#"{"warn_interval_s": -1.0}"#).unwrap();
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.warn_interval(), Duration::ZERO);
    }

    #[test]
    fn env_override_ignores_blank_values() {
        let mut cfg = TwinConfig::default();
        cfg.apply_env(Some("  ".into()));
        assert_eq!(cfg.server_url, "ws://localhost:8765");
        cfg.apply_env(Some("ws://10.0.0.2:9000".into()));
        assert_eq!(cfg.server_url, "ws://10.0.0.2:9000");
    }
}
