//! Configuration module for Resonance.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Detection, Engine, Sinks, and Observability.

mod detection_config;
mod engine_config;
mod observability_config;
mod sink_config;

pub use detection_config::DetectionEnvConfig;
pub use engine_config::EngineEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use sink_config::{
    DiscordSinkSettings, FileSinkSettings, SinkName, SinkSettings, SqliteSinkSettings,
    TelegramSinkSettings, is_configured,
};

use crate::application::engine::EngineSettings;
use crate::application::rolling_store::WindowConfig;
use crate::domain::detection::Thresholds;
use crate::domain::errors::ConfigError;
use crate::domain::market::UniverseMap;
use crate::infrastructure::settings_persistence::SettingsPersistence;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// Built once at startup and passed by reference; nothing reads the
/// environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    pub detection: DetectionEnvConfig,
    pub engine: EngineEnvConfig,
    pub sinks: SinkSettings,
    pub sink_settings_path: PathBuf,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables and the sink toggle file.
    pub fn from_env() -> Result<Self> {
        let detection = DetectionEnvConfig::from_env().context("Failed to load detection config")?;
        let engine = EngineEnvConfig::from_env().context("Failed to load engine config")?;
        let observability =
            ObservabilityEnvConfig::from_env().context("Failed to load observability config")?;

        let sink_settings_path = PathBuf::from(
            env::var("SINK_SETTINGS_PATH").unwrap_or_else(|_| "sinks.json".to_string()),
        );
        let sinks = SettingsPersistence::new(&sink_settings_path)
            .load()?
            .unwrap_or_default()
            .overlay_env()
            .context("Failed to load sink config")?;

        Ok(Self {
            detection,
            engine,
            sinks,
            sink_settings_path,
            observability,
        })
    }

    /// Fail-fast checks run before any tick is processed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_settings().validate()?;
        if self.engine.sink_timeout_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "sink_timeout",
            });
        }
        self.sinks.validate()
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_pct_over: self.detection.min_pct_over,
            min_vol_ratio: self.detection.min_vol_ratio,
            min_usd_per_min: self.detection.min_usd_per_min,
            max_rsi: self.detection.max_rsi,
            min_macd_hist: self.detection.min_macd_hist,
        }
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            rsi_period: self.detection.rsi_period,
            macd_fast_period: self.detection.macd_fast_period,
            macd_slow_period: self.detection.macd_slow_period,
            macd_signal_period: self.detection.macd_signal_period,
            retention_ms: i64::try_from(self.detection.retention_window_seconds)
                .unwrap_or(i64::MAX / 1000)
                .saturating_mul(1000),
            max_samples: self.detection.retention_max_samples,
            min_baseline_samples: self.detection.min_baseline_samples,
        }
    }

    pub fn universes(&self) -> UniverseMap {
        UniverseMap::parse(
            self.detection.default_universe.clone(),
            &self.detection.universes,
        )
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            window: self.window_config(),
            thresholds: self.thresholds(),
            universes: self.universes(),
            cooldown: Duration::from_secs(self.detection.cooldown_seconds),
            dedup_max_entries: self.detection.dedup_max_entries,
            worker_count: self.engine.worker_count,
            lane_capacity: self.engine.lane_queue_capacity,
            max_in_flight_dispatches: self.engine.max_inflight_dispatches,
        }
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.sink_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.engine.shutdown_grace_ms)
    }
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .unwrap_or(default)
}

/// Unset or empty means "not configured"
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_opt_f64(key: &str) -> Result<Option<f64>> {
    optional_var(key)
        .map(|v| v.trim().parse::<f64>())
        .transpose()
        .context(format!("Failed to parse {}", key))
}

fn parse_opt_usize(key: &str) -> Result<Option<usize>> {
    optional_var(key)
        .map(|v| v.trim().parse::<usize>())
        .transpose()
        .context(format!("Failed to parse {}", key))
}

fn parse_opt_bool(key: &str) -> Result<Option<bool>> {
    optional_var(key)
        .map(|v| v.trim().to_lowercase().parse::<bool>())
        .transpose()
        .context(format!("Failed to parse {}", key))
}

/// Serializes tests that read or mutate process environment
#[cfg(test)]
pub(crate) fn test_env_lock() -> &'static std::sync::Mutex<()> {
    static ENV_LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    ENV_LOCK.get_or_init(|| std::sync::Mutex::new(()))
}
