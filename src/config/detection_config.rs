//! Detection configuration parsing from environment variables.
//!
//! This module handles breakout thresholds, the cool-down, indicator
//! periods, the retention window and universe tagging.

use super::{parse_f64, parse_opt_f64, parse_opt_usize, parse_u64, parse_usize};
use anyhow::Result;
use std::env;

/// Detection environment configuration
#[derive(Debug, Clone)]
pub struct DetectionEnvConfig {
    // Thresholds
    pub min_pct_over: f64,
    pub min_vol_ratio: f64,
    pub min_usd_per_min: f64,
    pub max_rsi: Option<f64>,
    pub min_macd_hist: Option<f64>,

    // Deduplication
    pub cooldown_seconds: u64,
    pub dedup_max_entries: Option<usize>,

    // Indicators
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,

    // Rolling window
    pub retention_window_seconds: u64,
    pub retention_max_samples: usize,
    pub min_baseline_samples: usize,

    // Universe tagging
    pub default_universe: String,
    pub universes: String,
}

impl DetectionEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            min_pct_over: parse_f64("MIN_PCT_OVER", 0.03)?,
            min_vol_ratio: parse_f64("MIN_VOL_RATIO", 2.0)?,
            min_usd_per_min: parse_f64("MIN_USD_PER_MIN", 50_000.0)?,
            max_rsi: parse_opt_f64("MAX_RSI")?,
            min_macd_hist: parse_opt_f64("MIN_MACD_HIST")?,
            cooldown_seconds: parse_u64("COOLDOWN_SECONDS", 300)?,
            dedup_max_entries: parse_opt_usize("DEDUP_MAX_ENTRIES")?,
            rsi_period: parse_usize("RSI_PERIOD", 14)?,
            macd_fast_period: parse_usize("MACD_FAST_PERIOD", 12)?,
            macd_slow_period: parse_usize("MACD_SLOW_PERIOD", 26)?,
            macd_signal_period: parse_usize("MACD_SIGNAL_PERIOD", 9)?,
            retention_window_seconds: parse_u64("RETENTION_WINDOW_SECONDS", 3600)?,
            retention_max_samples: parse_usize("RETENTION_MAX_SAMPLES", 2048)?,
            min_baseline_samples: parse_usize("MIN_BASELINE_SAMPLES", 5)?,
            default_universe: env::var("DEFAULT_UNIVERSE").unwrap_or_else(|_| "spot".to_string()),
            universes: env::var("UNIVERSES").unwrap_or_default(),
        })
    }
}
