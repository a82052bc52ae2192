//! Engine configuration parsing from environment variables.
//!
//! Worker concurrency, lane queue sizing, sink timeout, shutdown grace and
//! the tick source.

use super::{parse_u64, parse_usize};
use anyhow::Result;
use std::env;

/// Engine environment configuration
#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub worker_count: usize,
    pub lane_queue_capacity: usize,
    pub sink_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    /// Per-lane bound on detections being dispatched concurrently
    pub max_inflight_dispatches: usize,
    /// JSONL tick file, or `-` for stdin
    pub tick_source: String,
}

impl EngineEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            worker_count: parse_usize("WORKER_COUNT", 4)?,
            lane_queue_capacity: parse_usize("LANE_QUEUE_CAPACITY", 1024)?,
            sink_timeout_ms: parse_u64("SINK_TIMEOUT_MS", 5000)?,
            shutdown_grace_ms: parse_u64("SHUTDOWN_GRACE_MS", 10_000)?,
            max_inflight_dispatches: parse_usize("MAX_INFLIGHT_DISPATCHES", 64)?,
            tick_source: env::var("TICK_SOURCE").unwrap_or_else(|_| "-".to_string()),
        })
    }
}
