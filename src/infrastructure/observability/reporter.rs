//! Push-based metrics reporter for Resonance
//!
//! Periodically outputs pipeline counters as structured JSON to stdout.

use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const TICK_OUTCOMES: [&str; 4] = ["accepted", "out_of_order", "duplicate", "malformed"];

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub ticks: TickSnapshot,
    pub detections: DetectionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TickSnapshot {
    pub accepted: u64,
    pub rejected: u64,
}

#[derive(Debug, Serialize)]
pub struct DetectionSnapshot {
    pub admitted: u64,
    pub suppressed: u64,
    pub tracked_keys: u64,
}

/// Outputs metrics as JSON lines on a fixed interval
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Ticks: {} accepted / {} rejected | Detections: {} admitted | Uptime: {}s",
                        snapshot.ticks.accepted,
                        snapshot.ticks.rejected,
                        snapshot.detections.admitted,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime as f64);

        let rejected: f64 = TICK_OUTCOMES[1..]
            .iter()
            .map(|outcome| self.metrics.tick_count(outcome))
            .sum();

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            ticks: TickSnapshot {
                accepted: self.metrics.tick_count(TICK_OUTCOMES[0]) as u64,
                rejected: rejected as u64,
            },
            detections: DetectionSnapshot {
                admitted: self.metrics.detection_count("admitted") as u64,
                suppressed: self.metrics.detection_count("suppressed") as u64,
                tracked_keys: self.metrics.dedup_keys.get() as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_collection() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_tick("accepted");
        metrics.record_tick("duplicate");
        metrics.record_tick("malformed");
        metrics.record_detection("admitted");
        let reporter = MetricsReporter::new(metrics, 60);

        let snapshot = reporter.collect_snapshot();
        assert_eq!(snapshot.ticks.accepted, 1);
        assert_eq!(snapshot.ticks.rejected, 2);
        assert_eq!(snapshot.detections.admitted, 1);
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = MetricsSnapshot {
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            uptime_seconds: 3600,
            version: "0.3.1".to_string(),
            ticks: TickSnapshot {
                accepted: 5000,
                rejected: 3,
            },
            detections: DetectionSnapshot {
                admitted: 7,
                suppressed: 40,
                tracked_keys: 12,
            },
        };

        let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
        assert!(json.contains("\"accepted\":5000"));
        assert!(json.contains("\"suppressed\":40"));
    }
}
