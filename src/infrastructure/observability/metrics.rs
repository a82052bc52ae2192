//! Prometheus metrics definitions for Resonance
//!
//! All metrics use the `resonance_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the detection pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Ticks seen by the engine, by outcome (accepted or rejection kind)
    pub ticks_total: CounterVec,
    /// Breakout candidates, by deduplication outcome
    pub detections_total: CounterVec,
    /// Sink calls by sink and status
    pub sink_dispatch_total: CounterVec,
    /// Sink call latency in seconds
    pub sink_latency_seconds: HistogramVec,
    /// Keys currently held by the deduplicator
    pub dedup_keys: GenericGauge<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_total = CounterVec::new(
            Opts::new("resonance_ticks_total", "Ticks processed by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let detections_total = CounterVec::new(
            Opts::new(
                "resonance_detections_total",
                "Breakout candidates by deduplication outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(detections_total.clone()))?;

        let sink_dispatch_total = CounterVec::new(
            Opts::new(
                "resonance_sink_dispatch_total",
                "Sink calls by sink and status",
            ),
            &["sink", "status"],
        )?;
        registry.register(Box::new(sink_dispatch_total.clone()))?;

        let sink_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "resonance_sink_latency_seconds",
                "Sink call latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["sink"],
        )?;
        registry.register(Box::new(sink_latency_seconds.clone()))?;

        let dedup_keys = Gauge::with_opts(Opts::new(
            "resonance_dedup_keys",
            "Keys tracked by the deduplicator",
        ))?;
        registry.register(Box::new(dedup_keys.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "resonance_uptime_seconds",
            "Process uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_total,
            detections_total,
            sink_dispatch_total,
            sink_latency_seconds,
            dedup_keys,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_tick(&self, outcome: &str) {
        self.ticks_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_detection(&self, outcome: &str) {
        self.detections_total.with_label_values(&[outcome]).inc();
    }

    /// Count a sink call and observe its latency
    pub fn record_sink(&self, sink: &str, status: &str, latency: f64) {
        self.sink_dispatch_total
            .with_label_values(&[sink, status])
            .inc();
        self.sink_latency_seconds
            .with_label_values(&[sink])
            .observe(latency);
    }

    pub fn tick_count(&self, outcome: &str) -> f64 {
        self.ticks_total.with_label_values(&[outcome]).get()
    }

    pub fn detection_count(&self, outcome: &str) -> f64 {
        self.detections_total.with_label_values(&[outcome]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.uptime_seconds.set(1.0);
        assert!(metrics.render().contains("resonance_"));
    }

    #[test]
    fn test_tick_and_detection_counters() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_tick("accepted");
        metrics.record_tick("accepted");
        metrics.record_tick("out_of_order");
        metrics.record_detection("admitted");

        assert_eq!(metrics.tick_count("accepted"), 2.0);
        assert_eq!(metrics.tick_count("out_of_order"), 1.0);
        assert_eq!(metrics.detection_count("admitted"), 1.0);
    }

    #[test]
    fn test_sink_metrics_rendered_per_sink() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_sink("csv", "delivered", 0.002);
        metrics.record_sink("discord", "timed_out", 5.0);
        let output = metrics.render();
        assert!(output.contains("resonance_sink_dispatch_total"));
        assert!(output.contains("discord"));
        assert!(output.contains("timed_out"));
    }
}
