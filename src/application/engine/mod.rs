//! Ingestion loop: routes ticks to ordering lanes and drives
//! store -> evaluator -> deduplicator -> sinks for each of them.

mod lane;

pub use lane::LaneStats;

use crate::application::deduplicator::Deduplicator;
use crate::application::evaluator::BreakoutEvaluator;
use crate::application::rolling_store::{RollingIndicatorStore, WindowConfig};
use crate::application::sink_registry::{DispatchReport, SinkRegistry};
use crate::domain::detection::Thresholds;
use crate::domain::errors::{ConfigError, EngineError};
use crate::domain::market::{PairKey, Tick, UniverseMap};
use crate::infrastructure::observability::Metrics;
use lane::Lane;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

const REPORT_CHANNEL_CAPACITY: usize = 256;

/// Everything the engine needs, built once from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub window: WindowConfig,
    pub thresholds: Thresholds,
    pub universes: UniverseMap,
    pub cooldown: Duration,
    pub dedup_max_entries: Option<usize>,
    pub worker_count: usize,
    pub lane_capacity: usize,
    /// Detections a lane may have in dispatch before it stops taking ticks
    pub max_in_flight_dispatches: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            thresholds: Thresholds::default(),
            universes: UniverseMap::default(),
            cooldown: Duration::from_secs(300),
            dedup_max_entries: None,
            worker_count: 4,
            lane_capacity: 1024,
            max_in_flight_dispatches: 64,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.window.validate()?;
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.lane_capacity == 0 {
            return Err(ConfigError::InvalidPeriod {
                name: "lane_queue_capacity",
                value: 0,
            });
        }
        if self.max_in_flight_dispatches == 0 {
            return Err(ConfigError::InvalidPeriod {
                name: "max_inflight_dispatches",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Totals reported when the engine stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSummary {
    pub stats: LaneStats,
    /// Lanes still busy when the grace period expired
    pub aborted_lanes: usize,
}

/// The detection engine.
///
/// Ticks are partitioned over `worker_count` lanes by a hash of their
/// (pair, interval) key, so one key's ticks are always handled by the same
/// lane in arrival order while different keys proceed in parallel. The
/// deduplicator and the sink registry are the only state shared by lanes.
pub struct DetectionEngine {
    lanes: Vec<mpsc::Sender<Tick>>,
    handles: Vec<JoinHandle<LaneStats>>,
    reports: broadcast::Sender<DispatchReport>,
}

impl DetectionEngine {
    /// Validate settings and spawn the lanes. Must be called inside a Tokio runtime.
    pub fn start(
        settings: EngineSettings,
        registry: SinkRegistry,
        metrics: Option<Metrics>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let evaluator = Arc::new(BreakoutEvaluator::new(
            settings.thresholds,
            settings.universes.clone(),
        ));
        let dedup = Arc::new(Deduplicator::new(
            settings.cooldown,
            settings.dedup_max_entries,
        ));
        let registry = Arc::new(registry);
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);

        let mut lanes = Vec::with_capacity(settings.worker_count);
        let mut handles = Vec::with_capacity(settings.worker_count);
        for id in 0..settings.worker_count {
            let (tx, rx) = mpsc::channel(settings.lane_capacity);
            let lane = Lane {
                id,
                store: RollingIndicatorStore::new(settings.window.clone())?,
                evaluator: evaluator.clone(),
                dedup: dedup.clone(),
                registry: registry.clone(),
                reports: reports.clone(),
                metrics: metrics.clone(),
                stats: LaneStats::default(),
                max_in_flight: settings.max_in_flight_dispatches,
                dispatches: JoinSet::new(),
            };
            lanes.push(tx);
            handles.push(tokio::spawn(lane.run(rx)));
        }

        info!(
            "DetectionEngine: started {} lanes ({} sinks, cooldown {:?})",
            settings.worker_count,
            registry.len(),
            settings.cooldown
        );

        Ok(Self {
            lanes,
            handles,
            reports,
        })
    }

    /// Lane index for a key; stable for the lifetime of the engine
    pub fn lane_for(&self, key: &PairKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    /// Single ingestion entry point. Waits for room in the lane queue.
    pub async fn ingest(&self, tick: Tick) -> Result<(), EngineError> {
        let lane = self.lane_for(&tick.key());
        self.lanes[lane]
            .send(tick)
            .await
            .map_err(|_| EngineError::LaneUnavailable { lane })
    }

    /// Pump a feed into the engine until it ends or shutdown is signalled.
    ///
    /// The signal also interrupts a send blocked on a full lane queue; the
    /// tick being sent at that moment is dropped.
    pub async fn run(
        &self,
        mut feed: mpsc::Receiver<Tick>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<u64, EngineError> {
        let mut forwarded = 0u64;
        loop {
            let tick = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                maybe_tick = feed.recv() => match maybe_tick {
                    Some(tick) => tick,
                    None => {
                        info!("DetectionEngine: feed ended after {} ticks", forwarded);
                        return Ok(forwarded);
                    }
                },
            };
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                sent = self.ingest(tick) => {
                    sent?;
                    forwarded += 1;
                }
            }
        }
        info!(
            "DetectionEngine: shutdown signalled, ingestion stopped after {} ticks",
            forwarded
        );
        Ok(forwarded)
    }

    /// Observe every DispatchReport produced from now on
    pub fn subscribe_reports(&self) -> broadcast::Receiver<DispatchReport> {
        self.reports.subscribe()
    }

    /// Close the lanes and let them drain queued work and in-flight
    /// dispatches. Lanes still running when `grace` expires are aborted,
    /// which also cancels their pending dispatches.
    pub async fn shutdown(self, grace: Duration) -> Result<EngineSummary, EngineError> {
        let Self { lanes, handles, .. } = self;
        drop(lanes);

        let deadline = tokio::time::Instant::now() + grace;
        let mut summary = EngineSummary::default();
        let mut failure = None;

        for (lane, mut handle) in handles.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(stats)) => summary.stats += stats,
                Ok(Err(join_err)) => {
                    error!("DetectionEngine: lane {} failed: {}", lane, join_err);
                    failure.get_or_insert(EngineError::LaneFailed {
                        lane,
                        reason: join_err.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        "DetectionEngine: lane {} still busy after {:?} grace, aborting",
                        lane, grace
                    );
                    handle.abort();
                    summary.aborted_lanes += 1;
                }
            }
        }

        info!(
            "DetectionEngine: stopped | {} ticks accepted, {} rejected, {} detections admitted, {} suppressed",
            summary.stats.ticks_accepted,
            summary.stats.ticks_rejected,
            summary.stats.admitted,
            summary.stats.suppressed
        );

        match failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

/// Resolves once the signal reads `true`; never, if its owner is gone
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Interval;
    use crate::infrastructure::mock::MockStorageSink;

    fn settings(workers: usize) -> EngineSettings {
        EngineSettings {
            worker_count: workers,
            ..EngineSettings::default()
        }
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let result = DetectionEngine::start(settings(0), SinkRegistry::new(Duration::from_secs(1)), None);
        assert!(matches!(result, Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_zero_dispatch_slots_rejected() {
        let settings = EngineSettings {
            max_in_flight_dispatches: 0,
            ..EngineSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidPeriod {
                name: "max_inflight_dispatches",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_key_routing_is_stable() {
        let engine =
            DetectionEngine::start(settings(8), SinkRegistry::new(Duration::from_secs(1)), None)
                .unwrap();
        let key = PairKey::new("BTC-USD", Interval::OneMin);
        let lane = engine.lane_for(&key);
        for _ in 0..10 {
            assert_eq!(engine.lane_for(&key), lane);
        }
        assert!(lane < 8);
        engine.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejections_are_counted_not_fatal() {
        let mut registry = SinkRegistry::new(Duration::from_secs(1));
        registry.register_storage(Arc::new(MockStorageSink::new("store")));
        let engine = DetectionEngine::start(settings(2), registry, None).unwrap();

        engine
            .ingest(Tick::new("BTC-USD", Interval::OneMin, 2_000, 100.0, 1.0))
            .await
            .unwrap();
        engine
            .ingest(Tick::new("BTC-USD", Interval::OneMin, 1_000, 100.0, 1.0))
            .await
            .unwrap();
        engine
            .ingest(Tick::new("BTC-USD", Interval::OneMin, 3_000, -1.0, 1.0))
            .await
            .unwrap();
        engine
            .ingest(Tick::new("BTC-USD", Interval::OneMin, 3_000, 101.0, 1.0))
            .await
            .unwrap();

        let summary = engine.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(summary.stats.ticks_accepted, 2);
        assert_eq!(summary.stats.ticks_rejected, 2);
        assert_eq!(summary.aborted_lanes, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let engine =
            DetectionEngine::start(settings(1), SinkRegistry::new(Duration::from_secs(1)), None)
                .unwrap();
        let (_feed_tx, feed_rx) = mpsc::channel::<Tick>(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        stop_tx.send(true).unwrap();
        let forwarded = engine.run(feed_rx, stop_rx).await.unwrap();
        assert_eq!(forwarded, 0);
        engine.shutdown(Duration::from_secs(1)).await.unwrap();
    }
}
