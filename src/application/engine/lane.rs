use crate::application::deduplicator::Deduplicator;
use crate::application::evaluator::BreakoutEvaluator;
use crate::application::rolling_store::RollingIndicatorStore;
use crate::application::sink_registry::{DispatchReport, SinkRegistry};
use crate::domain::errors::TickRejection;
use crate::domain::market::Tick;
use crate::infrastructure::observability::Metrics;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Per-lane counters, summed into the engine summary at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneStats {
    pub ticks_accepted: u64,
    pub ticks_rejected: u64,
    pub candidates: u64,
    pub admitted: u64,
    pub suppressed: u64,
    pub dispatch_failures: u64,
}

impl AddAssign for LaneStats {
    fn add_assign(&mut self, rhs: Self) {
        self.ticks_accepted += rhs.ticks_accepted;
        self.ticks_rejected += rhs.ticks_rejected;
        self.candidates += rhs.candidates;
        self.admitted += rhs.admitted;
        self.suppressed += rhs.suppressed;
        self.dispatch_failures += rhs.dispatch_failures;
    }
}

enum LaneEvent {
    Tick(Tick),
    Dispatched(Result<DispatchReport, JoinError>),
    Closed,
}

/// One ordering lane. Owns the rolling state of every key hashed to it and
/// processes that lane's ticks strictly in arrival order.
///
/// Sink dispatch runs off the ordering path in `dispatches`, at most
/// `max_in_flight` at a time, so a slow sink only holds up this lane once
/// that many detections are waiting on it.
pub(crate) struct Lane {
    pub(crate) id: usize,
    pub(crate) store: RollingIndicatorStore,
    pub(crate) evaluator: Arc<BreakoutEvaluator>,
    pub(crate) dedup: Arc<Deduplicator>,
    pub(crate) registry: Arc<SinkRegistry>,
    pub(crate) reports: broadcast::Sender<DispatchReport>,
    pub(crate) metrics: Option<Metrics>,
    pub(crate) stats: LaneStats,
    pub(crate) max_in_flight: usize,
    pub(crate) dispatches: JoinSet<DispatchReport>,
}

impl Lane {
    /// Consume ticks until every sender is dropped, wait for in-flight
    /// dispatches, then report counters
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Tick>) -> LaneStats {
        debug!("Lane {}: started", self.id);
        loop {
            let event = tokio::select! {
                maybe_tick = rx.recv() => match maybe_tick {
                    Some(tick) => LaneEvent::Tick(tick),
                    None => LaneEvent::Closed,
                },
                Some(joined) = self.dispatches.join_next(), if !self.dispatches.is_empty() => {
                    LaneEvent::Dispatched(joined)
                }
            };
            match event {
                LaneEvent::Tick(tick) => self.process(tick).await,
                LaneEvent::Dispatched(joined) => self.complete(joined),
                LaneEvent::Closed => break,
            }
        }

        if !self.dispatches.is_empty() {
            debug!(
                "Lane {}: waiting on {} in-flight dispatches",
                self.id,
                self.dispatches.len()
            );
        }
        while let Some(joined) = self.dispatches.join_next().await {
            self.complete(joined);
        }
        debug!(
            "Lane {}: drained ({} keys, {} ticks accepted)",
            self.id,
            self.store.key_count(),
            self.stats.ticks_accepted
        );
        self.stats
    }

    async fn process(&mut self, tick: Tick) {
        let snapshot = match self.store.update(&tick) {
            Ok(snapshot) => snapshot,
            Err(rejection) => {
                self.reject(&rejection);
                return;
            }
        };
        self.stats.ticks_accepted += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_tick("accepted");
        }

        let Some(detection) = self
            .evaluator
            .evaluate(&tick, &snapshot, snapshot.baseline())
        else {
            return;
        };
        self.stats.candidates += 1;

        if !self.dedup.admit(&detection) {
            self.stats.suppressed += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_detection("suppressed");
            }
            return;
        }
        self.stats.admitted += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_detection("admitted");
            metrics.dedup_keys.set(self.dedup.len() as f64);
        }

        info!(
            "Breakout {} {} @ {} | +{:.2}% | vol x{:.2} | ${:.0}/min [{}]",
            detection.pair,
            detection.interval,
            detection.price,
            detection.pct_over_percent(),
            detection.metrics.vol_ratio,
            detection.metrics.usd_per_min,
            detection.id
        );

        while self.dispatches.len() >= self.max_in_flight {
            match self.dispatches.join_next().await {
                Some(joined) => self.complete(joined),
                None => break,
            }
        }
        let registry = self.registry.clone();
        self.dispatches
            .spawn(async move { registry.dispatch(&detection).await });
    }

    fn complete(&mut self, joined: Result<DispatchReport, JoinError>) {
        let report = match joined {
            Ok(report) => report,
            Err(join_err) => {
                self.stats.dispatch_failures += 1;
                error!("Lane {}: dispatch task failed: {}", self.id, join_err);
                return;
            }
        };
        let failures = report.failed().count();
        if failures > 0 {
            self.stats.dispatch_failures += failures as u64;
            warn!(
                "Lane {}: {}/{} sinks failed for {}",
                self.id,
                failures,
                report.outcomes.len(),
                report.detection_id
            );
        }
        // No subscribers is fine
        let _ = self.reports.send(report);
    }

    fn reject(&mut self, rejection: &TickRejection) {
        self.stats.ticks_rejected += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_tick(rejection.kind());
        }
        match rejection {
            TickRejection::Duplicate { .. } => debug!("Lane {}: {}", self.id, rejection),
            _ => warn!("Lane {}: dropped tick: {}", self.id, rejection),
        }
    }
}
