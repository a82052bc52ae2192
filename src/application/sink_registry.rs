use crate::domain::detection::{Detection, DetectionId};
use crate::domain::errors::SinkError;
use crate::domain::ports::{AlertSink, StorageSink};
use crate::infrastructure::observability::Metrics;
use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Storage,
    Alert,
}

#[derive(Clone)]
enum SinkHandle {
    Storage(Arc<dyn StorageSink>),
    Alert(Arc<dyn AlertSink>),
}

impl SinkHandle {
    fn name(&self) -> &str {
        match self {
            SinkHandle::Storage(sink) => sink.name(),
            SinkHandle::Alert(sink) => sink.name(),
        }
    }

    fn kind(&self) -> SinkKind {
        match self {
            SinkHandle::Storage(_) => SinkKind::Storage,
            SinkHandle::Alert(_) => SinkKind::Alert,
        }
    }

    async fn deliver(&self, detection: &Detection) -> Result<(), SinkError> {
        match self {
            SinkHandle::Storage(sink) => sink.persist(detection).await,
            SinkHandle::Alert(sink) => sink.notify(detection).await,
        }
    }
}

/// Result of one sink call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SinkStatus {
    Delivered,
    Failed(String),
    TimedOut,
}

impl SinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SinkStatus::Delivered => "delivered",
            SinkStatus::Failed(_) => "failed",
            SinkStatus::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkOutcome {
    pub sink: String,
    pub kind: SinkKind,
    pub status: SinkStatus,
    pub elapsed_ms: u64,
}

impl SinkOutcome {
    pub fn is_success(&self) -> bool {
        self.status == SinkStatus::Delivered
    }
}

/// Per-sink outcomes of one dispatch, in registration order
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub detection_id: DetectionId,
    pub pair: String,
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &SinkOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SinkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(SinkOutcome::is_success)
    }

    pub fn outcome(&self, sink: &str) -> Option<&SinkOutcome> {
        self.outcomes.iter().find(|o| o.sink == sink)
    }
}

#[derive(Clone)]
struct RegisteredSink {
    handle: SinkHandle,
}

/// Ordered set of storage and alert sinks with isolated failure domains.
///
/// Every sink receives the same detection concurrently; each call is bounded
/// by the per-sink timeout and its error, timeout or panic is recorded in the
/// report instead of reaching the caller or sibling sinks.
#[derive(Clone)]
pub struct SinkRegistry {
    sinks: Vec<RegisteredSink>,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl SinkRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn register_storage(&mut self, sink: Arc<dyn StorageSink>) {
        debug!("SinkRegistry: registered storage sink '{}'", sink.name());
        self.sinks.push(RegisteredSink {
            handle: SinkHandle::Storage(sink),
        });
    }

    pub fn register_alert(&mut self, sink: Arc<dyn AlertSink>) {
        debug!("SinkRegistry: registered alert sink '{}'", sink.name());
        self.sinks.push(RegisteredSink {
            handle: SinkHandle::Alert(sink),
        });
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Sink names in registration order
    pub fn names(&self) -> Vec<String> {
        self.sinks
            .iter()
            .map(|s| s.handle.name().to_string())
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fan a detection out to every sink and wait for all of them
    pub async fn dispatch(&self, detection: &Detection) -> DispatchReport {
        let calls = self
            .sinks
            .iter()
            .map(|registered| self.call_sink(&registered.handle, detection));
        let outcomes = join_all(calls).await;

        DispatchReport {
            detection_id: detection.id.clone(),
            pair: detection.pair.clone(),
            outcomes,
        }
    }

    async fn call_sink(&self, handle: &SinkHandle, detection: &Detection) -> SinkOutcome {
        let started = Instant::now();
        let guarded = AssertUnwindSafe(handle.deliver(detection)).catch_unwind();

        let status = match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(Ok(()))) => SinkStatus::Delivered,
            Ok(Ok(Err(e))) => {
                warn!(
                    "Sink '{}' failed for {} ({}): {}",
                    handle.name(),
                    detection.pair,
                    detection.id,
                    e
                );
                SinkStatus::Failed(e.to_string())
            }
            Ok(Err(_panic)) => {
                warn!("Sink '{}' panicked while handling {}", handle.name(), detection.id);
                SinkStatus::Failed("sink panicked".to_string())
            }
            Err(_) => {
                warn!(
                    "Sink '{}' timed out after {:?} for {}",
                    handle.name(),
                    self.timeout,
                    detection.id
                );
                SinkStatus::TimedOut
            }
        };

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_sink(handle.name(), status.label(), elapsed.as_secs_f64());
        }

        SinkOutcome {
            sink: handle.name().to_string(),
            kind: handle.kind(),
            status,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}
