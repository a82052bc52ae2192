use crate::domain::detection::Detection;
use crate::domain::errors::SinkError;
use crate::domain::market::Tick;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// Durable destination for detections (file, log, table).
///
/// Implementations must tolerate concurrent calls from several lanes.
#[async_trait]
pub trait StorageSink: Send + Sync {
    fn name(&self) -> &str;
    async fn persist(&self, detection: &Detection) -> Result<(), SinkError>;
}

/// Human-facing alert channel.
///
/// `Ok` only means the channel accepted the message; delivery to a reader
/// is not confirmed.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, detection: &Detection) -> Result<(), SinkError>;
}

/// Upstream collaborator producing normalized ticks
#[async_trait]
pub trait TickFeed: Send + Sync {
    async fn subscribe(&self) -> Result<Receiver<Tick>>;
}
