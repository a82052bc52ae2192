use crate::domain::market::Tick;
use crate::domain::ports::TickFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickSource {
    File(PathBuf),
    Stdin,
}

impl TickSource {
    /// `-` selects stdin, anything else is a file path
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "-" | "" => TickSource::Stdin,
            path => TickSource::File(PathBuf::from(path)),
        }
    }
}

/// Replays newline-delimited JSON ticks from a file or stdin.
///
/// Lines that do not parse as a tick are logged, counted and skipped.
pub struct JsonlTickFeed {
    source: TickSource,
    capacity: usize,
    skipped: Arc<AtomicU64>,
}

impl JsonlTickFeed {
    pub fn new(source: TickSource, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Lines skipped so far because they were not valid ticks
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    async fn pump<R>(reader: R, tx: Sender<Tick>, skipped: Arc<AtomicU64>)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut line_no = 0u64;
        let mut sent = 0u64;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("JsonlTickFeed: read failed after line {}: {}", line_no, e);
                    break;
                }
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Tick>(&line) {
                Ok(tick) => {
                    if tx.send(tick).await.is_err() {
                        // Receiver dropped: the engine is shutting down
                        break;
                    }
                    sent += 1;
                }
                Err(e) => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    warn!("JsonlTickFeed: skipping line {}: {}", line_no, e);
                }
            }
        }
        info!(
            "JsonlTickFeed: replay finished ({} ticks, {} skipped)",
            sent,
            skipped.load(Ordering::Relaxed)
        );
    }
}

#[async_trait]
impl TickFeed for JsonlTickFeed {
    async fn subscribe(&self) -> Result<Receiver<Tick>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let skipped = self.skipped.clone();

        match &self.source {
            TickSource::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open tick file {:?}", path))?;
                info!("JsonlTickFeed: replaying {:?}", path);
                tokio::spawn(Self::pump(file, tx, skipped));
            }
            TickSource::Stdin => {
                info!("JsonlTickFeed: reading ticks from stdin");
                tokio::spawn(Self::pump(tokio::io::stdin(), tx, skipped));
            }
        }
        Ok(rx)
    }
}
