//! Test doubles for sinks, feeds and remote HTTP endpoints

use crate::domain::detection::{DerivedMetrics, Detection, DetectionId};
use crate::domain::errors::SinkError;
use crate::domain::market::{Interval, Tick};
use crate::domain::ports::{AlertSink, StorageSink, TickFeed};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver};

/// A detection with plausible metrics, id derived from (pair, 1m, ts)
pub fn sample_detection(pair: &str, timestamp: i64) -> Detection {
    Detection {
        id: DetectionId::derive(pair, Interval::OneMin, timestamp),
        timestamp,
        pair: pair.to_string(),
        interval: Interval::OneMin,
        price: 101.234_567_891_234,
        metrics: DerivedMetrics {
            pct_over: 0.041_234_567_890_123,
            vol_ratio: 3.141_592_653_589_793,
            usd_per_min: 123_456.789_012_345,
            rsi: Some(61.803_398_874_989),
            vpm_avg_usd: 45_678.901_234_567,
            macd_hist: None,
        },
        universe: "spot".to_string(),
        source: "mock".to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Behavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// Shared recording + failure injection for the mock sinks
#[derive(Default)]
struct MockCore {
    behavior: Behavior,
    delay: Option<Duration>,
    received: Mutex<Vec<Detection>>,
}

impl MockCore {
    async fn handle(&self, name: &str, detection: &Detection) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.behavior {
            Behavior::Succeed => {
                self.received
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(detection.clone());
                Ok(())
            }
            Behavior::Fail => Err(SinkError::Http(format!("{} unavailable", name))),
            Behavior::Panic => panic!("{} exploded", name),
        }
    }

    fn received(&self) -> Vec<Detection> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

pub struct MockStorageSink {
    name: String,
    core: MockCore,
}

impl MockStorageSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            core: MockCore::default(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.core.behavior = Behavior::Fail;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.core.behavior = Behavior::Panic;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.core.delay = Some(delay);
        self
    }

    pub fn received(&self) -> Vec<Detection> {
        self.core.received()
    }
}

#[async_trait]
impl StorageSink for MockStorageSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn persist(&self, detection: &Detection) -> Result<(), SinkError> {
        self.core.handle(&self.name, detection).await
    }
}

pub struct MockAlertSink {
    name: String,
    core: MockCore,
}

impl MockAlertSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            core: MockCore::default(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.core.behavior = Behavior::Fail;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.core.delay = Some(delay);
        self
    }

    pub fn received(&self) -> Vec<Detection> {
        self.core.received()
    }
}

#[async_trait]
impl AlertSink for MockAlertSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, detection: &Detection) -> Result<(), SinkError> {
        self.core.handle(&self.name, detection).await
    }
}

/// Feed that replays a fixed list of ticks, then closes
pub struct MockTickFeed {
    ticks: Arc<Vec<Tick>>,
}

impl MockTickFeed {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self {
            ticks: Arc::new(ticks),
        }
    }
}

#[async_trait]
impl TickFeed for MockTickFeed {
    async fn subscribe(&self) -> Result<Receiver<Tick>> {
        let (tx, rx) = mpsc::channel(64);
        let ticks = self.ticks.clone();
        tokio::spawn(async move {
            for tick in ticks.iter() {
                if tx.send(tick.clone()).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Minimal HTTP endpoint answering every request with `status`.
///
/// Returns the base URL and a channel carrying each raw request.
pub async fn spawn_http_stub(status: u16) -> Result<(String, UnboundedReceiver<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await.unwrap_or_default();
                let _ = tx.send(request);

                let body = "{}";
                let response = format!(
                    "HTTP/1.1 {} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Ok((format!("http://{}", addr), rx))
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
