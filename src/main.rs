//! Resonance - headless breakout detection engine
//!
//! Reads normalized ticks as JSON lines (file or stdin), detects breakouts
//! and fans each detection out to the enabled storage and alert sinks.
//!
//! # Usage
//! ```sh
//! TICK_SOURCE=data/ticks.jsonl cargo run --bin resonance
//! ```
//!
//! # Environment Variables
//! - `TICK_SOURCE` - JSONL tick file, `-` for stdin (default: `-`)
//! - `SINK_SETTINGS_PATH` - Sink toggle file (default: `sinks.json`)
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use resonance::application::engine::DetectionEngine;
use resonance::config::Config;
use resonance::domain::ports::TickFeed;
use resonance::infrastructure::feed::{JsonlTickFeed, TickSource};
use resonance::infrastructure::observability::{Metrics, MetricsReporter};
use resonance::infrastructure::sinks::SinkFactory;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Resonance {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }
    info!(
        "Configuration loaded: workers={}, cooldown={}s, sink file={:?}",
        config.engine.worker_count,
        config.detection.cooldown_seconds,
        config.sink_settings_path
    );

    let metrics = Metrics::new()?;
    if config.observability.enabled {
        let reporter = MetricsReporter::new(metrics.clone(), config.observability.interval_seconds);
        tokio::spawn(reporter.run());
        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    let registry =
        SinkFactory::build_registry(&config.sinks, config.sink_timeout(), Some(metrics.clone()))
            .await?;
    let engine = DetectionEngine::start(config.engine_settings(), registry, Some(metrics))?;

    let feed = JsonlTickFeed::new(
        TickSource::parse(&config.engine.tick_source),
        config.engine.lane_queue_capacity,
    );
    let ticks = feed.subscribe().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Draining...");
            let _ = shutdown_tx.send(true);
        }
    });

    let forwarded = match engine.run(ticks, shutdown_rx).await {
        Ok(count) => count,
        Err(e) => {
            error!("Ingestion stopped: {}", e);
            0
        }
    };
    if feed.skipped() > 0 {
        warn!("{} malformed feed lines were skipped", feed.skipped());
    }

    let summary = engine.shutdown(config.shutdown_grace()).await?;
    info!(
        "Resonance stopped: {} ticks forwarded, {} accepted, {} rejected, {} detections, {} suppressed, {} dispatch failures, {} lanes aborted",
        forwarded,
        summary.stats.ticks_accepted,
        summary.stats.ticks_rejected,
        summary.stats.admitted,
        summary.stats.suppressed,
        summary.stats.dispatch_failures,
        summary.aborted_lanes
    );

    Ok(())
}
