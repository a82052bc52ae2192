use thiserror::Error;

/// Configuration problems detected at startup, before any tick is processed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid threshold {name}: {value} ({reason})")]
    InvalidThreshold {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid period {name}: {value} (must be > 0)")]
    InvalidPeriod { name: &'static str, value: usize },

    #[error("MACD fast period {fast} must be shorter than slow period {slow}")]
    MacdPeriodOrder { fast: usize, slow: usize },

    #[error("Invalid duration {name}: must be greater than zero")]
    InvalidDuration { name: &'static str },

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Sink {sink} is enabled but {missing} is not configured")]
    IncompleteSink {
        sink: &'static str,
        missing: &'static str,
    },

    #[error("Indicator setup failed: {reason}")]
    Indicator { reason: String },
}

/// Ticks dropped at the ingestion boundary. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickRejection {
    #[error("Out-of-order tick for {key}: {timestamp} < last accepted {last}")]
    OutOfOrder {
        key: String,
        timestamp: i64,
        last: i64,
    },

    #[error("Duplicate tick for {key} at {timestamp}")]
    Duplicate { key: String, timestamp: i64 },

    #[error("Malformed tick for {pair}: {reason}")]
    Malformed { pair: String, reason: String },
}

impl TickRejection {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TickRejection::OutOfOrder { .. } => "out_of_order",
            TickRejection::Duplicate { .. } => "duplicate",
            TickRejection::Malformed { .. } => "malformed",
        }
    }
}

/// Failures raised by storage and alert sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rejected by remote endpoint (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<csv::Error> for SinkError {
    fn from(err: csv::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

/// Engine-level failures; each indicates a defect
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Lane {lane} is no longer accepting ticks")]
    LaneUnavailable { lane: usize },

    #[error("Lane {lane} terminated abnormally: {reason}")]
    LaneFailed { lane: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_formatting() {
        let err = ConfigError::MacdPeriodOrder { fast: 26, slow: 12 };
        let msg = err.to_string();
        assert!(msg.contains("26"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_tick_rejection_kind() {
        let rejection = TickRejection::OutOfOrder {
            key: "BTC-USD/1m".to_string(),
            timestamp: 10,
            last: 20,
        };
        assert_eq!(rejection.kind(), "out_of_order");
        assert!(rejection.to_string().contains("BTC-USD/1m"));
    }

    #[test]
    fn test_sink_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SinkError = json_err.into();
        assert!(matches!(err, SinkError::Serialization(_)));
    }
}
