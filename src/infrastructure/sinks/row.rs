use crate::domain::detection::{DerivedMetrics, Detection, DetectionId};
use crate::domain::errors::SinkError;
use crate::domain::market::Interval;
use serde::{Deserialize, Serialize};

/// Flat storage shape shared by the CSV, JSONL and SQLite sinks.
///
/// Column order matches the `detections` table. `ingested_at` is stamped
/// by the sink at write time (Unix milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DetectionRow {
    pub id: String,
    pub ts: i64,
    pub pair: String,
    pub price: f64,
    pub interval: String,
    pub pct_over: f64,
    pub vol_ratio: f64,
    pub usd_per_min: f64,
    pub rsi: Option<f64>,
    pub vpm_avg_usd: f64,
    pub macd_hist: Option<f64>,
    pub source: String,
    pub universe: String,
    pub ingested_at: i64,
}

impl DetectionRow {
    pub fn from_detection(detection: &Detection, ingested_at: i64) -> Self {
        let m = &detection.metrics;
        Self {
            id: detection.id.as_str().to_string(),
            ts: detection.timestamp,
            pair: detection.pair.clone(),
            price: detection.price,
            interval: detection.interval.as_str().to_string(),
            pct_over: m.pct_over,
            vol_ratio: m.vol_ratio,
            usd_per_min: m.usd_per_min,
            rsi: m.rsi,
            vpm_avg_usd: m.vpm_avg_usd,
            macd_hist: m.macd_hist,
            source: detection.source.clone(),
            universe: detection.universe.clone(),
            ingested_at,
        }
    }

    /// Rebuild the domain value; fails only on an unknown interval label
    pub fn into_detection(self) -> Result<Detection, SinkError> {
        let interval: Interval = self
            .interval
            .parse()
            .map_err(|e: anyhow::Error| SinkError::Serialization(e.to_string()))?;

        Ok(Detection {
            id: DetectionId::from_stored(self.id),
            timestamp: self.ts,
            pair: self.pair,
            interval,
            price: self.price,
            metrics: DerivedMetrics {
                pct_over: self.pct_over,
                vol_ratio: self.vol_ratio,
                usd_per_min: self.usd_per_min,
                rsi: self.rsi,
                vpm_avg_usd: self.vpm_avg_usd,
                macd_hist: self.macd_hist,
            },
            universe: self.universe,
            source: self.source,
        })
    }
}

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::sample_detection;

    #[test]
    fn test_unknown_interval_is_a_serialization_error() {
        let mut row = DetectionRow::from_detection(&sample_detection("BTC-USD", 0), 1);
        row.interval = "7m".to_string();
        assert!(matches!(
            row.into_detection(),
            Err(SinkError::Serialization(_))
        ));
    }

    #[test]
    fn test_row_preserves_detection() {
        let detection = sample_detection("SOL-USD", 120_000);
        let row = DetectionRow::from_detection(&detection, 42);
        assert_eq!(row.ingested_at, 42);
        assert_eq!(row.interval, "1m");
        assert_eq!(row.into_detection().unwrap(), detection);
    }
}
