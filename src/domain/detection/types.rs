use crate::domain::market::Interval;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identity of a detection: derived from (pair, interval, bucket start).
///
/// Two candidates for the same pair and interval inside the same interval
/// bucket always hash to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(String);

impl DetectionId {
    pub fn derive(pair: &str, interval: Interval, timestamp_ms: i64) -> Self {
        let bucket = interval.bucket_start(timestamp_ms);
        let mut hasher = Sha256::new();
        hasher.update(pair.as_bytes());
        hasher.update(b"|");
        hasher.update(interval.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(bucket.to_be_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    /// Wrap an id read back from storage
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signals computed for a single tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// (price - baseline) / baseline
    pub pct_over: f64,
    /// Tick volume over the rolling average volume
    pub vol_ratio: f64,
    /// Quote flow normalized to one minute
    pub usd_per_min: f64,
    /// `None` while the RSI is still warming up
    pub rsi: Option<f64>,
    /// Rolling average of usd_per_min over the retention window
    pub vpm_avg_usd: f64,
    /// `None` while the MACD is still warming up
    pub macd_hist: Option<f64>,
}

/// A confirmed breakout, passed by value to the deduplicator and the sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: DetectionId,
    /// Tick timestamp in milliseconds
    pub timestamp: i64,
    pub pair: String,
    pub interval: Interval,
    pub price: f64,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    pub universe: String,
    pub source: String,
}

impl Detection {
    pub fn detected_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }

    /// Breakout size in percent, for display
    pub fn pct_over_percent(&self) -> f64 {
        self.metrics.pct_over * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_deterministic_within_bucket() {
        let base = 1_704_067_200_000i64;
        let a = DetectionId::derive("BTC-USD", Interval::OneMin, base + 1_000);
        let b = DetectionId::derive("BTC-USD", Interval::OneMin, base + 59_000);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_id_differs_across_buckets_pairs_and_intervals() {
        let base = 1_704_067_200_000i64;
        let a = DetectionId::derive("BTC-USD", Interval::OneMin, base);
        assert_ne!(a, DetectionId::derive("BTC-USD", Interval::OneMin, base + 60_000));
        assert_ne!(a, DetectionId::derive("ETH-USD", Interval::OneMin, base));
        assert_ne!(a, DetectionId::derive("BTC-USD", Interval::FiveMin, base));
    }

    #[test]
    fn test_detection_json_is_flat() {
        let detection = Detection {
            id: DetectionId::derive("BTC-USD", Interval::OneMin, 0),
            timestamp: 0,
            pair: "BTC-USD".to_string(),
            interval: Interval::OneMin,
            price: 101.5,
            metrics: DerivedMetrics {
                pct_over: 0.05,
                vol_ratio: 3.0,
                usd_per_min: 120_000.0,
                rsi: Some(71.2),
                vpm_avg_usd: 40_000.0,
                macd_hist: None,
            },
            universe: "spot".to_string(),
            source: "test".to_string(),
        };

        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["interval"], "1m");
        assert_eq!(value["vol_ratio"], 3.0);
        assert!(value["macd_hist"].is_null());

        let back: Detection = serde_json::from_value(value).unwrap();
        assert_eq!(back, detection);
    }
}
