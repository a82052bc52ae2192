use crate::domain::errors::TickRejection;
use crate::domain::market::interval::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One normalized price/volume observation from the feed.
///
/// `base_volume` and `quote_volume` cover the tick's interval (kline-style
/// running volume). When the feed only reports base volume the quote side is
/// approximated as `price * base_volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub pair: String,
    pub interval: Interval,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub price: f64,
    pub base_volume: f64,
    #[serde(default)]
    pub quote_volume: Option<f64>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "feed".to_string()
}

impl Tick {
    pub fn new(
        pair: impl Into<String>,
        interval: Interval,
        timestamp: i64,
        price: f64,
        base_volume: f64,
    ) -> Self {
        Self {
            pair: pair.into(),
            interval,
            timestamp,
            price,
            base_volume,
            quote_volume: None,
            source: default_source(),
        }
    }

    pub fn with_quote_volume(mut self, quote_volume: f64) -> Self {
        self.quote_volume = Some(quote_volume);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.pair, self.interval)
    }

    /// Traded quote volume (USD for USD-quoted pairs)
    pub fn quote_flow(&self) -> f64 {
        self.quote_volume.unwrap_or(self.price * self.base_volume)
    }

    /// Quote flow normalized to a one-minute rate
    pub fn usd_per_min(&self) -> f64 {
        self.quote_flow() / self.interval.to_minutes() as f64
    }

    /// Reject ticks the indicator state must never see
    pub fn validate(&self) -> Result<(), TickRejection> {
        let malformed = |reason: &str| TickRejection::Malformed {
            pair: self.pair.clone(),
            reason: reason.to_string(),
        };

        if self.pair.trim().is_empty() {
            return Err(malformed("empty pair"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(malformed("price must be finite and positive"));
        }
        if !self.base_volume.is_finite() || self.base_volume < 0.0 {
            return Err(malformed("base volume must be finite and non-negative"));
        }
        if let Some(quote) = self.quote_volume
            && (!quote.is_finite() || quote < 0.0)
        {
            return Err(malformed("quote volume must be finite and non-negative"));
        }
        if self.timestamp < 0 {
            return Err(malformed("negative timestamp"));
        }
        Ok(())
    }
}

/// Ordering lane identity: one (pair, interval) stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub pair: String,
    pub interval: Interval,
}

impl PairKey {
    pub fn new(pair: &str, interval: Interval) -> Self {
        Self {
            pair: pair.to_string(),
            interval,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pair, self.interval)
    }
}
