use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval a tick was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMin,
    #[serde(rename = "3m")]
    ThreeMin,
    #[serde(rename = "5m")]
    FiveMin,
    #[serde(rename = "15m")]
    FifteenMin,
    #[serde(rename = "30m")]
    ThirtyMin,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    /// Returns the duration of this interval in minutes
    pub fn to_minutes(&self) -> usize {
        match self {
            Interval::OneMin => 1,
            Interval::ThreeMin => 3,
            Interval::FiveMin => 5,
            Interval::FifteenMin => 15,
            Interval::ThirtyMin => 30,
            Interval::OneHour => 60,
            Interval::FourHour => 240,
            Interval::OneDay => 1440,
        }
    }

    /// Returns the duration in milliseconds
    pub fn to_millis(&self) -> i64 {
        (self.to_minutes() * 60 * 1000) as i64
    }

    /// Exchange-style label ("1m", "4h", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMin => "1m",
            Interval::ThreeMin => "3m",
            Interval::FiveMin => "5m",
            Interval::FifteenMin => "15m",
            Interval::ThirtyMin => "30m",
            Interval::OneHour => "1h",
            Interval::FourHour => "4h",
            Interval::OneDay => "1d",
        }
    }

    /// Returns all intervals in ascending order
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::OneMin,
            Interval::ThreeMin,
            Interval::FiveMin,
            Interval::FifteenMin,
            Interval::ThirtyMin,
            Interval::OneHour,
            Interval::FourHour,
            Interval::OneDay,
        ]
    }

    /// Returns the start timestamp (ms) of the bucket containing `timestamp_ms`.
    ///
    /// Daily buckets start at midnight UTC; every other interval divides the
    /// day evenly, so flooring on the epoch is enough.
    pub fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms - timestamp_ms.rem_euclid(self.to_millis())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" => Ok(Interval::OneMin),
            "3m" | "3min" => Ok(Interval::ThreeMin),
            "5m" | "5min" => Ok(Interval::FiveMin),
            "15m" | "15min" => Ok(Interval::FifteenMin),
            "30m" | "30min" => Ok(Interval::ThirtyMin),
            "1h" | "1hour" => Ok(Interval::OneHour),
            "4h" | "4hour" => Ok(Interval::FourHour),
            "1d" | "1day" => Ok(Interval::OneDay),
            _ => Err(anyhow!(
                "Invalid interval: '{}'. Valid options: 1m, 3m, 5m, 15m, 30m, 1h, 4h, 1d",
                s
            )),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Interval::OneMin.to_minutes(), 1);
        assert_eq!(Interval::FifteenMin.to_minutes(), 15);
        assert_eq!(Interval::FourHour.to_minutes(), 240);
        assert_eq!(Interval::OneDay.to_minutes(), 1440);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Interval::from_str("1m").unwrap(), Interval::OneMin);
        assert_eq!(Interval::from_str("1Min").unwrap(), Interval::OneMin);
        assert_eq!(Interval::from_str("4H").unwrap(), Interval::FourHour);
        assert!(Interval::from_str("2m").is_err());
    }

    #[test]
    fn test_label_roundtrip() {
        for interval in Interval::all() {
            assert_eq!(Interval::from_str(interval.as_str()).unwrap(), interval);
            let json = serde_json::to_string(&interval).unwrap();
            assert_eq!(json, format!("\"{}\"", interval.as_str()));
        }
    }

    #[test]
    fn test_bucket_start() {
        let tf = Interval::FiveMin;
        // 2024-01-01 00:00:00 UTC
        let base = 1704067200000i64;

        assert_eq!(tf.bucket_start(base), base);
        assert_eq!(tf.bucket_start(base + 3 * 60 * 1000), base);
        assert_eq!(tf.bucket_start(base + 5 * 60 * 1000), base + 5 * 60 * 1000);
        assert_eq!(tf.bucket_start(base + 7 * 60 * 1000), base + 5 * 60 * 1000);
        assert_eq!(Interval::OneDay.bucket_start(base + 3_600_000), base);
    }
}
