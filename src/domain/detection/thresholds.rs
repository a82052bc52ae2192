use crate::domain::detection::types::DerivedMetrics;
use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Breakout gate. Every configured threshold must hold for the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum (price - baseline) / baseline, as a fraction
    pub min_pct_over: f64,
    pub min_vol_ratio: f64,
    pub min_usd_per_min: f64,
    /// Optional overbought ceiling
    pub max_rsi: Option<f64>,
    /// Optional momentum floor
    pub min_macd_hist: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_pct_over: 0.03,
            min_vol_ratio: 2.0,
            min_usd_per_min: 50_000.0,
            max_rsi: None,
            min_macd_hist: None,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, value, reason| ConfigError::InvalidThreshold {
            name,
            value,
            reason,
        };

        if !self.min_pct_over.is_finite() {
            return Err(invalid("min_pct_over", self.min_pct_over, "must be finite"));
        }
        if !self.min_vol_ratio.is_finite() || self.min_vol_ratio < 0.0 {
            return Err(invalid(
                "min_vol_ratio",
                self.min_vol_ratio,
                "must be finite and non-negative",
            ));
        }
        if !self.min_usd_per_min.is_finite() || self.min_usd_per_min < 0.0 {
            return Err(invalid(
                "min_usd_per_min",
                self.min_usd_per_min,
                "must be finite and non-negative",
            ));
        }
        if let Some(max_rsi) = self.max_rsi
            && (!max_rsi.is_finite() || max_rsi <= 0.0 || max_rsi > 100.0)
        {
            return Err(invalid("max_rsi", max_rsi, "must be within (0, 100]"));
        }
        if let Some(min_hist) = self.min_macd_hist
            && !min_hist.is_finite()
        {
            return Err(invalid("min_macd_hist", min_hist, "must be finite"));
        }
        Ok(())
    }

    /// Conjunctive check: a partial match never passes
    pub fn is_satisfied_by(&self, metrics: &DerivedMetrics) -> bool {
        let core = [metrics.pct_over, metrics.vol_ratio, metrics.usd_per_min];
        if core.iter().any(|v| !v.is_finite()) {
            return false;
        }
        if metrics.pct_over < self.min_pct_over
            || metrics.vol_ratio < self.min_vol_ratio
            || metrics.usd_per_min < self.min_usd_per_min
        {
            return false;
        }

        // An indicator still warming up cannot satisfy a configured bound
        if let Some(max_rsi) = self.max_rsi {
            match metrics.rsi {
                Some(rsi) if rsi <= max_rsi => {}
                _ => return false,
            }
        }
        if let Some(min_hist) = self.min_macd_hist {
            match metrics.macd_hist {
                Some(hist) if hist >= min_hist => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> DerivedMetrics {
        DerivedMetrics {
            pct_over: 0.05,
            vol_ratio: 3.0,
            usd_per_min: 100_000.0,
            rsi: Some(65.0),
            vpm_avg_usd: 30_000.0,
            macd_hist: Some(0.4),
        }
    }

    #[test]
    fn test_all_thresholds_met() {
        assert!(Thresholds::default().is_satisfied_by(&metrics()));
    }

    #[test]
    fn test_each_threshold_is_required() {
        let t = Thresholds::default();
        let mut m = metrics();
        m.pct_over = 0.01;
        assert!(!t.is_satisfied_by(&m));

        let mut m = metrics();
        m.vol_ratio = 1.5;
        assert!(!t.is_satisfied_by(&m));

        let mut m = metrics();
        m.usd_per_min = 10.0;
        assert!(!t.is_satisfied_by(&m));
    }

    #[test]
    fn test_optional_bounds_need_warm_indicators() {
        let t = Thresholds {
            max_rsi: Some(80.0),
            min_macd_hist: Some(0.0),
            ..Thresholds::default()
        };
        assert!(t.is_satisfied_by(&metrics()));

        let mut m = metrics();
        m.rsi = None;
        assert!(!t.is_satisfied_by(&m));

        let mut m = metrics();
        m.rsi = Some(85.0);
        assert!(!t.is_satisfied_by(&m));

        let mut m = metrics();
        m.macd_hist = Some(-0.1);
        assert!(!t.is_satisfied_by(&m));
    }

    #[test]
    fn test_validate() {
        assert!(Thresholds::default().validate().is_ok());

        let bad = Thresholds {
            min_vol_ratio: -1.0,
            ..Thresholds::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "min_vol_ratio",
                ..
            })
        ));

        let bad_rsi = Thresholds {
            max_rsi: Some(150.0),
            ..Thresholds::default()
        };
        assert!(bad_rsi.validate().is_err());
    }
}
