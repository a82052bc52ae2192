use crate::application::indicators::{TickMacd, WilderRsi};
use crate::domain::errors::{ConfigError, TickRejection};
use crate::domain::market::{PairKey, Tick};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Sizing and indicator periods shared by every PairWindow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    /// Samples older than this (relative to the newest tick) are evicted
    pub retention_ms: i64,
    /// Hard cap on retained samples, independent of time
    pub max_samples: usize,
    /// Prior samples required before a baseline is defined
    pub min_baseline_samples: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            retention_ms: 3_600_000,
            max_samples: 2048,
            min_baseline_samples: 5,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast_period", self.macd_fast_period),
            ("macd_slow_period", self.macd_slow_period),
            ("macd_signal_period", self.macd_signal_period),
            ("retention_max_samples", self.max_samples),
            ("min_baseline_samples", self.min_baseline_samples),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::InvalidPeriod { name, value });
            }
        }
        if self.retention_ms <= 0 {
            return Err(ConfigError::InvalidDuration {
                name: "retention_window",
            });
        }
        // Surfaces any parameter the indicator library refuses
        TickMacd::new(
            self.macd_fast_period,
            self.macd_slow_period,
            self.macd_signal_period,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    timestamp: i64,
    price: f64,
    base_volume: f64,
    usd_per_min: f64,
}

/// Running sum over a sliding window.
///
/// Neumaier-compensated, and reads exactly zero once every non-zero term
/// has been removed, so evicted volume never leaves residue behind.
#[derive(Debug, Clone, Copy, Default)]
struct WindowSum {
    sum: f64,
    compensation: f64,
    nonzero: usize,
}

impl WindowSum {
    fn add(&mut self, value: f64) {
        if value != 0.0 {
            self.nonzero += 1;
            self.accumulate(value);
        }
    }

    fn remove(&mut self, value: f64) {
        if value == 0.0 {
            return;
        }
        self.nonzero = self.nonzero.saturating_sub(1);
        if self.nonzero == 0 {
            *self = Self::default();
        } else {
            self.accumulate(-value);
        }
    }

    fn accumulate(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    fn value(&self) -> f64 {
        if self.nonzero == 0 {
            0.0
        } else {
            self.sum + self.compensation
        }
    }
}

/// Read-only view of a pair's indicators right after a tick was applied.
///
/// Window averages describe the samples retained *before* the tick, so the
/// tick is compared against history it is not part of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    /// Samples retained before this tick
    pub prior_samples: usize,
    pub avg_price: Option<f64>,
    pub avg_volume: Option<f64>,
    pub vpm_avg_usd: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_hist: Option<f64>,
    min_baseline_samples: usize,
}

impl IndicatorSnapshot {
    /// Rolling-average price baseline, once enough history exists
    pub fn baseline(&self) -> Option<f64> {
        if self.prior_samples < self.min_baseline_samples {
            return None;
        }
        self.avg_price
    }
}

/// Time-bounded sample history plus running indicator state for one key
#[derive(Debug, Clone)]
pub struct PairWindow {
    samples: VecDeque<Sample>,
    price_sum: WindowSum,
    volume_sum: WindowSum,
    flow_sum: WindowSum,
    rsi: WilderRsi,
    macd: TickMacd,
    last: Option<Sample>,
}

impl PairWindow {
    fn new(config: &WindowConfig, macd: TickMacd) -> Self {
        Self {
            samples: VecDeque::with_capacity(config.max_samples.min(256)),
            price_sum: WindowSum::default(),
            volume_sum: WindowSum::default(),
            flow_sum: WindowSum::default(),
            rsi: WilderRsi::new(config.rsi_period),
            macd,
            last: None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last.map(|s| s.timestamp)
    }

    /// Retained prices, oldest first
    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price).collect()
    }

    fn check_order(&self, key: &PairKey, tick: &Tick) -> Result<(), TickRejection> {
        let Some(last) = self.last else {
            return Ok(());
        };
        if tick.timestamp < last.timestamp {
            return Err(TickRejection::OutOfOrder {
                key: key.to_string(),
                timestamp: tick.timestamp,
                last: last.timestamp,
            });
        }
        if tick.timestamp == last.timestamp
            && tick.price == last.price
            && tick.base_volume == last.base_volume
        {
            return Err(TickRejection::Duplicate {
                key: key.to_string(),
                timestamp: tick.timestamp,
            });
        }
        Ok(())
    }

    fn push_sample(&mut self, sample: Sample, max_samples: usize) {
        self.price_sum.add(sample.price);
        self.volume_sum.add(sample.base_volume);
        self.flow_sum.add(sample.usd_per_min);
        self.samples.push_back(sample);
        while self.samples.len() > max_samples {
            self.pop_oldest();
        }
    }

    fn pop_oldest(&mut self) {
        if let Some(old) = self.samples.pop_front() {
            self.price_sum.remove(old.price);
            self.volume_sum.remove(old.base_volume);
            self.flow_sum.remove(old.usd_per_min);
        }
    }

    fn evict_before(&mut self, cutoff: i64) {
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp < cutoff)
        {
            self.pop_oldest();
        }
    }

    fn averages(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        if self.samples.is_empty() {
            return (None, None, None);
        }
        let n = self.samples.len() as f64;
        (
            Some(self.price_sum.value() / n),
            Some(self.volume_sum.value() / n),
            Some(self.flow_sum.value() / n),
        )
    }
}

/// Per-(pair, interval) rolling state.
///
/// Each engine lane owns one store for the keys hashed to it, so updates
/// never contend across lanes.
pub struct RollingIndicatorStore {
    config: WindowConfig,
    macd_template: TickMacd,
    windows: HashMap<PairKey, PairWindow>,
}

impl RollingIndicatorStore {
    pub fn new(config: WindowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let macd_template = TickMacd::new(
            config.macd_fast_period,
            config.macd_slow_period,
            config.macd_signal_period,
        )?;
        Ok(Self {
            config,
            macd_template,
            windows: HashMap::new(),
        })
    }

    /// Apply a tick to its key's window.
    ///
    /// Rejected ticks leave the window untouched.
    pub fn update(&mut self, tick: &Tick) -> Result<IndicatorSnapshot, TickRejection> {
        tick.validate()?;
        let key = tick.key();

        let window = match self.windows.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("RollingIndicatorStore: opening window for {}", key);
                entry.insert(PairWindow::new(&self.config, self.macd_template.clone()))
            }
        };

        window.check_order(&key, tick)?;

        window.evict_before(tick.timestamp - self.config.retention_ms);
        let prior_samples = window.len();
        let (avg_price, avg_volume, vpm_avg_usd) = window.averages();

        let sample = Sample {
            timestamp: tick.timestamp,
            price: tick.price,
            base_volume: tick.base_volume,
            usd_per_min: tick.usd_per_min(),
        };
        window.push_sample(sample, self.config.max_samples);
        window.last = Some(sample);

        let rsi = window.rsi.next(tick.price);
        let macd_hist = window.macd.next(tick.price);

        Ok(IndicatorSnapshot {
            prior_samples,
            avg_price,
            avg_volume,
            vpm_avg_usd,
            rsi,
            macd_hist,
            min_baseline_samples: self.config.min_baseline_samples,
        })
    }

    pub fn window(&self, key: &PairKey) -> Option<&PairWindow> {
        self.windows.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Interval;

    fn store() -> RollingIndicatorStore {
        RollingIndicatorStore::new(WindowConfig {
            rsi_period: 3,
            macd_fast_period: 2,
            macd_slow_period: 4,
            macd_signal_period: 2,
            retention_ms: 10_000,
            max_samples: 100,
            min_baseline_samples: 2,
        })
        .unwrap()
    }

    fn tick(ts: i64, price: f64, volume: f64) -> Tick {
        Tick::new("BTC-USD", Interval::OneMin, ts, price, volume)
    }

    #[test]
    fn test_baseline_uses_prior_samples_only() {
        let mut store = store();
        let s = store.update(&tick(0, 100.0, 1.0)).unwrap();
        assert_eq!(s.prior_samples, 0);
        assert_eq!(s.baseline(), None);

        store.update(&tick(1_000, 102.0, 3.0)).unwrap();
        let s = store.update(&tick(2_000, 150.0, 10.0)).unwrap();
        assert_eq!(s.prior_samples, 2);
        assert_eq!(s.baseline(), Some(101.0));
        assert_eq!(s.avg_volume, Some(2.0));
    }

    #[test]
    fn test_retention_evicts_old_samples() {
        let mut store = store();
        store.update(&tick(0, 100.0, 1.0)).unwrap();
        store.update(&tick(5_000, 110.0, 1.0)).unwrap();
        let s = store.update(&tick(12_000, 120.0, 1.0)).unwrap();
        // the t=0 sample is older than 10s and was dropped
        assert_eq!(s.prior_samples, 1);
        assert_eq!(s.avg_price, Some(110.0));

        let key = PairKey::new("BTC-USD", Interval::OneMin);
        assert_eq!(store.window(&key).unwrap().prices(), vec![110.0, 120.0]);
    }

    #[test]
    fn test_evicted_volume_leaves_no_residue() {
        let mut store = RollingIndicatorStore::new(WindowConfig {
            retention_ms: 10_000,
            min_baseline_samples: 1,
            ..WindowConfig::default()
        })
        .unwrap();
        store.update(&tick(0, 100.0, 0.1)).unwrap();
        store.update(&tick(1, 100.0, 0.2)).unwrap();
        store.update(&tick(2, 100.0, 0.3)).unwrap();
        store.update(&tick(9_000, 100.0, 0.0)).unwrap();
        store.update(&tick(9_500, 100.0, 0.0)).unwrap();

        let s = store.update(&tick(10_500, 110.0, 1.0)).unwrap();
        assert_eq!(s.prior_samples, 2);
        assert_eq!(s.avg_volume, Some(0.0));
        assert_eq!(s.avg_price, Some(100.0));
    }

    #[test]
    fn test_window_sum_tracks_long_slides_exactly() {
        let mut sum = WindowSum::default();
        let values: Vec<f64> = (0..1_000).map(|i| 0.1 * (i % 7) as f64 + 1e-3).collect();
        for v in &values {
            sum.add(*v);
        }
        for v in &values[..990] {
            sum.remove(*v);
        }
        let expected: f64 = values[990..].iter().sum();
        assert!((sum.value() - expected).abs() < 1e-12);

        for v in &values[990..] {
            sum.remove(*v);
        }
        assert_eq!(sum.value(), 0.0);
    }

    #[test]
    fn test_max_samples_bound() {
        let mut store = RollingIndicatorStore::new(WindowConfig {
            max_samples: 3,
            ..WindowConfig::default()
        })
        .unwrap();
        for i in 0..10 {
            store.update(&tick(i * 1_000, 100.0 + i as f64, 1.0)).unwrap();
        }
        let key = PairKey::new("BTC-USD", Interval::OneMin);
        assert_eq!(store.window(&key).unwrap().len(), 3);
    }

    #[test]
    fn test_out_of_order_tick_rejected_without_side_effects() {
        let mut store = store();
        store.update(&tick(1_000, 100.0, 1.0)).unwrap();
        store.update(&tick(2_000, 101.0, 1.0)).unwrap();

        let before = store
            .window(&PairKey::new("BTC-USD", Interval::OneMin))
            .unwrap()
            .prices();

        let err = store.update(&tick(1_500, 500.0, 9.0)).unwrap_err();
        assert!(matches!(err, TickRejection::OutOfOrder { .. }));

        let after = store
            .window(&PairKey::new("BTC-USD", Interval::OneMin))
            .unwrap()
            .prices();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rejected_ticks_leave_indicator_state_untouched() {
        let mut control = store();
        let mut store = store();
        for (i, price) in [100.0, 101.5, 99.0, 102.0, 103.5, 101.0].into_iter().enumerate() {
            let t = tick(1_000 * (i as i64 + 1), price, 1.0);
            store.update(&t).unwrap();
            control.update(&t).unwrap();
        }

        assert!(store.update(&tick(3_500, 250.0, 7.0)).is_err());
        assert!(store.update(&tick(6_000, 101.0, 1.0)).is_err());

        let next = tick(7_000, 104.0, 1.0);
        let with_rejections = store.update(&next).unwrap();
        let clean = control.update(&next).unwrap();
        assert!(clean.rsi.is_some());
        assert!(clean.macd_hist.is_some());
        assert_eq!(with_rejections, clean);
    }

    #[test]
    fn test_exact_duplicate_rejected_but_same_timestamp_update_accepted() {
        let mut store = store();
        store.update(&tick(1_000, 100.0, 1.0)).unwrap();
        assert!(matches!(
            store.update(&tick(1_000, 100.0, 1.0)),
            Err(TickRejection::Duplicate { .. })
        ));
        assert!(store.update(&tick(1_000, 100.5, 1.2)).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = store();
        store.update(&tick(5_000, 100.0, 1.0)).unwrap();
        let other = Tick::new("ETH-USD", Interval::OneMin, 1_000, 10.0, 1.0);
        assert!(store.update(&other).is_ok());
        let other_interval = Tick::new("BTC-USD", Interval::FiveMin, 1_000, 10.0, 1.0);
        assert!(store.update(&other_interval).is_ok());
        assert_eq!(store.key_count(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RollingIndicatorStore::new(WindowConfig {
            rsi_period: 0,
            ..WindowConfig::default()
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPeriod {
                name: "rsi_period",
                ..
            })
        ));
    }
}
