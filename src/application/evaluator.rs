use crate::application::rolling_store::IndicatorSnapshot;
use crate::domain::detection::{DerivedMetrics, Detection, DetectionId, Thresholds};
use crate::domain::market::{Tick, UniverseMap};

/// Breakout Evaluator
///
/// Turns a tick plus its pair's indicator snapshot into a detection when
/// price, volume and flow all clear their thresholds on the same tick.
/// Holds no mutable state: all history lives in the rolling store.
#[derive(Debug, Clone)]
pub struct BreakoutEvaluator {
    thresholds: Thresholds,
    universes: UniverseMap,
}

impl BreakoutEvaluator {
    pub fn new(thresholds: Thresholds, universes: UniverseMap) -> Self {
        Self {
            thresholds,
            universes,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate one tick. `baseline` is normally `snapshot.baseline()`.
    pub fn evaluate(
        &self,
        tick: &Tick,
        snapshot: &IndicatorSnapshot,
        baseline: Option<f64>,
    ) -> Option<Detection> {
        let metrics = derive_metrics(tick, snapshot, baseline)?;
        if !self.thresholds.is_satisfied_by(&metrics) {
            return None;
        }

        Some(Detection {
            id: DetectionId::derive(&tick.pair, tick.interval, tick.timestamp),
            timestamp: tick.timestamp,
            pair: tick.pair.clone(),
            interval: tick.interval,
            price: tick.price,
            metrics,
            universe: self.universes.resolve(&tick.pair).to_string(),
            source: tick.source.clone(),
        })
    }
}

/// Compute the derived metrics for a tick.
///
/// Returns `None` when the baseline or the average volume is missing or not
/// positive (insufficient history); that is not an error.
pub fn derive_metrics(
    tick: &Tick,
    snapshot: &IndicatorSnapshot,
    baseline: Option<f64>,
) -> Option<DerivedMetrics> {
    let baseline = baseline.filter(|b| b.is_finite() && *b > 0.0)?;
    let avg_volume = snapshot.avg_volume.filter(|v| v.is_finite() && *v > 0.0)?;

    Some(DerivedMetrics {
        pct_over: (tick.price - baseline) / baseline,
        vol_ratio: tick.base_volume / avg_volume,
        usd_per_min: tick.usd_per_min(),
        rsi: snapshot.rsi,
        vpm_avg_usd: snapshot.vpm_avg_usd.unwrap_or(0.0),
        macd_hist: snapshot.macd_hist,
    })
}
