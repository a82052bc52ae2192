//! Batch (full recomputation) versions of the streaming indicators.
//!
//! Used to cross-check the incremental state kept per pair.

use crate::application::indicators::rsi::rsi_from_averages;

/// Wilder RSI over the whole price series, recomputed from scratch
pub fn batch_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() <= period {
        return None;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let n = period as f64;

    let (seed, rest) = changes.split_at(period);
    let mut avg_gain = seed.iter().map(|c| c.max(0.0)).sum::<f64>() / n;
    let mut avg_loss = seed.iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;

    for change in rest {
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
    }

    Some(rsi_from_averages(avg_gain, avg_loss))
}

/// EMA series seeded with the first value, k = 2 / (period + 1)
pub fn batch_ema(values: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = 0.0;
    for (i, v) in values.iter().enumerate() {
        current = if i == 0 {
            *v
        } else {
            k * v + (1.0 - k) * current
        };
        out.push(current);
    }
    out
}

/// Final MACD histogram over the series, or `None` before warm-up completes
pub fn batch_macd_histogram(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<f64> {
    if prices.is_empty() || prices.len() < (slow + signal).saturating_sub(1) {
        return None;
    }
    let fast_ema = batch_ema(prices, fast);
    let slow_ema = batch_ema(prices, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = batch_ema(&macd_line, signal);

    let last = prices.len() - 1;
    Some(macd_line[last] - signal_line[last])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rsi_needs_period_plus_one_prices() {
        assert_eq!(batch_rsi(&[1.0, 2.0, 3.0], 3), None);
        assert_eq!(batch_rsi(&[1.0, 2.0, 3.0, 4.0], 3), Some(100.0));
    }

    #[test]
    fn test_batch_ema_seeded_with_first_value() {
        let ema = batch_ema(&[10.0, 20.0], 3);
        assert_eq!(ema[0], 10.0);
        assert!((ema[1] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_has_zero_histogram() {
        let prices = vec![5.0; 40];
        let hist = batch_macd_histogram(&prices, 12, 26, 9).unwrap();
        assert!(hist.abs() < 1e-12);
    }
}
