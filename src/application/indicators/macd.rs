use crate::domain::errors::ConfigError;
use ta::Next;
use ta::indicators::MovingAverageConvergenceDivergence;

/// MACD histogram over raw tick prices.
///
/// Wraps the `ta` implementation (EMAs seeded with the first price) and
/// withholds output until the slow EMA and the signal EMA have both seen
/// their full period.
#[derive(Debug, Clone)]
pub struct TickMacd {
    inner: MovingAverageConvergenceDivergence,
    samples: usize,
    warmup: usize,
    last_hist: Option<f64>,
}

impl TickMacd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, ConfigError> {
        if fast >= slow {
            return Err(ConfigError::MacdPeriodOrder { fast, slow });
        }
        let inner = MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(|e| {
            ConfigError::Indicator {
                reason: format!("MACD({fast},{slow},{signal}): {e:?}"),
            }
        })?;

        Ok(Self {
            inner,
            samples: 0,
            warmup: slow + signal - 1,
            last_hist: None,
        })
    }

    pub fn next(&mut self, price: f64) -> Option<f64> {
        let output = self.inner.next(price);
        self.samples += 1;
        if self.samples >= self.warmup {
            self.last_hist = Some(output.histogram);
        }
        self.last_hist
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }
}
