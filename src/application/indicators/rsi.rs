/// Incremental RSI using Wilder's smoothing.
///
/// The first `period` price changes are averaged as a plain mean; every later
/// change updates the averages as `(avg * (n - 1) + x) / n`. O(1) per price.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_price: Option<f64>,
    count: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_price: None,
            count: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    /// Feed the next price; returns the RSI once `period` changes are known
    pub fn next(&mut self, price: f64) -> Option<f64> {
        let prev = self.prev_price.replace(price)?;

        let change = price - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.count += 1;

        let n = self.period as f64;
        if self.count <= self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            if self.count == self.period {
                self.avg_gain = self.gain_sum / n;
                self.avg_loss = self.loss_sum / n;
            }
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        self.value()
    }

    /// Current RSI without consuming a price
    pub fn value(&self) -> Option<f64> {
        if self.count < self.period {
            return None;
        }
        Some(rsi_from_averages(self.avg_gain, self.avg_loss))
    }
}

pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // Flat series reads neutral, a pure uptrend reads 100
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
