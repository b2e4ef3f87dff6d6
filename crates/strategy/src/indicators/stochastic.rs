use common::{Bar, StochPoint};

use super::ema::sma_series;

/// Stochastic oscillator. %K over `period` bars, %D = SMA(%K, signal_period).
///
/// A window with no range (highest high == lowest low) gives %K = 0.
#[derive(Debug, Clone)]
pub struct StochasticIndicator {
    pub period: usize,
    pub signal_period: usize,
}

impl StochasticIndicator {
    pub fn new(period: usize, signal_period: usize) -> Self {
        assert!(period >= 1, "Stochastic period must be >= 1");
        assert!(signal_period >= 1, "Stochastic signal period must be >= 1");
        Self {
            period,
            signal_period,
        }
    }

    pub fn warm_up(&self) -> usize {
        self.period + self.signal_period - 1
    }

    /// %K series, one value per bar from index `period - 1` on.
    pub fn k_series(&self, bars: &[Bar]) -> Vec<f64> {
        if bars.len() < self.period {
            return Vec::new();
        }
        bars.windows(self.period)
            .map(|window| {
                let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
                let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
                let close = window[window.len() - 1].close;
                let range = highest - lowest;
                if range > 0.0 {
                    (close - lowest) / range * 100.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Points where both %K and %D are defined.
    pub fn series(&self, bars: &[Bar]) -> Vec<StochPoint> {
        let k = self.k_series(bars);
        let d = sma_series(&k, self.signal_period);
        let skip = k.len() - d.len().min(k.len());
        k[skip..]
            .iter()
            .zip(d)
            .map(|(&k, d)| StochPoint { k, d })
            .collect()
    }

    /// Latest finite point.
    pub fn last(&self, bars: &[Bar]) -> Option<StochPoint> {
        let start = bars.len().checked_sub(self.warm_up())?;
        self.series(&bars[start..])
            .pop()
            .filter(|p| p.k.is_finite() && p.d.is_finite())
    }
}
