use common::MacdPoint;

use super::ema::ema_series;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
/// Both averages are exponential and SMA-seeded.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(
            fast < slow,
            "MACD fast period must be less than slow period"
        );
        assert!(signal >= 1, "MACD signal period must be >= 1");
        Self { fast, slow, signal }
    }

    /// Closes needed before the signal line has its first value.
    pub fn warm_up(&self) -> usize {
        self.slow + self.signal - 1
    }

    /// MACD points from a slice of close prices (oldest first), starting at
    /// the first bar where the signal line is defined.
    pub fn series(&self, closes: &[f64]) -> Vec<MacdPoint> {
        let fast = ema_series(closes, self.fast);
        let slow = ema_series(closes, self.slow);
        if slow.is_empty() {
            return Vec::new();
        }

        // Align the fast series with the slow one (both end on the last close).
        let offset = self.slow - self.fast;
        let macd_line: Vec<f64> = slow
            .iter()
            .enumerate()
            .map(|(i, s)| fast[i + offset] - s)
            .collect();

        let signal_line = ema_series(&macd_line, self.signal);
        let skip = macd_line.len() - signal_line.len();

        macd_line[skip..]
            .iter()
            .zip(signal_line)
            .map(|(&macd, signal)| MacdPoint {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    /// Latest MACD point. Returns `None` if there isn't enough data.
    pub fn last(&self, closes: &[f64]) -> Option<MacdPoint> {
        self.series(closes).last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    fn trending_down(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64 * 0.5).collect()
    }

    #[test]
    fn macd_returns_none_with_insufficient_data() {
        let macd = MacdIndicator::new(12, 26, 9);
        let prices = vec![100.0; 33]; // need >= 34
        assert!(macd.last(&prices).is_none());
    }

    #[test]
    fn macd_first_point_at_warm_up() {
        let macd = MacdIndicator::new(12, 26, 9);
        let prices: Vec<f64> = (0..34).map(|i| 100.0 + i as f64).collect();
        assert_eq!(macd.series(&prices).len(), 1);
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert_eq!(macd.series(&prices).len(), 27);
    }

    #[test]
    fn macd_flat_prices_are_zero() {
        let macd = MacdIndicator::new(12, 26, 9);
        let point = macd.last(&[5.0; 80]).unwrap();
        assert!(point.macd.abs() < 1e-12);
        assert!(point.signal.abs() < 1e-12);
    }

    #[test]
    fn macd_positive_in_uptrend_negative_in_downtrend() {
        let macd = MacdIndicator::new(3, 6, 3);
        assert!(macd.last(&trending_up(40)).unwrap().macd > 0.0);
        assert!(macd.last(&trending_down(40)).unwrap().macd < 0.0);
    }

    #[test]
    fn macd_above_signal_after_reversal_up() {
        let macd = MacdIndicator::new(3, 6, 3);
        // Down then sharply up: MACD line leads its signal line upwards.
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        prices.extend((0..5).map(|i| 90.0 + i as f64 * 2.0));
        let point = macd.last(&prices).unwrap();
        assert!(point.macd > point.signal);
        assert!((point.histogram - (point.macd - point.signal)).abs() < 1e-12);
    }
}
