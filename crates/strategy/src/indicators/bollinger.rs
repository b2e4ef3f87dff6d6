use common::BandPoint;

/// Bollinger Bands: SMA(period) ± std_dev × population standard deviation.
#[derive(Debug, Clone)]
pub struct BollingerIndicator {
    pub period: usize,
    pub std_dev: f64,
}

impl BollingerIndicator {
    pub fn new(period: usize, std_dev: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self { period, std_dev }
    }

    pub fn warm_up(&self) -> usize {
        self.period
    }

    pub fn series(&self, closes: &[f64]) -> Vec<BandPoint> {
        if closes.len() < self.period {
            return Vec::new();
        }
        let n = self.period as f64;
        closes
            .windows(self.period)
            .map(|window| {
                let middle = window.iter().sum::<f64>() / n;
                let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / n;
                let width = self.std_dev * variance.sqrt();
                BandPoint {
                    lower: middle - width,
                    middle,
                    upper: middle + width,
                }
            })
            .collect()
    }

    pub fn last(&self, closes: &[f64]) -> Option<BandPoint> {
        let start = closes.len().checked_sub(self.period)?;
        self.series(&closes[start..]).pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_need_full_window() {
        let bb = BollingerIndicator::new(20, 2.0);
        assert!(bb.last(&[1.0; 19]).is_none());
        assert_eq!(bb.series(&[1.0; 25]).len(), 6);
    }

    #[test]
    fn bands_collapse_on_flat_prices() {
        let bb = BollingerIndicator::new(20, 2.0);
        let b = bb.last(&[3.0; 20]).unwrap();
        assert_eq!(b.lower, 3.0);
        assert_eq!(b.middle, 3.0);
        assert_eq!(b.upper, 3.0);
    }

    #[test]
    fn bands_use_population_std_dev() {
        let bb = BollingerIndicator::new(2, 2.0);
        // mean 2, population std dev 1
        let b = bb.last(&[100.0, 1.0, 3.0]).unwrap();
        assert!((b.middle - 2.0).abs() < 1e-12);
        assert!((b.upper - 4.0).abs() < 1e-12);
        assert!((b.lower - 0.0).abs() < 1e-12);
    }

    #[test]
    fn last_matches_series_tail() {
        let bb = BollingerIndicator::new(5, 2.0);
        let closes: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin() + 10.0).collect();
        assert_eq!(bb.last(&closes), bb.series(&closes).last().copied());
    }
}
