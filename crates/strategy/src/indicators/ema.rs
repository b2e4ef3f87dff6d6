/// Exponential Moving Average.
///
/// Seeded with the SMA of the first `period` values, then smoothed with
/// `k = 2 / (period + 1)`. The series starts at input index `period - 1`, so
/// it holds `len - period + 1` values.
#[derive(Debug, Clone)]
pub struct EmaIndicator {
    pub period: usize,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    /// Minimum number of inputs for one output value.
    pub fn warm_up(&self) -> usize {
        self.period
    }

    pub fn series(&self, values: &[f64]) -> Vec<f64> {
        ema_series(values, self.period)
    }

    /// Latest EMA value, `None` with fewer than `period` inputs.
    pub fn last(&self, values: &[f64]) -> Option<f64> {
        self.series(values).last().copied()
    }
}

pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);

    let mut ema_val = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema_val);

    for &value in &values[period..] {
        ema_val = (value - ema_val) * k + ema_val;
        out.push(ema_val);
    }
    out
}

pub(crate) fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}
