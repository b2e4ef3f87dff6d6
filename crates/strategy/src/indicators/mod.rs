//! Technical indicators.
//!
//! Each indicator returns its series with the warm-up bars trimmed (fewer
//! outputs than inputs) and a `last()` shortcut that is `None` until enough
//! bars are available.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stochastic;

pub use bollinger::BollingerIndicator;
pub use ema::EmaIndicator;
pub use macd::MacdIndicator;
pub use rsi::RsiIndicator;
pub use stochastic::StochasticIndicator;

/// Mean of the last `lookback` volumes, current bar included.
pub fn average_volume(volumes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || volumes.len() < lookback {
        return None;
    }
    let recent = &volumes[volumes.len() - lookback..];
    Some(recent.iter().sum::<f64>() / lookback as f64)
}
