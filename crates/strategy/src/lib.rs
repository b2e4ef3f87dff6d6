pub mod config;
pub mod indicators;
pub mod rules;
mod snapshot;

pub use config::{BotConfig, BotFileConfig};
pub use rules::{MeanReversionRule, StrategyRule, TrendMomentumRule};

use common::{Bar, Error, IndicatorSnapshot, Result, Signal};

/// All signal rules must satisfy this trait.
///
/// Evaluation is a pure function of the bar window: no state is kept between
/// calls.
pub trait SignalRule: Send + Sync {
    /// Bars needed before every indicator the rule uses is defined.
    fn required_bars(&self) -> usize;

    /// Latest indicator values over `bars` (oldest first). `None` for an
    /// empty window.
    fn snapshot(&self, bars: &[Bar]) -> Option<IndicatorSnapshot>;

    /// Decide on a direction. Any undefined indicator the rule needs yields
    /// `Signal::Neutral`.
    fn evaluate(&self, snapshot: &IndicatorSnapshot) -> Signal;

    /// Snapshot and signal, or `InsufficientData` when the window is shorter
    /// than `required_bars()`.
    fn assess(&self, bars: &[Bar]) -> Result<(IndicatorSnapshot, Signal)> {
        let need = self.required_bars();
        let insufficient = Error::InsufficientData {
            have: bars.len(),
            need,
        };
        if bars.len() < need {
            return Err(insufficient);
        }
        let snapshot = self.snapshot(bars).ok_or(insufficient)?;
        let signal = self.evaluate(&snapshot);
        Ok((snapshot, signal))
    }

    /// Signal for a bar window; short windows are `Neutral`.
    fn evaluate_bars(&self, bars: &[Bar]) -> Signal {
        self.assess(bars)
            .map(|(_, signal)| signal)
            .unwrap_or(Signal::Neutral)
    }
}
