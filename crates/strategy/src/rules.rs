use serde::{Deserialize, Serialize};

use common::{Bar, Error, IndicatorSnapshot, Result, Signal};

use crate::indicators::{
    average_volume, BollingerIndicator, EmaIndicator, MacdIndicator, RsiIndicator,
    StochasticIndicator,
};
use crate::snapshot::{base_snapshot, Columns};
use crate::SignalRule;

/// Signal rule selected by the `kind` key of a bot's `[bot.rule]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyRule {
    MeanReversion(MeanReversionRule),
    TrendMomentum(TrendMomentumRule),
}

impl StrategyRule {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyRule::MeanReversion(_) => "mean_reversion",
            StrategyRule::TrendMomentum(_) => "trend_momentum",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyRule::MeanReversion(rule) => rule.validate(),
            StrategyRule::TrendMomentum(rule) => rule.validate(),
        }
    }
}

impl SignalRule for StrategyRule {
    fn required_bars(&self) -> usize {
        match self {
            StrategyRule::MeanReversion(rule) => rule.required_bars(),
            StrategyRule::TrendMomentum(rule) => rule.required_bars(),
        }
    }

    fn snapshot(&self, bars: &[Bar]) -> Option<IndicatorSnapshot> {
        match self {
            StrategyRule::MeanReversion(rule) => rule.snapshot(bars),
            StrategyRule::TrendMomentum(rule) => rule.snapshot(bars),
        }
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot) -> Signal {
        match self {
            StrategyRule::MeanReversion(rule) => rule.evaluate(snapshot),
            StrategyRule::TrendMomentum(rule) => rule.evaluate(snapshot),
        }
    }
}

// ─── Mean reversion ───────────────────────────────────────────────────────────

/// Fast/slow EMA trend filter with a Bollinger band break and RSI extreme.
///
/// LONG when the fast EMA is above the slow one, the close is below the
/// lower band and RSI is below `rsi_long_below`. SHORT is the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeanReversionRule {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub rsi_period: usize,
    pub rsi_long_below: f64,
    pub rsi_short_above: f64,
    pub min_bars: usize,
}

impl Default for MeanReversionRule {
    fn default() -> Self {
        Self {
            ema_fast: 9,
            ema_slow: 21,
            bb_period: 20,
            bb_std_dev: 2.0,
            rsi_period: 14,
            rsi_long_below: 40.0,
            rsi_short_above: 60.0,
            min_bars: 50,
        }
    }
}

impl MeanReversionRule {
    pub fn validate(&self) -> Result<()> {
        check_ema_pair(self.ema_fast, self.ema_slow)?;
        check(self.bb_period >= 2, "bb_period must be >= 2")?;
        check(self.bb_std_dev > 0.0, "bb_std_dev must be positive")?;
        check(self.rsi_period >= 2, "rsi_period must be >= 2")?;
        check_thresholds("rsi", self.rsi_long_below, self.rsi_short_above)
    }
}

impl SignalRule for MeanReversionRule {
    fn required_bars(&self) -> usize {
        [
            self.min_bars,
            self.ema_fast,
            self.ema_slow,
            self.bb_period,
            self.rsi_period + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
        .max(1)
    }

    fn snapshot(&self, bars: &[Bar]) -> Option<IndicatorSnapshot> {
        let mut snapshot = base_snapshot(bars)?;
        let cols = Columns::new(bars);

        snapshot.ema_fast = EmaIndicator::new(self.ema_fast).last(&cols.closes);
        snapshot.ema_slow = EmaIndicator::new(self.ema_slow).last(&cols.closes);
        snapshot.bands = BollingerIndicator::new(self.bb_period, self.bb_std_dev).last(&cols.closes);
        snapshot.rsi = RsiIndicator::new(self.rsi_period).last(&cols.closes);
        Some(snapshot)
    }

    fn evaluate(&self, s: &IndicatorSnapshot) -> Signal {
        let (Some(fast), Some(slow), Some(bands), Some(rsi)) =
            (s.ema_fast, s.ema_slow, s.bands, s.rsi)
        else {
            return Signal::Neutral;
        };

        if fast > slow && s.close < bands.lower && rsi < self.rsi_long_below {
            Signal::Long
        } else if fast < slow && s.close > bands.upper && rsi > self.rsi_short_above {
            Signal::Short
        } else {
            Signal::Neutral
        }
    }
}

// ─── Trend / momentum ─────────────────────────────────────────────────────────

/// Trend filter (EMA fast vs slow) confirmed by MACD, a stochastic turn out
/// of an extreme, RSI and a volume spike. The stricter variant also wants a
/// Bollinger band touch and a candle closing in the trade direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendMomentumRule {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_period: usize,
    pub stoch_signal: usize,
    pub stoch_long_below: f64,
    pub stoch_short_above: f64,
    pub rsi_period: usize,
    pub rsi_long_below: f64,
    pub rsi_short_above: f64,
    pub volume_lookback: usize,
    pub volume_spike_multiplier: f64,
    pub require_band_touch: bool,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub require_candle_confirmation: bool,
    pub min_bars: usize,
}

impl Default for TrendMomentumRule {
    fn default() -> Self {
        Self {
            ema_fast: 50,
            ema_slow: 200,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_period: 14,
            stoch_signal: 3,
            stoch_long_below: 20.0,
            stoch_short_above: 80.0,
            rsi_period: 14,
            rsi_long_below: 30.0,
            rsi_short_above: 70.0,
            volume_lookback: 50,
            volume_spike_multiplier: 2.0,
            require_band_touch: false,
            bb_period: 20,
            bb_std_dev: 2.0,
            require_candle_confirmation: false,
            min_bars: 200,
        }
    }
}

impl TrendMomentumRule {
    pub fn validate(&self) -> Result<()> {
        check_ema_pair(self.ema_fast, self.ema_slow)?;
        check(
            self.macd_fast >= 1 && self.macd_fast < self.macd_slow,
            "macd_fast must be >= 1 and below macd_slow",
        )?;
        check(self.macd_signal >= 1, "macd_signal must be >= 1")?;
        check(
            self.stoch_period >= 1 && self.stoch_signal >= 1,
            "stochastic periods must be >= 1",
        )?;
        check_thresholds("stoch", self.stoch_long_below, self.stoch_short_above)?;
        check(self.rsi_period >= 2, "rsi_period must be >= 2")?;
        check_thresholds("rsi", self.rsi_long_below, self.rsi_short_above)?;
        check(self.volume_lookback >= 1, "volume_lookback must be >= 1")?;
        check(
            self.volume_spike_multiplier > 0.0,
            "volume_spike_multiplier must be positive",
        )?;
        if self.require_band_touch {
            check(self.bb_period >= 2, "bb_period must be >= 2")?;
            check(self.bb_std_dev > 0.0, "bb_std_dev must be positive")?;
        }
        Ok(())
    }

    fn macd(&self) -> MacdIndicator {
        MacdIndicator::new(self.macd_fast, self.macd_slow, self.macd_signal)
    }

    fn stochastic(&self) -> StochasticIndicator {
        StochasticIndicator::new(self.stoch_period, self.stoch_signal)
    }
}

impl SignalRule for TrendMomentumRule {
    fn required_bars(&self) -> usize {
        let mut needs = vec![
            self.min_bars,
            self.ema_fast,
            self.ema_slow,
            self.macd().warm_up(),
            self.stochastic().warm_up(),
            self.rsi_period + 1,
            self.volume_lookback,
        ];
        if self.require_band_touch {
            needs.push(self.bb_period);
        }
        if self.require_candle_confirmation {
            needs.push(2);
        }
        needs.into_iter().max().unwrap_or(1).max(1)
    }

    fn snapshot(&self, bars: &[Bar]) -> Option<IndicatorSnapshot> {
        let mut snapshot = base_snapshot(bars)?;
        let cols = Columns::new(bars);

        snapshot.ema_fast = EmaIndicator::new(self.ema_fast).last(&cols.closes);
        snapshot.ema_slow = EmaIndicator::new(self.ema_slow).last(&cols.closes);
        snapshot.macd = self.macd().last(&cols.closes);
        snapshot.stochastic = self.stochastic().last(bars);
        snapshot.rsi = RsiIndicator::new(self.rsi_period).last(&cols.closes);
        snapshot.avg_volume = average_volume(&cols.volumes, self.volume_lookback);
        if self.require_band_touch {
            snapshot.bands =
                BollingerIndicator::new(self.bb_period, self.bb_std_dev).last(&cols.closes);
        }
        Some(snapshot)
    }

    fn evaluate(&self, s: &IndicatorSnapshot) -> Signal {
        let (Some(fast), Some(slow), Some(macd), Some(stoch), Some(rsi), Some(avg_volume)) = (
            s.ema_fast,
            s.ema_slow,
            s.macd,
            s.stochastic,
            s.rsi,
            s.avg_volume,
        ) else {
            return Signal::Neutral;
        };

        let bands = if self.require_band_touch {
            match s.bands {
                Some(bands) => Some(bands),
                None => return Signal::Neutral,
            }
        } else {
            None
        };
        let prev_close = if self.require_candle_confirmation {
            match s.prev_close {
                Some(prev) => Some(prev),
                None => return Signal::Neutral,
            }
        } else {
            None
        };

        let volume_spike = s.volume > avg_volume * self.volume_spike_multiplier;

        let long = fast > slow
            && macd.macd > macd.signal
            && stoch.k < self.stoch_long_below
            && stoch.k > stoch.d
            && rsi < self.rsi_long_below
            && volume_spike
            && bands.map_or(true, |b| s.close <= b.lower)
            && prev_close.map_or(true, |prev| s.close > prev);

        let short = fast < slow
            && macd.macd < macd.signal
            && stoch.k > self.stoch_short_above
            && stoch.k < stoch.d
            && rsi > self.rsi_short_above
            && volume_spike
            && bands.map_or(true, |b| s.close >= b.upper)
            && prev_close.map_or(true, |prev| s.close < prev);

        if long {
            Signal::Long
        } else if short {
            Signal::Short
        } else {
            Signal::Neutral
        }
    }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Config(message.to_string()))
    }
}

fn check_ema_pair(fast: usize, slow: usize) -> Result<()> {
    check(fast >= 1 && fast < slow, "ema_fast must be >= 1 and below ema_slow")
}

fn check_thresholds(name: &str, long_below: f64, short_above: f64) -> Result<()> {
    let in_range = |v: f64| (0.0..=100.0).contains(&v);
    if in_range(long_below) && in_range(short_above) && long_below <= short_above {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{name} thresholds must lie in 0..=100 with long_below <= short_above"
        )))
    }
}
