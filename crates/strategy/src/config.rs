use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use common::{Error, ExitKind, Interval, Precision, Result, Sizing};

use crate::rules::StrategyRule;
use crate::SignalRule;

/// Top-level bot config file (TOML).
///
/// Example `config/bots.toml`:
/// ```toml
/// [[bot]]
/// name = "doge-mean-reversion"
/// symbols = ["DOGEUSDT"]
/// interval = "5m"
/// stop_loss_pct = 0.8
/// take_profit_pct = 1.5
///
/// [bot.sizing]
/// mode = "fixed_quantity"
/// quantity = 20
///
/// [bot.rule]
/// kind = "mean_reversion"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotFileConfig {
    #[serde(rename = "bot")]
    pub bots: Vec<BotConfig>,
}

/// Static parameters of one bot, loaded once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Name shown in logs.
    pub name: String,
    /// Futures symbols evaluated independently, e.g. "XRPUSDT".
    pub symbols: Vec<String>,
    pub interval: Interval,
    /// Seconds between cycles. Defaults to the candle interval.
    #[serde(default)]
    pub poll_every_secs: Option<u64>,
    /// Bars requested per cycle.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    /// Stop-loss distance from entry, in percent (0.8 = 0.8%).
    pub stop_loss_pct: Decimal,
    /// Take-profit distance from entry, in percent.
    pub take_profit_pct: Decimal,
    #[serde(default = "default_take_profit_kind")]
    pub take_profit_kind: ExitKind,
    pub sizing: Sizing,
    /// Precision used for symbols without an entry in `instruments`.
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub instruments: HashMap<String, Precision>,
    pub rule: StrategyRule,
}

fn default_candle_limit() -> usize {
    500
}

fn default_take_profit_kind() -> ExitKind {
    ExitKind::TakeProfitMarket
}

/// Binance caps kline requests at this many bars.
const MAX_CANDLE_LIMIT: usize = 1500;

impl BotFileConfig {
    /// Load and validate from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read bot config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid bot config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: BotFileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        if self.bots.is_empty() {
            return Err(Error::Config("no [[bot]] entries".into()));
        }
        let mut names = std::collections::HashSet::new();
        for bot in &self.bots {
            if !names.insert(bot.name.as_str()) {
                return Err(Error::Config(format!("duplicate bot name '{}'", bot.name)));
            }
            bot.validate()?;
        }
        Ok(())
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(format!("bot '{}': {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(Error::Config("bot name must not be empty".into()));
        }
        if self.symbols.is_empty() {
            return fail("symbols must not be empty".into());
        }
        if let Some(symbol) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return fail(format!("invalid symbol '{symbol}'"));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE_HUNDRED {
            return fail("stop_loss_pct must be in (0, 100)".into());
        }
        if self.take_profit_pct <= Decimal::ZERO || self.take_profit_pct >= Decimal::ONE_HUNDRED {
            return fail("take_profit_pct must be in (0, 100)".into());
        }
        if self.take_profit_kind == ExitKind::StopMarket {
            return fail("take_profit_kind must be 'limit' or 'take_profit_market'".into());
        }
        match self.sizing {
            Sizing::EquityFraction { fraction } => {
                if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
                    return fail("sizing fraction must be in (0, 1]".into());
                }
            }
            Sizing::FixedQuantity { quantity } => {
                if quantity <= Decimal::ZERO {
                    return fail("fixed quantity must be positive".into());
                }
            }
        }
        if self.poll_every_secs == Some(0) {
            return fail("poll_every_secs must be positive".into());
        }
        self.rule
            .validate()
            .or_else(|e| fail(e.to_string()))?;

        let need = self.rule.required_bars();
        if self.candle_limit < need || self.candle_limit > MAX_CANDLE_LIMIT {
            return fail(format!(
                "candle_limit {} must be between {need} (rule warm-up) and {MAX_CANDLE_LIMIT}",
                self.candle_limit
            ));
        }
        Ok(())
    }

    /// Time between two cycles of the same symbol.
    pub fn poll_period(&self) -> Duration {
        self.poll_every_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.interval.duration())
    }

    pub fn precision_for(&self, symbol: &str) -> Precision {
        self.instruments
            .get(symbol)
            .copied()
            .unwrap_or(self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
[[bot]]
name = "doge-mean-reversion"
symbols = ["DOGEUSDT"]
interval = "1m"
candle_limit = 50
stop_loss_pct = 0.8
take_profit_pct = 1.5

[bot.sizing]
mode = "fixed_quantity"
quantity = 20

[bot.precision]
quantity_dp = 0
price_dp = 2

[bot.rule]
kind = "mean_reversion"

[[bot]]
name = "alts-trend"
symbols = ["XRPUSDT", "LINKUSDT"]
interval = "5m"
candle_limit = 200
stop_loss_pct = 0.8
take_profit_pct = 2.0
take_profit_kind = "limit"

[bot.sizing]
mode = "equity_fraction"
fraction = 0.2

[bot.instruments.LINKUSDT]
quantity_dp = 2
price_dp = 3

[bot.rule]
kind = "trend_momentum"
stoch_long_below = 30.0
stoch_short_above = 70.0
rsi_long_below = 40.0
rsi_short_above = 60.0
volume_spike_multiplier = 1.8
require_band_touch = true
require_candle_confirmation = true
"#;

    #[test]
    fn parses_both_rule_kinds() {
        let file = BotFileConfig::parse(SAMPLE).unwrap();
        assert_eq!(file.bots.len(), 2);

        let doge = &file.bots[0];
        assert_eq!(doge.interval, Interval::OneMinute);
        assert_eq!(doge.poll_period(), Duration::from_secs(60));
        assert_eq!(doge.stop_loss_pct, dec!(0.8));
        assert_eq!(doge.take_profit_kind, ExitKind::TakeProfitMarket);
        assert_eq!(doge.sizing, Sizing::FixedQuantity { quantity: dec!(20) });
        assert!(matches!(doge.rule, StrategyRule::MeanReversion(_)));
        assert_eq!(doge.precision_for("DOGEUSDT").price_dp, 2);

        let alts = &file.bots[1];
        assert_eq!(alts.take_profit_kind, ExitKind::Limit);
        assert_eq!(alts.sizing, Sizing::EquityFraction { fraction: dec!(0.2) });
        assert_eq!(alts.precision_for("LINKUSDT").quantity_dp, 2);
        assert_eq!(alts.precision_for("XRPUSDT"), Precision::default());
        match &alts.rule {
            StrategyRule::TrendMomentum(rule) => {
                assert!(rule.require_band_touch);
                assert_eq!(rule.volume_spike_multiplier, 1.8);
                assert_eq!(rule.ema_slow, 200);
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn rejects_candle_limit_below_warm_up() {
        let broken = SAMPLE.replace("candle_limit = 200", "candle_limit = 100");
        let err = BotFileConfig::parse(&broken).unwrap_err();
        assert!(err.to_string().contains("candle_limit"), "{err}");
    }

    #[test]
    fn rejects_unknown_rule_field() {
        let broken = SAMPLE.replace("require_band_touch = true", "require_band_tuoch = true");
        assert!(BotFileConfig::parse(&broken).is_err());
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let broken = SAMPLE.replace("fraction = 0.2", "fraction = 1.5");
        let err = BotFileConfig::parse(&broken).unwrap_err();
        assert!(err.to_string().contains("fraction"), "{err}");
    }

    #[test]
    fn rejects_duplicate_names() {
        let broken = SAMPLE.replace("alts-trend", "doge-mean-reversion");
        assert!(BotFileConfig::parse(&broken).is_err());
    }

    #[test]
    fn rejects_stop_market_take_profit() {
        let broken = SAMPLE.replace("take_profit_kind = \"limit\"", "take_profit_kind = \"stop_market\"");
        assert!(BotFileConfig::parse(&broken).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = BotFileConfig::load("/nonexistent/bots.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
