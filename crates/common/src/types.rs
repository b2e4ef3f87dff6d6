use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV candle as returned by the exchange. Sequences are oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle interval, serialized with Binance's shorthand (`1m`, `5m`, `1h`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        let minutes = match self {
            Interval::OneMinute => 1,
            Interval::ThreeMinutes => 3,
            Interval::FiveMinutes => 5,
            Interval::FifteenMinutes => 15,
            Interval::ThirtyMinutes => 30,
            Interval::OneHour => 60,
            Interval::FourHours => 240,
            Interval::OneDay => 1440,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest value of a MACD series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Latest value of a stochastic oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochPoint {
    pub k: f64,
    pub d: f64,
}

/// Latest Bollinger band envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

/// The most recent indicator values a rule looks at.
///
/// Indicator fields are `None` while the series is still warming up or when
/// the rule does not use that indicator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub prev_close: Option<f64>,
    pub volume: f64,
    pub avg_volume: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdPoint>,
    pub stochastic: Option<StochPoint>,
    pub bands: Option<BandPoint>,
}

impl std::fmt::Display for IndicatorSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "close {:.4}", self.close)?;
        if let (Some(fast), Some(slow)) = (self.ema_fast, self.ema_slow) {
            write!(f, " | EMA {fast:.4}/{slow:.4}")?;
        }
        if let Some(b) = self.bands {
            write!(f, " | BB {:.4}-{:.4}", b.lower, b.upper)?;
        }
        if let Some(rsi) = self.rsi {
            write!(f, " | RSI {rsi:.2}")?;
        }
        if let Some(m) = self.macd {
            write!(f, " | MACD {:.4} sig {:.4}", m.macd, m.signal)?;
        }
        if let Some(s) = self.stochastic {
            write!(f, " | Stoch K {:.2} D {:.2}", s.k, s.d)?;
        }
        if let Some(avg) = self.avg_volume {
            write!(f, " | vol {:.2} avg {avg:.2}", self.volume)?;
        }
        Ok(())
    }
}

/// Outcome of one signal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Long,
    Short,
    /// No trade this cycle.
    Neutral,
}

impl Signal {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::Neutral => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Neutral => write!(f, "NONE"),
        }
    }
}

/// Direction of a position to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the market order that opens the position.
    pub fn entry_side(&self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }

    /// Side of the reduce-only orders that close the position.
    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type used for a reduce-only exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// Resting limit order at the exit price.
    Limit,
    /// Market order triggered when the mark reaches the take-profit price.
    TakeProfitMarket,
    /// Market order triggered when the mark reaches the stop price.
    StopMarket,
}

impl ExitKind {
    /// Binance futures `type` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitKind::Limit => "LIMIT",
            ExitKind::TakeProfitMarket => "TAKE_PROFIT_MARKET",
            ExitKind::StopMarket => "STOP_MARKET",
        }
    }

    /// Stop-type orders carry their price as `stopPrice`.
    pub fn is_triggered(&self) -> bool {
        !matches!(self, ExitKind::Limit)
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange call produced by the order composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderInstruction {
    Market {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
    },
    Exit {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        kind: ExitKind,
        price: Decimal,
    },
}

impl OrderInstruction {
    pub fn symbol(&self) -> &str {
        match self {
            OrderInstruction::Market { symbol, .. } | OrderInstruction::Exit { symbol, .. } => {
                symbol
            }
        }
    }

    pub fn side(&self) -> OrderSide {
        match self {
            OrderInstruction::Market { side, .. } | OrderInstruction::Exit { side, .. } => *side,
        }
    }

    pub fn quantity(&self) -> Decimal {
        match self {
            OrderInstruction::Market { quantity, .. }
            | OrderInstruction::Exit { quantity, .. } => *quantity,
        }
    }

    /// Short label used in logs: `MARKET`, `LIMIT`, `STOP_MARKET`, ...
    pub fn label(&self) -> &'static str {
        match self {
            OrderInstruction::Market { .. } => "MARKET",
            OrderInstruction::Exit { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, OrderInstruction::Market { .. })
    }
}

/// Entry plus paired exits derived from one signal. Exists only while its
/// orders are being submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub take_profit_kind: ExitKind,
}

impl OrderPlan {
    /// Entry, take-profit and stop-loss, in submission order.
    pub fn instructions(&self) -> [OrderInstruction; 3] {
        let exit_side = self.direction.exit_side();
        [
            OrderInstruction::Market {
                symbol: self.symbol.clone(),
                side: self.direction.entry_side(),
                quantity: self.quantity,
            },
            OrderInstruction::Exit {
                symbol: self.symbol.clone(),
                side: exit_side,
                quantity: self.quantity,
                kind: self.take_profit_kind,
                price: self.take_profit,
            },
            OrderInstruction::Exit {
                symbol: self.symbol.clone(),
                side: exit_side,
                quantity: self.quantity,
                kind: ExitKind::StopMarket,
                price: self.stop_loss,
            },
        ]
    }
}

/// How the order quantity is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum Sizing {
    /// Spend `fraction` of the wallet balance (0 < fraction <= 1).
    EquityFraction { fraction: Decimal },
    /// Always trade the same quantity; the balance is never queried.
    FixedQuantity { quantity: Decimal },
}

/// Decimal places the exchange accepts for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Precision {
    pub quantity_dp: u32,
    pub price_dp: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            quantity_dp: 1,
            price_dp: 4,
        }
    }
}

/// Acknowledgement returned by the exchange for an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub status: String,
    /// Average fill price, when the exchange reports one.
    pub avg_price: Option<Decimal>,
}

/// Whether the bot is running against the real exchange or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}
