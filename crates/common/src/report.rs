use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{IndicatorSnapshot, OrderAck, OrderPlan, Signal};

/// Something that happened while running one cycle for one symbol.
#[derive(Debug, Clone)]
pub struct CycleEvent {
    pub bot: String,
    pub symbol: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// Indicators were computed and the rule produced a signal (possibly NONE).
    CycleEvaluated {
        snapshot: IndicatorSnapshot,
        signal: Signal,
    },
    /// Too few bars for the slowest indicator; the cycle was skipped.
    InsufficientData { have: usize, need: usize },
    /// Candle or balance query failed; the cycle was skipped.
    DataFetchFailed { error: String },
    SignalFired { signal: Signal, price: f64 },
    /// Sized quantity was not positive; no orders were sent.
    InsufficientBalance { reason: String },
    PlanComposed { plan: OrderPlan },
    /// Price conversion, sizing or composition failed; no orders were sent.
    PlanRejected { error: String },
    OrderPlaced { order: &'static str, ack: OrderAck },
    OrderFailed { order: &'static str, error: String },
    /// A tick arrived while the previous cycle for this symbol was still running.
    CycleSkipped,
}

/// Destination for cycle events.
pub trait ReportSink: Send + Sync {
    fn report(&self, event: CycleEvent);
}

/// Writes every event as a human-readable log line.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl ReportSink for TracingReporter {
    fn report(&self, event: CycleEvent) {
        let CycleEvent { bot, symbol, kind } = event;
        match kind {
            EventKind::CycleEvaluated { snapshot, signal } => {
                info!(bot = %bot, symbol = %symbol, signal = %signal, "{snapshot}");
            }
            EventKind::InsufficientData { have, need } => {
                warn!(bot = %bot, symbol = %symbol, have, need, "Not enough bars for indicators, skipping cycle");
            }
            EventKind::DataFetchFailed { error } => {
                error!(bot = %bot, symbol = %symbol, error = %error, "Data fetch failed, skipping cycle");
            }
            EventKind::SignalFired { signal, price } => {
                info!(bot = %bot, symbol = %symbol, signal = %signal, price, "Signal fired");
            }
            EventKind::InsufficientBalance { reason } => {
                warn!(bot = %bot, symbol = %symbol, reason = %reason, "Insufficient balance, no orders sent");
            }
            EventKind::PlanComposed { plan } => {
                info!(
                    bot = %bot,
                    symbol = %symbol,
                    direction = %plan.direction,
                    qty = %plan.quantity,
                    entry = %plan.entry_price,
                    tp = %plan.take_profit,
                    sl = %plan.stop_loss,
                    "Order plan composed"
                );
            }
            EventKind::PlanRejected { error } => {
                warn!(bot = %bot, symbol = %symbol, error = %error, "Order plan rejected, no orders sent");
            }
            EventKind::OrderPlaced { order, ack } => {
                info!(
                    bot = %bot,
                    symbol = %symbol,
                    order,
                    side = %ack.side,
                    order_id = %ack.order_id,
                    status = %ack.status,
                    "Order placed"
                );
            }
            EventKind::OrderFailed { order, error } => {
                error!(bot = %bot, symbol = %symbol, order, error = %error, "Order failed");
            }
            EventKind::CycleSkipped => {
                warn!(bot = %bot, symbol = %symbol, "Previous cycle still running, tick skipped");
            }
        }
    }
}

/// Forwards events to an mpsc channel. Events are dropped once the receiver
/// is gone.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<CycleEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelReporter {
    fn report(&self, event: CycleEvent) {
        let _ = self.tx.send(event);
    }
}
