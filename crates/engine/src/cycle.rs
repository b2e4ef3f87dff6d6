use rust_decimal::Decimal;
use tracing::{debug, warn};

use common::{Error, EventKind, Result, Sizing};
use strategy::SignalRule;

use crate::context::BotContext;
use crate::executor::{ExecutionReport, OrderExecutor};

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Candles or balance could not be fetched.
    DataUnavailable,
    InsufficientData,
    NoSignal,
    /// A signal fired but no plan could be built.
    PlanRejected,
    Executed(ExecutionReport),
}

/// One evaluation for one symbol: fetch, evaluate, and on a signal size,
/// compose and execute. Every failure is reported through the context and
/// ends the cycle; nothing propagates to the scheduler.
pub async fn run_cycle(ctx: &BotContext, symbol: &str) -> CycleOutcome {
    let bot = &ctx.bot;

    let bars = match ctx.market.candles(symbol, bot.interval, bot.candle_limit).await {
        Ok(bars) => bars,
        Err(e) => {
            ctx.report(symbol, EventKind::DataFetchFailed { error: e.to_string() });
            return CycleOutcome::DataUnavailable;
        }
    };

    let (snapshot, signal) = match bot.rule.assess(&bars) {
        Ok(assessed) => assessed,
        Err(Error::InsufficientData { have, need }) => {
            ctx.report(symbol, EventKind::InsufficientData { have, need });
            return CycleOutcome::InsufficientData;
        }
        Err(e) => {
            ctx.report(symbol, EventKind::DataFetchFailed { error: e.to_string() });
            return CycleOutcome::DataUnavailable;
        }
    };
    ctx.report(symbol, EventKind::CycleEvaluated { snapshot, signal });

    let Some(direction) = signal.direction() else {
        return CycleOutcome::NoSignal;
    };
    ctx.report(symbol, EventKind::SignalFired { signal, price: snapshot.close });

    let entry_price = match risk::decimal_price(snapshot.close) {
        Ok(price) => price,
        Err(e) => return reject(ctx, symbol, e),
    };

    let quantity = match order_quantity(ctx, symbol, entry_price).await {
        Ok(quantity) => quantity,
        Err(e @ Error::DataFetch { .. }) => {
            ctx.report(symbol, EventKind::DataFetchFailed { error: e.to_string() });
            return CycleOutcome::DataUnavailable;
        }
        Err(Error::InsufficientBalance(reason)) => {
            ctx.report(symbol, EventKind::InsufficientBalance { reason });
            return CycleOutcome::PlanRejected;
        }
        Err(e) => return reject(ctx, symbol, e),
    };

    let plan = match risk::compose(symbol, direction, entry_price, quantity, &ctx.exit_params(symbol)) {
        Ok(plan) => plan,
        Err(e) => return reject(ctx, symbol, e),
    };
    ctx.report(symbol, EventKind::PlanComposed { plan: plan.clone() });

    let report = OrderExecutor::new(ctx.gateway.clone()).execute(&plan).await;
    for outcome in &report.outcomes {
        let order = outcome.instruction.label();
        let kind = match &outcome.result {
            Ok(ack) => EventKind::OrderPlaced { order, ack: ack.clone() },
            Err(e) => EventKind::OrderFailed { order, error: e.to_string() },
        };
        ctx.report(symbol, kind);
    }
    let accepted = report.acks().count();
    if report.entry_placed() && !report.is_complete() {
        warn!(
            bot = %bot.name,
            %symbol,
            %direction,
            accepted,
            "Entry placed but not every exit order was accepted"
        );
    }
    debug!(bot = %bot.name, %symbol, %direction, accepted, complete = report.is_complete(), "Cycle finished");
    CycleOutcome::Executed(report)
}

/// Order quantity per the bot's sizing mode. Only equity sizing touches the
/// account; a failed balance query comes back as `DataFetch`.
async fn order_quantity(ctx: &BotContext, symbol: &str, price: Decimal) -> Result<Decimal> {
    let quantity_dp = ctx.bot.precision_for(symbol).quantity_dp;
    match ctx.bot.sizing {
        Sizing::FixedQuantity { quantity } => risk::fixed(quantity, quantity_dp),
        Sizing::EquityFraction { fraction } => {
            let balance = ctx
                .account
                .wallet_balance()
                .await
                .map_err(|e| Error::DataFetch {
                    symbol: symbol.to_string(),
                    reason: format!("wallet balance: {e}"),
                })?;
            risk::size(balance, fraction, price, quantity_dp)
        }
    }
}

fn reject(ctx: &BotContext, symbol: &str, error: Error) -> CycleOutcome {
    ctx.report(symbol, EventKind::PlanRejected { error: error.to_string() });
    CycleOutcome::PlanRejected
}
