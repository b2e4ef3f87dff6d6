use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use common::EventKind;

use crate::context::BotContext;
use crate::cycle::run_cycle;

/// Stops the tickers started by [`spawn`].
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Number of (bot, symbol) tickers running.
    pub fn ticker_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every ticker and wait for them to exit. Each ticker first
    /// waits for its in-flight cycle, so a plan whose entry was sent still
    /// gets its exit orders before this returns.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Ticker task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

/// Start one ticker per (bot, symbol). Each runs a cycle immediately, then
/// once per the bot's poll period.
pub fn spawn(bots: Vec<Arc<BotContext>>) -> SchedulerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    for ctx in bots {
        for symbol in ctx.bot.symbols.clone() {
            info!(
                bot = %ctx.bot.name,
                symbol = %symbol,
                interval = %ctx.bot.interval,
                period = ?ctx.bot.poll_period(),
                rule = ctx.bot.rule.name(),
                "Starting ticker"
            );
            tasks.push(tokio::spawn(ticker(ctx.clone(), symbol, shutdown_rx.clone())));
        }
    }

    SchedulerHandle { shutdown_tx, tasks }
}

async fn ticker(ctx: Arc<BotContext>, symbol: String, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(ctx.bot.poll_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if in_flight.as_ref().is_some_and(|cycle| !cycle.is_finished()) {
                    ctx.report(&symbol, EventKind::CycleSkipped);
                    continue;
                }
                // Already finished; awaiting only surfaces a panic.
                if let Some(done) = in_flight.take() {
                    if let Err(e) = done.await {
                        warn!(bot = %ctx.bot.name, symbol = %symbol, error = %e, "Cycle task ended abnormally");
                    }
                }
                let ctx = ctx.clone();
                let symbol = symbol.clone();
                in_flight = Some(tokio::spawn(async move {
                    run_cycle(&ctx, &symbol).await;
                }));
            }
        }
    }

    if let Some(cycle) = in_flight {
        if !cycle.is_finished() {
            info!(bot = %ctx.bot.name, symbol = %symbol, "Waiting for in-flight cycle");
        }
        if let Err(e) = cycle.await {
            warn!(bot = %ctx.bot.name, symbol = %symbol, error = %e, "Cycle task ended abnormally");
        }
    }
}
