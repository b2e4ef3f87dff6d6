use std::sync::Arc;

use common::{Account, CycleEvent, EventKind, MarketData, OrderGateway, ReportSink};
use risk::ExitParams;
use strategy::BotConfig;

/// Everything a cycle needs, passed in explicitly.
///
/// One context per bot; its symbols share it across their ticker tasks.
pub struct BotContext {
    pub market: Arc<dyn MarketData>,
    pub account: Arc<dyn Account>,
    pub gateway: Arc<dyn OrderGateway>,
    pub bot: BotConfig,
    pub reporter: Arc<dyn ReportSink>,
}

impl BotContext {
    pub fn report(&self, symbol: &str, kind: EventKind) {
        self.reporter.report(CycleEvent {
            bot: self.bot.name.clone(),
            symbol: symbol.to_string(),
            kind,
        });
    }

    pub fn exit_params(&self, symbol: &str) -> ExitParams {
        ExitParams {
            stop_loss_pct: self.bot.stop_loss_pct,
            take_profit_pct: self.bot.take_profit_pct,
            take_profit_kind: self.bot.take_profit_kind,
            price_dp: self.bot.precision_for(symbol).price_dp,
        }
    }
}
