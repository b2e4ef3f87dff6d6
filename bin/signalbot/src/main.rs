use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Account, Config, MarketData, OrderGateway, ReportSink, TracingReporter, TradingMode};
use engine::{scheduler, BinanceFuturesClient, BotContext};
use paper::PaperClient;
use strategy::BotFileConfig;

/// Market data, account and order gateway for the selected trading mode.
struct Exchange {
    market: Arc<dyn MarketData>,
    account: Arc<dyn Account>,
    gateway: Arc<dyn OrderGateway>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid environment configuration")?;
    info!(mode = %cfg.trading_mode, base_url = %cfg.futures_base_url, "signalbot starting");

    let bot_file = BotFileConfig::load(&cfg.bot_config_path)?;
    info!(path = %cfg.bot_config_path, bots = bot_file.bots.len(), "Bot config loaded");

    // ── Exchange (injected based on TRADING_MODE) ─────────────────────────────
    let binance = Arc::new(
        BinanceFuturesClient::from_config(&cfg).context("failed to build Binance client")?,
    );
    let exchange = match cfg.trading_mode {
        TradingMode::Live => {
            if let Err(e) = binance.sync_time().await {
                warn!(error = %e, "Server time sync failed, using local clock");
            }
            info!("Live trading mode, orders go to Binance futures");
            Exchange {
                market: binance.clone(),
                account: binance.clone(),
                gateway: binance,
            }
        }
        TradingMode::Paper => {
            info!(
                balance = %cfg.paper_balance_usdt,
                slippage_bps = %cfg.paper_slippage_bps,
                "Paper trading mode, orders are simulated"
            );
            let paper = Arc::new(PaperClient::new(
                binance,
                cfg.paper_balance_usdt,
                cfg.paper_slippage_bps,
            )
            .with_ledger_capacity(cfg.paper_ledger_capacity));
            Exchange {
                market: paper.clone(),
                account: paper.clone(),
                gateway: paper,
            }
        }
    };

    // ── Connectivity probe ────────────────────────────────────────────────────
    let balance = exchange
        .account
        .wallet_balance()
        .await
        .context("connectivity check failed: could not read wallet balance")?;
    info!(balance = %balance, "Connected, wallet balance USDT");

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let reporter: Arc<dyn ReportSink> = Arc::new(TracingReporter);
    let bots = bot_file
        .bots
        .into_iter()
        .map(|bot| {
            Arc::new(BotContext {
                market: exchange.market.clone(),
                account: exchange.account.clone(),
                gateway: exchange.gateway.clone(),
                bot,
                reporter: reporter.clone(),
            })
        })
        .collect();
    let handle = scheduler::spawn(bots);
    info!(tickers = handle.ticker_count(), "All bots started. Waiting for shutdown signal.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");
    handle.stop().await;
    Ok(())
}
