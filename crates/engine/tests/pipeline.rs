use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{
    Account, Bar, ChannelReporter, Error, EventKind, ExitKind, Interval, MarketData, OrderAck,
    OrderGateway, OrderInstruction, OrderSide, Result,
};
use engine::{run_cycle, BotContext, CycleOutcome};
use strategy::BotFileConfig;

// ─── Fakes ────────────────────────────────────────────────────────────────────

struct FixedBars(Vec<Bar>);

#[async_trait]
impl MarketData for FixedBars {
    async fn candles(&self, _: &str, _: Interval, limit: usize) -> Result<Vec<Bar>> {
        let start = self.0.len().saturating_sub(limit);
        Ok(self.0[start..].to_vec())
    }
}

struct FailingMarket;

#[async_trait]
impl MarketData for FailingMarket {
    async fn candles(&self, symbol: &str, _: Interval, _: usize) -> Result<Vec<Bar>> {
        Err(Error::DataFetch {
            symbol: symbol.into(),
            reason: "connection reset".into(),
        })
    }
}

struct Wallet(Option<Decimal>);

#[async_trait]
impl Account for Wallet {
    async fn wallet_balance(&self) -> Result<Decimal> {
        self.0.ok_or_else(|| Error::Http("timeout".into()))
    }
}

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<OrderInstruction>>,
    /// Exit type the exchange refuses.
    refuse: Option<ExitKind>,
}

impl RecordingGateway {
    fn record(&self, instruction: OrderInstruction) -> Result<OrderAck> {
        let mut sent = self.sent.lock().unwrap();
        let ack = OrderAck {
            order_id: sent.len().to_string(),
            client_order_id: format!("rec-{}", sent.len()),
            symbol: instruction.symbol().to_string(),
            side: instruction.side(),
            status: "NEW".into(),
            avg_price: None,
        };
        sent.push(instruction);
        Ok(ack)
    }

    fn sent(&self) -> Vec<OrderInstruction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn place_market_order(&self, symbol: &str, side: OrderSide, quantity: Decimal) -> Result<OrderAck> {
        self.record(OrderInstruction::Market {
            symbol: symbol.into(),
            side,
            quantity,
        })
    }

    async fn place_exit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        kind: ExitKind,
        price: Decimal,
    ) -> Result<OrderAck> {
        if self.refuse == Some(kind) {
            return Err(Error::Exchange {
                status: 400,
                code: Some(-2021),
                message: "Order would immediately trigger.".into(),
            });
        }
        self.record(OrderInstruction::Exit {
            symbol: symbol.into(),
            side,
            quantity,
            kind,
            price,
        })
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            open_time: start + Duration::minutes(5 * i as i64),
            open: close,
            high: close + 0.05,
            low: close - 0.05,
            close,
            volume: 1_000.0,
        })
        .collect()
}

/// Steady uptrend, then one bar dumping through the lower band: a LONG for
/// the default mean-reversion rule.
fn dip_in_uptrend() -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..59).map(|i| 100.0 + 0.1 * i as f64).collect();
    let last = closes[closes.len() - 1];
    closes.push(last - 3.0);
    bars_from_closes(&closes)
}

fn bot(sizing: &str) -> strategy::BotConfig {
    let toml = format!(
        r#"
[[bot]]
name = "test-bot"
symbols = ["TESTUSDT"]
interval = "5m"
candle_limit = 60
stop_loss_pct = 0.8
take_profit_pct = 1.5

[bot.sizing]
{sizing}

[bot.rule]
kind = "mean_reversion"
"#
    );
    BotFileConfig::parse(&toml).unwrap().bots.remove(0)
}

fn context(
    market: Arc<dyn MarketData>,
    balance: Option<Decimal>,
    sizing: &str,
) -> (BotContext, Arc<RecordingGateway>, tokio::sync::mpsc::UnboundedReceiver<common::CycleEvent>) {
    context_with_gateway(market, balance, sizing, RecordingGateway::default())
}

fn context_with_gateway(
    market: Arc<dyn MarketData>,
    balance: Option<Decimal>,
    sizing: &str,
    gateway: RecordingGateway,
) -> (BotContext, Arc<RecordingGateway>, tokio::sync::mpsc::UnboundedReceiver<common::CycleEvent>) {
    let gateway = Arc::new(gateway);
    let (reporter, rx) = ChannelReporter::new();
    let ctx = BotContext {
        market,
        account: Arc::new(Wallet(balance)),
        gateway: gateway.clone(),
        bot: bot(sizing),
        reporter: Arc::new(reporter),
    };
    (ctx, gateway, rx)
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<common::CycleEvent>) -> Vec<EventKind> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.kind);
    }
    events
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_signal_places_entry_and_both_exits() {
    let (ctx, gateway, mut rx) = context(
        Arc::new(FixedBars(dip_in_uptrend())),
        Some(dec!(2000)),
        "mode = \"equity_fraction\"\nfraction = 1.0",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    let CycleOutcome::Executed(report) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert!(report.is_complete());

    let sent = gateway.sent();
    assert_eq!(sent.len(), 3);
    let quantity = sent[0].quantity();
    assert!(quantity > Decimal::ZERO);
    assert!(sent.iter().all(|o| o.quantity() == quantity && o.symbol() == "TESTUSDT"));

    assert!(matches!(sent[0], OrderInstruction::Market { side: OrderSide::Buy, .. }));
    let (tp, sl) = match (&sent[1], &sent[2]) {
        (
            OrderInstruction::Exit { side: OrderSide::Sell, kind: ExitKind::TakeProfitMarket, price: tp, .. },
            OrderInstruction::Exit { side: OrderSide::Sell, kind: ExitKind::StopMarket, price: sl, .. },
        ) => (*tp, *sl),
        other => panic!("unexpected exits {other:?}"),
    };
    assert!(sl < tp);

    // 2000 USDT at ~102.8 with one quantity decimal.
    assert_eq!(quantity, dec!(19.5));

    let events = drain(&mut rx);
    assert!(matches!(events[0], EventKind::CycleEvaluated { signal: common::Signal::Long, .. }));
    assert!(matches!(events[1], EventKind::SignalFired { .. }));
    assert!(matches!(events[2], EventKind::PlanComposed { .. }));
    assert_eq!(
        events.iter().filter(|e| matches!(e, EventKind::OrderPlaced { .. })).count(),
        3
    );
}

#[tokio::test]
async fn refused_stop_loss_leaves_entry_and_take_profit() {
    let (ctx, gateway, mut rx) = context_with_gateway(
        Arc::new(FixedBars(dip_in_uptrend())),
        Some(dec!(2000)),
        "mode = \"equity_fraction\"\nfraction = 1.0",
        RecordingGateway {
            refuse: Some(ExitKind::StopMarket),
            ..RecordingGateway::default()
        },
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    let CycleOutcome::Executed(report) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert!(report.entry_placed());
    assert!(!report.is_complete());
    assert_eq!(report.acks().count(), 2);
    assert_eq!(gateway.sent().len(), 2);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::OrderFailed { order: "STOP_MARKET", .. })));
}

#[tokio::test]
async fn fixed_quantity_never_queries_balance() {
    // No balance available: a balance query would abort the cycle.
    let (ctx, gateway, _rx) = context(
        Arc::new(FixedBars(dip_in_uptrend())),
        None,
        "mode = \"fixed_quantity\"\nquantity = 20",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    assert!(matches!(outcome, CycleOutcome::Executed(_)));
    assert!(gateway.sent().iter().all(|o| o.quantity() == dec!(20)));
}

#[tokio::test]
async fn balance_failure_aborts_without_orders() {
    let (ctx, gateway, mut rx) = context(
        Arc::new(FixedBars(dip_in_uptrend())),
        None,
        "mode = \"equity_fraction\"\nfraction = 0.5",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    assert!(matches!(outcome, CycleOutcome::DataUnavailable));
    assert!(gateway.sent().is_empty());
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, EventKind::DataFetchFailed { error } if error.contains("wallet balance"))));
}

#[tokio::test]
async fn empty_wallet_reports_insufficient_balance() {
    let (ctx, gateway, mut rx) = context(
        Arc::new(FixedBars(dip_in_uptrend())),
        Some(dec!(0)),
        "mode = \"equity_fraction\"\nfraction = 0.5",
    );

    run_cycle(&ctx, "TESTUSDT").await;
    assert!(gateway.sent().is_empty());
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, EventKind::InsufficientBalance { .. })));
}

#[tokio::test]
async fn short_history_is_reported_and_skipped() {
    let bars = dip_in_uptrend()[..30].to_vec();
    let (ctx, gateway, mut rx) = context(
        Arc::new(FixedBars(bars)),
        Some(dec!(2000)),
        "mode = \"equity_fraction\"\nfraction = 1.0",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    assert!(matches!(outcome, CycleOutcome::InsufficientData));
    assert!(gateway.sent().is_empty());
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [EventKind::InsufficientData { have: 30, need: 50 }]
    ));
}

#[tokio::test]
async fn flat_market_sends_nothing() {
    let (ctx, gateway, mut rx) = context(
        Arc::new(FixedBars(bars_from_closes(&[1.0; 60]))),
        Some(dec!(2000)),
        "mode = \"equity_fraction\"\nfraction = 1.0",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    assert!(matches!(outcome, CycleOutcome::NoSignal));
    assert!(gateway.sent().is_empty());
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [EventKind::CycleEvaluated { signal: common::Signal::Neutral, .. }]
    ));
}

#[tokio::test]
async fn candle_failure_is_reported() {
    let (ctx, gateway, mut rx) = context(
        Arc::new(FailingMarket),
        Some(dec!(2000)),
        "mode = \"equity_fraction\"\nfraction = 1.0",
    );

    let outcome = run_cycle(&ctx, "TESTUSDT").await;
    assert!(matches!(outcome, CycleOutcome::DataUnavailable));
    assert!(gateway.sent().is_empty());
    assert!(matches!(drain(&mut rx).as_slice(), [EventKind::DataFetchFailed { .. }]));
}
