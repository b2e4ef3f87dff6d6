use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    Account, Bar, Error, ExitKind, Interval, MarketData, OrderAck, OrderGateway, OrderSide, Result,
};

/// An order accepted by the paper exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// `None` for market entries.
    pub exit: Option<(ExitKind, Decimal)>,
    /// Fill price for market orders, `None` for resting exits.
    pub fill_price: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
}

/// Orders kept in memory by default; older ones are dropped.
const DEFAULT_LEDGER_CAPACITY: usize = 1_000;

/// Most recent orders plus the id counter, which keeps counting past
/// evicted entries.
struct Ledger {
    next_id: u64,
    capacity: usize,
    recent: VecDeque<PaperOrder>,
}

/// Simulated exchange for paper trading.
///
/// Candles come from a real market data source; orders never leave the
/// process. Market orders fill at the last seen close with slippage, exits
/// rest as `NEW` and are never triggered. The wallet balance is fixed.
pub struct PaperClient {
    market: Arc<dyn MarketData>,
    balance: Decimal,
    /// Slippage in basis points applied to market fills.
    slippage_bps: Decimal,
    /// Latest close per symbol, updated on every candle fetch.
    last_close: RwLock<HashMap<String, Decimal>>,
    ledger: RwLock<Ledger>,
}

impl PaperClient {
    pub fn new(market: Arc<dyn MarketData>, balance: Decimal, slippage_bps: Decimal) -> Self {
        info!(balance = %balance, slippage_bps = %slippage_bps, "PaperClient initialized");
        Self {
            market,
            balance,
            slippage_bps,
            last_close: RwLock::new(HashMap::new()),
            ledger: RwLock::new(Ledger {
                next_id: 1,
                capacity: DEFAULT_LEDGER_CAPACITY,
                recent: VecDeque::new(),
            }),
        }
    }

    /// Keep at most `capacity` orders (at least one).
    pub fn with_ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger.get_mut().capacity = capacity.max(1);
        self
    }

    /// The most recent accepted orders, oldest first.
    pub async fn orders(&self) -> Vec<PaperOrder> {
        self.ledger.read().await.recent.iter().cloned().collect()
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.last_close.write().await.insert(symbol.to_string(), price);
    }

    async fn record(&self, mut order: PaperOrder) -> OrderAck {
        let mut ledger = self.ledger.write().await;
        order.order_id = ledger.next_id;
        ledger.next_id += 1;
        let ack = OrderAck {
            order_id: order.order_id.to_string(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            status: if order.fill_price.is_some() { "FILLED" } else { "NEW" }.to_string(),
            avg_price: order.fill_price,
        };
        if ledger.recent.len() == ledger.capacity {
            ledger.recent.pop_front();
        }
        ledger.recent.push_back(order);
        ack
    }
}

fn check_quantity(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(Error::Exchange {
            status: 400,
            code: Some(-4003),
            message: format!("Quantity less than or equal to zero: {quantity}"),
        });
    }
    Ok(())
}

fn paper_id() -> String {
    format!("paper-{}", uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl MarketData for PaperClient {
    async fn candles(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Vec<Bar>> {
        let bars = self.market.candles(symbol, interval, limit).await?;
        if let Some(close) = bars.last().and_then(|b| Decimal::from_f64(b.close)) {
            self.set_price(symbol, close).await;
        }
        Ok(bars)
    }
}

#[async_trait]
impl Account for PaperClient {
    async fn wallet_balance(&self) -> Result<Decimal> {
        Ok(self.balance)
    }
}

#[async_trait]
impl OrderGateway for PaperClient {
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderAck> {
        check_quantity(quantity)?;
        let mid = self.last_close.read().await.get(symbol).copied().ok_or_else(|| {
            Error::Exchange {
                status: 400,
                code: None,
                message: format!("PaperClient has no price for '{symbol}'; fetch candles first"),
            }
        })?;

        // Buys pay more, sells receive less
        let slip = self.slippage_bps / Decimal::from(10_000);
        let fill_price = match side {
            OrderSide::Buy => mid * (Decimal::ONE + slip),
            OrderSide::Sell => mid * (Decimal::ONE - slip),
        };
        debug!(%symbol, %side, %mid, fill = %fill_price, qty = %quantity, "Paper fill simulated");

        Ok(self
            .record(PaperOrder {
                order_id: 0,
                client_order_id: paper_id(),
                symbol: symbol.to_string(),
                side,
                quantity,
                exit: None,
                fill_price: Some(fill_price),
                placed_at: Utc::now(),
            })
            .await)
    }

    async fn place_exit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        kind: ExitKind,
        price: Decimal,
    ) -> Result<OrderAck> {
        check_quantity(quantity)?;
        if price <= Decimal::ZERO {
            return Err(Error::InvalidPrice(format!("{kind} at {price}")));
        }
        debug!(%symbol, %side, %kind, %price, qty = %quantity, "Paper exit resting");

        Ok(self
            .record(PaperOrder {
                order_id: 0,
                client_order_id: paper_id(),
                symbol: symbol.to_string(),
                side,
                quantity,
                exit: Some((kind, price)),
                fill_price: None,
                placed_at: Utc::now(),
            })
            .await)
    }
}
