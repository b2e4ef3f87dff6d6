use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{Bar, ExitKind, Interval, OrderAck, OrderInstruction, OrderSide, Result};

/// Source of OHLCV candles.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// The last `limit` bars for `symbol`, oldest first, most recent last.
    async fn candles(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Vec<Bar>>;
}

/// Account queries.
#[async_trait]
pub trait Account: Send + Sync {
    /// Total wallet balance in the quote currency (USDT).
    async fn wallet_balance(&self) -> Result<Decimal>;
}

/// Abstraction over order submission.
///
/// `BinanceFuturesClient` implements this for live trading and `PaperClient`
/// for simulation. Every call is independent: the gateway neither verifies
/// fills nor cancels earlier orders when a later one fails.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Open a position with a market order.
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderAck>;

    /// Place a reduce-only, good-till-cancel exit order.
    async fn place_exit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        kind: ExitKind,
        price: Decimal,
    ) -> Result<OrderAck>;

    /// Dispatch one composed instruction to the matching call.
    async fn submit(&self, instruction: &OrderInstruction) -> Result<OrderAck> {
        match instruction {
            OrderInstruction::Market {
                symbol,
                side,
                quantity,
            } => self.place_market_order(symbol, *side, *quantity).await,
            OrderInstruction::Exit {
                symbol,
                side,
                quantity,
                kind,
                price,
            } => {
                self.place_exit_order(symbol, *side, *quantity, *kind, *price)
                    .await
            }
        }
    }
}
