use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use common::{
    Account, Bar, Config, Error, ExitKind, Interval, MarketData, OrderAck, OrderGateway,
    OrderSide, Result,
};

/// REST client for Binance USDⓈ-M futures.
///
/// Public endpoints (klines, server time) work without credentials; signed
/// endpoints (account, orders) fail with a config error when the key or
/// secret is missing.
pub struct BinanceFuturesClient {
    api_key: String,
    secret: String,
    base_url: String,
    recv_window_ms: u64,
    /// Server time minus local time, in milliseconds.
    time_offset_ms: AtomicI64,
    http: Client,
}

impl BinanceFuturesClient {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        recv_window_ms: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            recv_window_ms,
            time_offset_ms: AtomicI64::new(0),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.binance_api_key.clone().unwrap_or_default(),
            config.binance_secret.clone().unwrap_or_default(),
            config.futures_base_url.clone(),
            config.http_timeout,
            config.recv_window_ms,
        )
    }

    /// Measure the clock skew against `/fapi/v1/time` and apply it to every
    /// later signed request. Returns the offset in milliseconds.
    pub async fn sync_time(&self) -> Result<i64> {
        let before = Utc::now().timestamp_millis();
        let body = self.public_get("/fapi/v1/time", &[]).await?;
        let after = Utc::now().timestamp_millis();

        let time: ServerTime = serde_json::from_str(&body)?;
        let offset = time.server_time - (before + after) / 2;
        self.time_offset_ms.store(offset, Ordering::Relaxed);
        info!(offset_ms = offset, "Synchronized with exchange server time");
        Ok(offset)
    }

    fn timestamp_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + self.time_offset_ms.load(Ordering::Relaxed)
    }

    fn sign(&self, query: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("invalid API secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn public_get(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        check_status(status, body)
    }

    async fn signed(&self, method: Method, path: &str, mut params: Vec<(&str, String)>) -> Result<String> {
        if self.api_key.is_empty() || self.secret.is_empty() {
            return Err(Error::Config(format!(
                "{path} needs BINANCE_API_KEY and BINANCE_API_SECRET"
            )));
        }
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", self.timestamp_ms().to_string()));
        let query = encode(&params);
        let signature = self.sign(&query)?;
        let signed = format!("{query}&signature={signature}");
        let url = format!("{}{path}", self.base_url);

        let request = if method == Method::GET {
            self.http.get(format!("{url}?{signed}"))
        } else {
            self.http
                .request(method, &url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed)
        };

        let resp = request
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        check_status(status, text)
    }

    async fn post_order(&self, params: Vec<(&'static str, String)>) -> Result<OrderAck> {
        let body = self.signed(Method::POST, "/fapi/v1/order", params).await?;
        parse_order_ack(&body)
    }
}

#[async_trait]
impl MarketData for BinanceFuturesClient {
    async fn candles(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Vec<Bar>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        debug!(%symbol, %interval, limit, "Fetching klines");
        let fetch = async {
            let body = self.public_get("/fapi/v1/klines", &params).await?;
            parse_klines(&body)
        };
        fetch.await.map_err(|e| Error::DataFetch {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Account for BinanceFuturesClient {
    async fn wallet_balance(&self) -> Result<Decimal> {
        let body = self.signed(Method::GET, "/fapi/v2/account", Vec::new()).await?;
        let account: AccountResponse = serde_json::from_str(&body)?;
        Ok(account.total_wallet_balance)
    }
}

#[async_trait]
impl OrderGateway for BinanceFuturesClient {
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderAck> {
        debug!(%symbol, %side, %quantity, "Submitting market order");
        self.post_order(order_params(symbol, side, quantity, None, &new_client_order_id()))
            .await
    }

    async fn place_exit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        kind: ExitKind,
        price: Decimal,
    ) -> Result<OrderAck> {
        debug!(%symbol, %side, %quantity, %kind, %price, "Submitting exit order");
        self.post_order(order_params(
            symbol,
            side,
            quantity,
            Some((kind, price)),
            &new_client_order_id(),
        ))
        .await
    }
}

fn new_client_order_id() -> String {
    // Binance caps the id at 36 characters; a simple uuid is 32.
    uuid::Uuid::new_v4().simple().to_string()
}

/// Form parameters for `POST /fapi/v1/order`. `exit` turns the order into a
/// reduce-only exit of the given kind.
pub(crate) fn order_params(
    symbol: &str,
    side: OrderSide,
    quantity: Decimal,
    exit: Option<(ExitKind, Decimal)>,
    client_order_id: &str,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", symbol.to_string()),
        ("side", side.to_string()),
    ];
    match exit {
        None => params.push(("type", "MARKET".to_string())),
        Some((kind, price)) => {
            params.push(("type", kind.as_str().to_string()));
            if kind.is_triggered() {
                params.push(("stopPrice", price.normalize().to_string()));
            } else {
                params.push(("price", price.normalize().to_string()));
                params.push(("timeInForce", "GTC".to_string()));
            }
            params.push(("reduceOnly", "true".to_string()));
        }
    }
    params.push(("quantity", quantity.normalize().to_string()));
    params.push(("newClientOrderId", client_order_id.to_string()));
    params
}

/// `k=v&k=v`. Values are symbols, enum names, decimals and ids, none of
/// which need escaping.
fn encode(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn check_status(status: StatusCode, body: String) -> Result<String> {
    if status.is_success() {
        return Ok(body);
    }
    let (code, message) = match serde_json::from_str::<ApiError>(&body) {
        Ok(err) => (Some(err.code), err.msg),
        Err(_) => (None, body),
    };
    Err(Error::Exchange {
        status: status.as_u16(),
        code,
        message,
    })
}

/// Klines arrive as positional arrays:
/// `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
pub(crate) fn parse_klines(body: &str) -> Result<Vec<Bar>> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)?;
    rows.iter().map(|row| parse_kline(row)).collect()
}

fn parse_kline(row: &[serde_json::Value]) -> Result<Bar> {
    if row.len() < 6 {
        return Err(Error::Other(format!("kline row has {} fields", row.len())));
    }
    let open_ms = row[0]
        .as_i64()
        .ok_or_else(|| Error::Other(format!("bad kline open time {}", row[0])))?;
    let open_time = Utc
        .timestamp_millis_opt(open_ms)
        .single()
        .ok_or_else(|| Error::Other(format!("kline open time {open_ms} out of range")))?;
    let num = |i: usize| -> Result<f64> {
        row[i]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| row[i].as_f64())
            .ok_or_else(|| Error::Other(format!("bad kline field {i}: {}", row[i])))
    };
    Ok(Bar {
        open_time,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

fn parse_order_ack(body: &str) -> Result<OrderAck> {
    let resp: OrderResponse = serde_json::from_str(body)?;
    Ok(OrderAck {
        order_id: resp.order_id.to_string(),
        client_order_id: resp.client_order_id,
        symbol: resp.symbol,
        side: resp.side,
        status: resp.status,
        avg_price: resp.avg_price.filter(|p| *p > Decimal::ZERO),
    })
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    total_wallet_balance: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    client_order_id: String,
    symbol: String,
    side: OrderSide,
    status: String,
    #[serde(default)]
    avg_price: Option<Decimal>,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}
