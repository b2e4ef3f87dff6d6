use std::time::Duration;

use rust_decimal::Decimal;

use crate::{Error, Result, TradingMode};

pub const DEFAULT_FUTURES_URL: &str = "https://fapi.binance.com";

/// Largest `recvWindow` Binance accepts.
const MAX_RECV_WINDOW_MS: u64 = 60_000;

/// Process configuration loaded from environment variables at startup.
///
/// Strategy parameters live in the bot config file (`BOT_CONFIG_PATH`), not
/// here.
#[derive(Clone)]
pub struct Config {
    // Exchange credentials, required in live mode
    pub binance_api_key: Option<String>,
    pub binance_secret: Option<String>,
    pub futures_base_url: String,
    pub http_timeout: Duration,
    pub recv_window_ms: u64,

    // Trading
    pub trading_mode: TradingMode,
    pub paper_balance_usdt: Decimal,
    pub paper_slippage_bps: Decimal,
    /// Recent paper orders kept in memory.
    pub paper_ledger_capacity: usize,

    // Bot config file path
    pub bot_config_path: String,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing credentials are an error
    /// only in live mode.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let trading_mode = match lookup("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        let binance_api_key = lookup("BINANCE_API_KEY").filter(|v| !v.trim().is_empty());
        let binance_secret = lookup("BINANCE_API_SECRET").filter(|v| !v.trim().is_empty());

        if trading_mode == TradingMode::Live {
            if binance_api_key.is_none() {
                return Err(missing("BINANCE_API_KEY"));
            }
            if binance_secret.is_none() {
                return Err(missing("BINANCE_API_SECRET"));
            }
        }

        let http_timeout_secs: u64 = parse_or("HTTP_TIMEOUT_SECS", &lookup, 10)?;
        if http_timeout_secs == 0 {
            return Err(Error::Config("HTTP_TIMEOUT_SECS must be positive".into()));
        }
        let recv_window_ms: u64 = parse_or("RECV_WINDOW_MS", &lookup, 5_000)?;
        if !(1..=MAX_RECV_WINDOW_MS).contains(&recv_window_ms) {
            return Err(Error::Config(format!(
                "RECV_WINDOW_MS must be between 1 and {MAX_RECV_WINDOW_MS}, got {recv_window_ms}"
            )));
        }

        Ok(Config {
            binance_api_key,
            binance_secret,
            futures_base_url: lookup("BINANCE_FUTURES_URL")
                .unwrap_or_else(|| DEFAULT_FUTURES_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            recv_window_ms,
            trading_mode,
            paper_balance_usdt: parse_or("PAPER_BALANCE_USDT", &lookup, Decimal::from(1_000))?,
            paper_slippage_bps: parse_or("PAPER_SLIPPAGE_BPS", &lookup, Decimal::from(5))?,
            paper_ledger_capacity: parse_or("PAPER_LEDGER_CAPACITY", &lookup, 1_000)?,
            bot_config_path: lookup("BOT_CONFIG_PATH")
                .unwrap_or_else(|| "config/bots.toml".to_string()),
        })
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("binance_api_key", &self.binance_api_key.as_ref().map(|_| "<set>"))
            .field("binance_secret", &self.binance_secret.as_ref().map(|_| "<set>"))
            .field("futures_base_url", &self.futures_base_url)
            .field("http_timeout", &self.http_timeout)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("trading_mode", &self.trading_mode)
            .field("paper_balance_usdt", &self.paper_balance_usdt)
            .field("paper_slippage_bps", &self.paper_slippage_bps)
            .field("paper_ledger_capacity", &self.paper_ledger_capacity)
            .field("bot_config_path", &self.bot_config_path)
            .finish()
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!(
        "Required environment variable '{key}' is not set. Check your .env file."
    ))
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}
