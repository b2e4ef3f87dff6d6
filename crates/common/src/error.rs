use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Data fetch failed for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("Insufficient data: have {have} bars, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid order plan: {0}")]
    InvalidPlan(String),

    #[error("{kind} order failed: {reason}")]
    OrderSubmission { kind: String, reason: String },

    #[error("Exchange API error (HTTP {status}, code {code:?}): {message}")]
    Exchange {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
