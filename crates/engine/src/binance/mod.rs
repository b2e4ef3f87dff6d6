mod rest;

pub use rest::BinanceFuturesClient;
