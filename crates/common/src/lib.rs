pub mod config;
pub mod error;
pub mod exchange;
pub mod report;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use exchange::{Account, MarketData, OrderGateway};
pub use report::{ChannelReporter, CycleEvent, EventKind, ReportSink, TracingReporter};
pub use types::*;
