pub mod binance;
pub mod context;
pub mod cycle;
pub mod executor;
pub mod scheduler;

pub use binance::BinanceFuturesClient;
pub use context::BotContext;
pub use cycle::{run_cycle, CycleOutcome};
pub use executor::{ExecutionReport, OrderExecutor, OrderOutcome};
pub use scheduler::SchedulerHandle;
