//! Utility modules

pub mod alerts;
pub mod chain;
pub mod logger;
pub mod market;
pub mod metrics;

pub use alerts::{AlertChannel, AlertDispatcher, LogChannel, TelegramChannel};
pub use chain::{ChainClient, ChainService};
pub use logger::init_logger;
pub use market::{DexScreenerClient, MarketSource};
pub use metrics::MetricsService;
