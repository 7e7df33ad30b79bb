pub mod account;
pub mod activity;
pub mod config;
pub mod instruction;
pub mod schema;

pub use account::{AccountReport, Holdings, PortfolioPoint, Side, TransactionRecord};
pub use activity::{LogCategory, LogEntry};
pub use config::{AppConfig, FloorConfig, MarketConfig, StoreConfig, TraderConfig};
pub use instruction::{DecisionRequest, Mode, TradeInstruction};
