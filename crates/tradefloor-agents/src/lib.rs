pub mod engine;
pub mod error;
pub mod floor;
pub mod parser;
pub mod prompts;
pub mod trader;

pub mod test_support;

pub use engine::{ClaudeEngine, DecisionEngine};
pub use error::EngineError;
pub use floor::{FloorOptions, TickSummary, TradingFloor};
pub use trader::{RunState, TraderContext};
