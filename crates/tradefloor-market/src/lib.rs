pub mod calendar;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod quotes;

pub mod test_support;

pub use calendar::{AlwaysOpen, MarketCalendar, NyseCalendar};
pub use error::MarketError;
pub use gateway::PriceSource;
pub use quotes::{QuoteReader, QuoteRow, QuoteWriter};
