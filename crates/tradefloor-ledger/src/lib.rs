pub mod activity;
pub mod error;
pub mod ledger;
pub mod reports;
pub mod store;

pub use activity::ActivityLog;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use store::{AccountRow, LedgerStore};
