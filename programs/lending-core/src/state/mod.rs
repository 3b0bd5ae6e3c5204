pub mod ledger;
pub mod liquidator_registry;
pub mod market_config;
pub mod price_book;

pub use ledger::*;
pub use liquidator_registry::*;
pub use market_config::*;
pub use price_book::*;
