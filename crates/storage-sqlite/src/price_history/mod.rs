//! SQLite storage implementation for the price ledger.

mod model;
mod repository;

pub use model::{NewPriceHistoryDB, PriceHistoryDB};
pub use repository::PriceHistoryRepository;
