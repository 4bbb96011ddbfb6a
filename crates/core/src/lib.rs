//! Pricewatch Core - flyer lifecycle and temporal price ledger.
//!
//! This crate contains the domain logic for processing flyers and resolving
//! current prices. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod flyers;
pub mod price_history;
pub mod query;
pub mod settings;
pub mod utils;

// Re-export error types
pub use errors::DatabaseError;
pub use errors::Error;
pub use errors::ErrorKind;
pub use errors::Result;
