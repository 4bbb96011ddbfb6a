//! Price history module - temporal price ledger models, services, and traits.

mod price_history_model;
mod price_history_service;
mod price_history_traits;

#[cfg(test)]
mod price_history_service_tests;

pub use price_history_model::{
    closing_instant_for, resolve_current, NewPriceHistory, PriceHistory, PriceHistoryFilters,
    PriceHistoryOrderField, PriceKey,
};
pub use price_history_service::PriceHistoryService;
pub use price_history_traits::{PriceHistoryRepositoryTrait, PriceHistoryServiceTrait};
