use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::price_history_model::{NewPriceHistory, PriceHistory, PriceHistoryFilters};
use crate::errors::Result;

/// Trait for price ledger persistence.
#[async_trait]
pub trait PriceHistoryRepositoryTrait: Send + Sync {
    /// Inserts a record. When the record is open-ended, the existing open
    /// record for the same key is closed at its `valid_from` in the same
    /// transaction (see [`super::closing_instant_for`]).
    async fn create(&self, new_record: NewPriceHistory) -> Result<PriceHistory>;

    fn get_by_id(&self, price_history_id: i64) -> Result<Option<PriceHistory>>;

    /// Records of `product_master_id` whose window covers `at`.
    ///
    /// With `store_id` set, only that store's records and store-agnostic
    /// baselines are returned; otherwise records of every store.
    fn find_covering(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<Vec<PriceHistory>>;

    fn list_by_product_master(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<Vec<PriceHistory>>;

    fn count_by_product_master(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<i64>;

    /// Overwrites every field of the record with the same ID.
    async fn update(&self, record: PriceHistory) -> Result<PriceHistory>;

    /// Returns the number of deleted rows.
    async fn delete(&self, price_history_id: i64) -> Result<usize>;
}

/// Trait for the price history service.
#[async_trait]
pub trait PriceHistoryServiceTrait: Send + Sync {
    /// Records a price observation, closing the previous open window for the key.
    async fn create(&self, new_record: NewPriceHistory) -> Result<PriceHistory>;

    /// The record in effect now.
    fn get_current_price(&self, product_master_id: i64, store_id: Option<i64>)
        -> Result<PriceHistory>;

    /// The record in effect at `at`.
    fn get_price_at(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<PriceHistory>;

    /// Price history of a product master. An explicit `store_id` overrides the filter's store.
    fn get_by_product_master_id(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        filters: PriceHistoryFilters,
    ) -> Result<Vec<PriceHistory>>;

    fn get_price_history_count(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<i64>;

    fn get_by_id(&self, price_history_id: i64) -> Result<PriceHistory>;

    /// Administrative correction. Does not re-check window invariants.
    async fn update(&self, record: PriceHistory) -> Result<PriceHistory>;

    /// Administrative removal. Does not re-open any previously closed window.
    async fn delete(&self, price_history_id: i64) -> Result<()>;
}
