//! Flyer repository and lifecycle service traits.
//!
//! These traits define the contract for flyer operations without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::flyers_model::{Flyer, FlyerFilters, NewFlyer};
use crate::errors::Result;

/// Trait defining the contract for Flyer persistence.
#[async_trait]
pub trait FlyerRepositoryTrait: Send + Sync {
    /// Inserts a new flyer in status `Pending` with version 0.
    async fn create(&self, new_flyer: NewFlyer) -> Result<Flyer>;

    /// Retrieves a flyer by its ID.
    fn get_by_id(&self, flyer_id: i64) -> Result<Option<Flyer>>;

    /// Retrieves the flyers matching `flyer_ids`, ordered by ID. Unknown IDs are skipped.
    fn get_by_ids(&self, flyer_ids: &[i64]) -> Result<Vec<Flyer>>;

    /// Lists flyers matching `filters`, paginated.
    fn list(&self, filters: &FlyerFilters) -> Result<Vec<Flyer>>;

    /// Counts flyers matching `filters`, ignoring pagination.
    fn count(&self, filters: &FlyerFilters) -> Result<i64>;

    /// Flyers that are `Pending` with a validity window still open at `now`,
    /// ordered by `valid_from` then `id`, oldest first.
    fn find_processable(&self, now: DateTime<Utc>, limit: Option<i64>) -> Result<Vec<Flyer>>;

    /// Writes the full flyer record if the stored version still equals
    /// `expected_version`, bumping the version by one.
    ///
    /// Returns `Ok(None)` when no row matched (the flyer changed or vanished).
    async fn update_if_version(&self, flyer: Flyer, expected_version: i64)
        -> Result<Option<Flyer>>;

    /// Archives every non-archived flyer with `valid_from < cutoff` in one
    /// atomic statement. Returns the number of archived flyers.
    async fn archive_older_than(
        &self,
        cutoff: DateTime<Utc>,
        archived_at: DateTime<Utc>,
    ) -> Result<usize>;
}

/// Trait defining the flyer lifecycle operations.
#[async_trait]
pub trait FlyerLifecycleServiceTrait: Send + Sync {
    /// Moves a processable `Pending` flyer to `Processing`.
    async fn start_processing(&self, flyer_id: i64) -> Result<Flyer>;

    /// Moves a `Processing` flyer to `Completed`, recording the extracted count.
    async fn complete_processing(&self, flyer_id: i64, products_extracted: i32) -> Result<Flyer>;

    /// Moves a `Processing` flyer to `Failed`.
    async fn fail_processing(&self, flyer_id: i64) -> Result<Flyer>;

    /// Archives a flyer from any non-terminal status.
    async fn archive_flyer(&self, flyer_id: i64) -> Result<Flyer>;

    /// Archives, in bulk, flyers whose validity started more than `days` days ago.
    async fn archive_older_than(&self, days: i64) -> Result<usize>;

    /// `archive_older_than` with the configured sweep threshold.
    async fn archive_stale(&self) -> Result<usize>;

    /// All flyers eligible for pickup, oldest first.
    fn get_processable_flyers(&self) -> Result<Vec<Flyer>>;

    /// At most `limit` flyers eligible for pickup, oldest first.
    fn get_flyers_for_processing(&self, limit: i64) -> Result<Vec<Flyer>>;

    /// `get_flyers_for_processing` with the configured batch size.
    fn get_default_flyers_for_processing(&self) -> Result<Vec<Flyer>>;

    fn get_flyer(&self, flyer_id: i64) -> Result<Flyer>;

    fn get_flyers_by_ids(&self, flyer_ids: &[i64]) -> Result<Vec<Flyer>>;

    fn list_flyers(&self, filters: &FlyerFilters) -> Result<Vec<Flyer>>;

    fn count_flyers(&self, filters: &FlyerFilters) -> Result<i64>;
}
