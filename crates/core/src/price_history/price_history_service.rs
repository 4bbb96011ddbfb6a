use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::price_history_model::{
    resolve_current, NewPriceHistory, PriceHistory, PriceHistoryFilters, PriceKey,
};
use super::price_history_traits::{PriceHistoryRepositoryTrait, PriceHistoryServiceTrait};
use crate::errors::{Entity, Error, Result, ResultExt};
use crate::utils::time_utils::Clock;

/// Validation and "current price" resolution over a price ledger store.
pub struct PriceHistoryService {
    repository: Arc<dyn PriceHistoryRepositoryTrait>,
    clock: Arc<dyn Clock>,
}

impl PriceHistoryService {
    pub fn new(repository: Arc<dyn PriceHistoryRepositoryTrait>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

#[async_trait]
impl PriceHistoryServiceTrait for PriceHistoryService {
    async fn create(&self, new_record: NewPriceHistory) -> Result<PriceHistory> {
        new_record.validate()?;
        let key = new_record.key();
        debug!("Recording price {} {} for {}", new_record.price, new_record.currency, key);

        let created = self
            .repository
            .create(new_record)
            .await
            .context("create_price_history", key)
            .inspect_err(|e| {
                if matches!(e, Error::Conflict(_)) {
                    warn!("Price for {} conflicts with an existing open window: {}", key, e);
                }
            })?;

        info!("Recorded price history {} for {}", created.id, key);
        Ok(created)
    }

    fn get_current_price(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
    ) -> Result<PriceHistory> {
        self.get_price_at(product_master_id, store_id, self.clock.now())
    }

    fn get_price_at(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<PriceHistory> {
        let key = PriceKey {
            product_master_id,
            store_id,
        };
        let candidates = self
            .repository
            .find_covering(product_master_id, store_id, at)
            .context("get_current_price", key)?;

        if candidates.len() > 1 {
            debug!(
                "{} overlapping price windows for {} at {}",
                candidates.len(),
                key,
                at
            );
        }

        resolve_current(&candidates, store_id, at)
            .cloned()
            .ok_or_else(|| Error::not_found(Entity::PriceHistory, format!("{} at {}", key, at)))
    }

    fn get_by_product_master_id(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        mut filters: PriceHistoryFilters,
    ) -> Result<Vec<PriceHistory>> {
        filters.validate()?;
        if store_id.is_some() {
            filters.store_id = store_id;
        }
        self.repository
            .list_by_product_master(product_master_id, &filters)
            .context("get_price_history", product_master_id)
    }

    fn get_price_history_count(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<i64> {
        filters.validate()?;
        self.repository
            .count_by_product_master(product_master_id, filters)
            .context("count_price_history", product_master_id)
    }

    fn get_by_id(&self, price_history_id: i64) -> Result<PriceHistory> {
        self.repository
            .get_by_id(price_history_id)
            .context("get_price_history_by_id", price_history_id)?
            .ok_or_else(|| Error::not_found(Entity::PriceHistory, price_history_id))
    }

    async fn update(&self, record: PriceHistory) -> Result<PriceHistory> {
        record.validate()?;
        let record_id = record.id;
        let updated = self
            .repository
            .update(record)
            .await
            .context("update_price_history", record_id)?;
        info!("Updated price history {}", record_id);
        Ok(updated)
    }

    async fn delete(&self, price_history_id: i64) -> Result<()> {
        let deleted = self
            .repository
            .delete(price_history_id)
            .await
            .context("delete_price_history", price_history_id)?;
        if deleted == 0 {
            return Err(Error::not_found(Entity::PriceHistory, price_history_id));
        }
        info!("Deleted price history {}", price_history_id);
        Ok(())
    }
}
