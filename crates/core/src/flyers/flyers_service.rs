use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::flyers_model::{Flyer, FlyerFilters, FlyerTransition};
use super::flyers_traits::{FlyerLifecycleServiceTrait, FlyerRepositoryTrait};
use crate::errors::{Entity, Error, InvalidStateReason, Result, ResultExt, ValidationError};
use crate::settings::LifecycleSettings;
use crate::utils::time_utils::{days_before, Clock};

/// Enforces the flyer state machine over a [`FlyerRepositoryTrait`].
///
/// Every transition is load, guard, then a version-checked write, so the guard
/// and the write succeed or fail together.
pub struct FlyerLifecycleService {
    repository: Arc<dyn FlyerRepositoryTrait>,
    clock: Arc<dyn Clock>,
    settings: LifecycleSettings,
}

impl FlyerLifecycleService {
    pub fn new(
        repository: Arc<dyn FlyerRepositoryTrait>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }

    fn load(&self, flyer_id: i64, operation: &'static str) -> Result<Flyer> {
        self.repository
            .get_by_id(flyer_id)
            .context(operation, flyer_id)?
            .ok_or_else(|| Error::not_found(Entity::Flyer, flyer_id))
    }

    async fn transition(&self, flyer_id: i64, transition: FlyerTransition) -> Result<Flyer> {
        let operation = transition.operation();
        debug!("{} requested for flyer {}", operation, flyer_id);

        let current = self.load(flyer_id, operation)?;
        let now = self.clock.now();

        let next = match current.apply_transition(transition, now) {
            Ok(Some(next)) => next,
            Ok(None) => {
                debug!(
                    "{} is a no-op for flyer {} in status {}",
                    operation, flyer_id, current.status
                );
                return Ok(current);
            }
            Err(e) => {
                warn!("Rejected {} for flyer {}: {}", operation, flyer_id, e);
                return Err(e);
            }
        };

        let saved = self
            .repository
            .update_if_version(next, current.version)
            .await
            .context(operation, flyer_id)?;

        match saved {
            Some(flyer) => {
                info!(
                    "Flyer {} moved {} -> {} (version {})",
                    flyer_id, current.status, flyer.status, flyer.version
                );
                Ok(flyer)
            }
            None => {
                warn!(
                    "Flyer {} changed while applying {} (expected version {})",
                    flyer_id, operation, current.version
                );
                Err(Error::InvalidState {
                    flyer_id,
                    status: current.status,
                    operation,
                    reason: InvalidStateReason::ConcurrentModification,
                })
            }
        }
    }
}

#[async_trait]
impl FlyerLifecycleServiceTrait for FlyerLifecycleService {
    async fn start_processing(&self, flyer_id: i64) -> Result<Flyer> {
        self.transition(flyer_id, FlyerTransition::StartProcessing).await
    }

    async fn complete_processing(&self, flyer_id: i64, products_extracted: i32) -> Result<Flyer> {
        self.transition(
            flyer_id,
            FlyerTransition::CompleteProcessing { products_extracted },
        )
        .await
    }

    async fn fail_processing(&self, flyer_id: i64) -> Result<Flyer> {
        self.transition(flyer_id, FlyerTransition::FailProcessing).await
    }

    async fn archive_flyer(&self, flyer_id: i64) -> Result<Flyer> {
        self.transition(flyer_id, FlyerTransition::Archive).await
    }

    async fn archive_older_than(&self, days: i64) -> Result<usize> {
        if days <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "archive threshold must be a positive number of days, got {}",
                days
            ))
            .into());
        }

        let now = self.clock.now();
        let cutoff = days_before(now, days)?;
        debug!("Archiving flyers with valid_from before {}", cutoff);

        let archived = self
            .repository
            .archive_older_than(cutoff, now)
            .await
            .context("archive_older_than", format!("{} days", days))?;

        info!("Archived {} flyer(s) older than {} days", archived, days);
        Ok(archived)
    }

    async fn archive_stale(&self) -> Result<usize> {
        self.archive_older_than(self.settings.archive_after_days).await
    }

    fn get_processable_flyers(&self) -> Result<Vec<Flyer>> {
        self.repository
            .find_processable(self.clock.now(), None)
            .context("get_processable_flyers", "all")
    }

    fn get_flyers_for_processing(&self, limit: i64) -> Result<Vec<Flyer>> {
        if limit <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "limit must be positive, got {}",
                limit
            ))
            .into());
        }
        self.repository
            .find_processable(self.clock.now(), Some(limit))
            .context("get_flyers_for_processing", format!("limit {}", limit))
    }

    fn get_default_flyers_for_processing(&self) -> Result<Vec<Flyer>> {
        self.get_flyers_for_processing(self.settings.processing_batch_limit)
    }

    fn get_flyer(&self, flyer_id: i64) -> Result<Flyer> {
        self.load(flyer_id, "get_flyer")
    }

    fn get_flyers_by_ids(&self, flyer_ids: &[i64]) -> Result<Vec<Flyer>> {
        self.repository
            .get_by_ids(flyer_ids)
            .context("get_flyers_by_ids", format!("{} ids", flyer_ids.len()))
    }

    fn list_flyers(&self, filters: &FlyerFilters) -> Result<Vec<Flyer>> {
        filters.validate()?;
        self.repository
            .list(filters)
            .context("list_flyers", format!("{:?}", filters.store_id))
    }

    fn count_flyers(&self, filters: &FlyerFilters) -> Result<i64> {
        filters.validate()?;
        self.repository
            .count(filters)
            .context("count_flyers", format!("{:?}", filters.store_id))
    }
}
