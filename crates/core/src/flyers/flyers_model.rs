//! Flyer domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, InvalidStateReason, Result, ValidationError};
use crate::query::{DateRange, Pagination, SortDirection};

/// Processing status of a flyer.
///
/// `Pending` is initial and `Archived` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlyerStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Archived,
}

impl FlyerStatus {
    pub const ALL: [FlyerStatus; 5] = [
        FlyerStatus::Pending,
        FlyerStatus::Processing,
        FlyerStatus::Completed,
        FlyerStatus::Failed,
        FlyerStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlyerStatus::Pending => "PENDING",
            FlyerStatus::Processing => "PROCESSING",
            FlyerStatus::Completed => "COMPLETED",
            FlyerStatus::Failed => "FAILED",
            FlyerStatus::Archived => "ARCHIVED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlyerStatus::Archived)
    }
}

impl fmt::Display for FlyerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlyerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(FlyerStatus::Pending),
            "PROCESSING" => Ok(FlyerStatus::Processing),
            "COMPLETED" => Ok(FlyerStatus::Completed),
            "FAILED" => Ok(FlyerStatus::Failed),
            "ARCHIVED" => Ok(FlyerStatus::Archived),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown flyer status '{}'",
                other
            ))
            .into()),
        }
    }
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlyerTransition {
    StartProcessing,
    CompleteProcessing { products_extracted: i32 },
    FailProcessing,
    Archive,
}

impl FlyerTransition {
    /// Operation name used in logs and error context.
    pub fn operation(&self) -> &'static str {
        match self {
            FlyerTransition::StartProcessing => "start_processing",
            FlyerTransition::CompleteProcessing { .. } => "complete_processing",
            FlyerTransition::FailProcessing => "fail_processing",
            FlyerTransition::Archive => "archive_flyer",
        }
    }

    /// Whether the transition is permitted from `status`, ignoring the validity window.
    pub fn is_allowed_from(&self, status: FlyerStatus) -> bool {
        use FlyerStatus::*;
        match self {
            FlyerTransition::StartProcessing => status == Pending,
            FlyerTransition::CompleteProcessing { .. } => matches!(status, Processing | Completed),
            FlyerTransition::FailProcessing => matches!(status, Processing | Failed),
            FlyerTransition::Archive => !status.is_terminal(),
        }
    }
}

/// Domain model representing a flyer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flyer {
    pub id: i64,
    pub store_id: i64,
    pub status: FlyerStatus,
    pub valid_from: DateTime<Utc>,
    /// Exclusive end of the validity window; `None` means open-ended.
    pub valid_to: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub products_extracted: Option<i32>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Revision used for compare-and-swap writes.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flyer {
    /// True once `now` has reached the exclusive end of the validity window.
    pub fn is_window_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.valid_to.is_some_and(|end| end <= now)
    }

    /// Guard for picking the flyer up for extraction.
    pub fn is_processable(&self, now: DateTime<Utc>) -> bool {
        self.status == FlyerStatus::Pending && !self.is_window_lapsed(now)
    }

    /// Evaluates `transition` against this flyer.
    ///
    /// Returns `Ok(Some(next))` with the state to persist, `Ok(None)` when the
    /// transition is a no-op (archiving an archived flyer), or `InvalidState`
    /// when the guard rejects it. Nothing is written here.
    pub fn apply_transition(
        &self,
        transition: FlyerTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<Flyer>> {
        if transition == FlyerTransition::Archive && self.status == FlyerStatus::Archived {
            return Ok(None);
        }

        let guard_passes = match transition {
            FlyerTransition::StartProcessing => self.is_processable(now),
            other => other.is_allowed_from(self.status),
        };
        if !guard_passes {
            return Err(Error::InvalidState {
                flyer_id: self.id,
                status: self.status,
                operation: transition.operation(),
                reason: InvalidStateReason::GuardRejected,
            });
        }

        let mut next = self.clone();
        next.updated_at = now;
        match transition {
            FlyerTransition::StartProcessing => {
                next.status = FlyerStatus::Processing;
            }
            FlyerTransition::CompleteProcessing { products_extracted } => {
                if products_extracted < 0 {
                    return Err(ValidationError::InvalidInput(format!(
                        "products_extracted must not be negative, got {}",
                        products_extracted
                    ))
                    .into());
                }
                next.status = FlyerStatus::Completed;
                next.products_extracted = Some(products_extracted);
                next.processed_at = Some(now);
            }
            FlyerTransition::FailProcessing => {
                next.status = FlyerStatus::Failed;
                next.processed_at = Some(now);
            }
            FlyerTransition::Archive => {
                next.status = FlyerStatus::Archived;
                next.archived_at = Some(now);
            }
        }
        Ok(Some(next))
    }
}

/// Input model for registering a new flyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlyer {
    pub store_id: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl NewFlyer {
    pub fn validate(&self) -> Result<()> {
        if self.store_id <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "store_id must be positive, got {}",
                self.store_id
            ))
            .into());
        }
        if let Some(valid_to) = self.valid_to {
            if valid_to < self.valid_from {
                return Err(ValidationError::InvalidWindow(format!(
                    "valid_to {} is before valid_from {}",
                    valid_to, self.valid_from
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Column a flyer listing is ordered by. Ties always break on `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FlyerOrderField {
    #[default]
    ValidFrom,
    CreatedAt,
    Id,
}

/// Filters for flyer listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FlyerFilters {
    pub store_id: Option<i64>,
    /// Empty means any status.
    pub statuses: Vec<FlyerStatus>,
    /// Bounds on `valid_from`.
    pub valid_from: DateRange,
    pub order_by: FlyerOrderField,
    pub direction: SortDirection,
    pub pagination: Pagination,
}

impl FlyerFilters {
    pub fn for_store(store_id: i64) -> Self {
        Self {
            store_id: Some(store_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[FlyerStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.valid_from.validate()
    }
}
