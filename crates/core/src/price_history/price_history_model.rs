//! Price history domain models and point-in-time resolution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result, ValidationError};
use crate::query::{DateRange, Pagination, SortDirection};

/// Ledger key: a product master, optionally scoped to one store.
///
/// `store_id = None` is the store-agnostic baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceKey {
    pub product_master_id: i64,
    pub store_id: Option<i64>,
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store_id {
            Some(store_id) => write!(f, "{}/{}", self.product_master_id, store_id),
            None => write!(f, "{}/baseline", self.product_master_id),
        }
    }
}

/// One observed price and the window during which it applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub id: i64,
    pub product_master_id: i64,
    pub store_id: Option<i64>,
    pub price: Decimal,
    pub currency: String,
    pub unit: Option<String>,
    pub valid_from: DateTime<Utc>,
    /// `None` means open-ended, i.e. in effect until superseded.
    pub valid_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceHistory {
    pub fn key(&self) -> PriceKey {
        PriceKey {
            product_master_id: self.product_master_id,
            store_id: self.store_id,
        }
    }

    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }

    /// `valid_from <= at` and (`valid_to` is null or `valid_to >= at`).
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_to.map_or(true, |end| end >= at)
    }

    pub fn validate(&self) -> Result<()> {
        validate_fields(
            self.product_master_id,
            self.store_id,
            self.price,
            &self.currency,
            self.valid_from,
            self.valid_to,
        )
    }
}

/// Input model for recording a new price observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPriceHistory {
    pub product_master_id: i64,
    pub store_id: Option<i64>,
    pub price: Decimal,
    pub currency: String,
    pub unit: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl NewPriceHistory {
    pub fn key(&self) -> PriceKey {
        PriceKey {
            product_master_id: self.product_master_id,
            store_id: self.store_id,
        }
    }

    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        validate_fields(
            self.product_master_id,
            self.store_id,
            self.price,
            &self.currency,
            self.valid_from,
            self.valid_to,
        )
    }
}

fn validate_fields(
    product_master_id: i64,
    store_id: Option<i64>,
    price: Decimal,
    currency: &str,
    valid_from: DateTime<Utc>,
    valid_to: Option<DateTime<Utc>>,
) -> Result<()> {
    if product_master_id <= 0 {
        return Err(ValidationError::InvalidInput(format!(
            "product_master_id must be positive, got {}",
            product_master_id
        ))
        .into());
    }
    if let Some(store_id) = store_id {
        if store_id <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "store_id must be positive, got {}",
                store_id
            ))
            .into());
        }
    }
    if price.is_sign_negative() {
        return Err(ValidationError::InvalidInput(format!(
            "price must not be negative, got {}",
            price
        ))
        .into());
    }
    if currency.trim().is_empty() {
        return Err(ValidationError::MissingField("currency".to_string()).into());
    }
    if let Some(valid_to) = valid_to {
        if valid_to <= valid_from {
            return Err(ValidationError::InvalidWindow(format!(
                "valid_to {} must be after valid_from {}",
                valid_to, valid_from
            ))
            .into());
        }
    }
    Ok(())
}

/// Decides how an open record for the same key is closed before `incoming` is inserted.
///
/// Returns the `valid_to` to set on `existing_open`, or `None` when nothing
/// needs closing. An existing open window that starts at or after the incoming
/// `valid_from` cannot be closed without producing an empty or reversed window
/// and is reported as a conflict.
pub fn closing_instant_for(
    existing_open: Option<&PriceHistory>,
    incoming: &NewPriceHistory,
) -> Result<Option<DateTime<Utc>>> {
    if !incoming.is_open() {
        return Ok(None);
    }
    let Some(existing) = existing_open else {
        return Ok(None);
    };
    if existing.valid_from >= incoming.valid_from {
        return Err(Error::Conflict(format!(
            "open price {} for {} starts at {}, not before the new record's {}",
            existing.id,
            existing.key(),
            existing.valid_from,
            incoming.valid_from
        )));
    }
    Ok(Some(incoming.valid_from))
}

/// Picks the record in effect at `at` from `candidates`.
///
/// With `store_id` set, records for that store win; store-agnostic baseline
/// records are used only when no store record covers `at`. Without a store,
/// every record is eligible. Ties go to the latest `valid_from`, then the
/// highest ID.
pub fn resolve_current(
    candidates: &[PriceHistory],
    store_id: Option<i64>,
    at: DateTime<Utc>,
) -> Option<&PriceHistory> {
    match store_id {
        Some(store_id) => latest_covering(candidates, at, |r| r.store_id == Some(store_id))
            .or_else(|| latest_covering(candidates, at, |r| r.store_id.is_none())),
        None => latest_covering(candidates, at, |_| true),
    }
}

fn latest_covering<F>(
    candidates: &[PriceHistory],
    at: DateTime<Utc>,
    scope: F,
) -> Option<&PriceHistory>
where
    F: Fn(&PriceHistory) -> bool,
{
    candidates
        .iter()
        .filter(|r| r.covers(at) && scope(r))
        .max_by_key(|r| (r.valid_from, r.id))
}

/// Column a price history listing is ordered by. Ties always break on `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PriceHistoryOrderField {
    #[default]
    ValidFrom,
    CreatedAt,
    Price,
}

/// Filters for price history listings.
///
/// Defaults to most recent `valid_from` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceHistoryFilters {
    /// Restricts to records of one store; `None` spans all stores and baselines.
    pub store_id: Option<i64>,
    /// Bounds on `valid_from`.
    pub valid_from: DateRange,
    pub order_by: PriceHistoryOrderField,
    pub direction: SortDirection,
    pub pagination: Pagination,
}

impl PriceHistoryFilters {
    pub fn for_store(store_id: i64) -> Self {
        Self {
            store_id: Some(store_id),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.valid_from.validate()
    }
}
