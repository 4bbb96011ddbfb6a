//! Database models for price history.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use pricewatch_core::price_history::{NewPriceHistory, PriceHistory};

use crate::errors::StorageError;
use crate::utils::{decimal_sort_key, from_db_timestamp, parse_decimal, to_db_timestamp};

/// Database model for price history rows
#[derive(Queryable, Identifiable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::price_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PriceHistoryDB {
    pub id: i64,
    pub product_master_id: i64,
    pub store_id: Option<i64>,
    pub price: String,
    pub currency: String,
    pub unit: Option<String>,
    pub valid_from: chrono::NaiveDateTime,
    pub valid_to: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub price_sort_key: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::price_history)]
pub struct NewPriceHistoryDB {
    pub product_master_id: i64,
    pub store_id: Option<i64>,
    pub price: String,
    pub currency: String,
    pub unit: Option<String>,
    pub valid_from: chrono::NaiveDateTime,
    pub valid_to: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub price_sort_key: String,
}

impl NewPriceHistoryDB {
    pub fn from_domain(record: &NewPriceHistory, now: DateTime<Utc>) -> Self {
        let now = to_db_timestamp(now);
        Self {
            product_master_id: record.product_master_id,
            store_id: record.store_id,
            price: record.price.to_string(),
            currency: record.currency.clone(),
            unit: record.unit.clone(),
            valid_from: to_db_timestamp(record.valid_from),
            valid_to: record.valid_to.map(to_db_timestamp),
            created_at: now,
            updated_at: now,
            price_sort_key: decimal_sort_key(record.price),
        }
    }
}

impl From<PriceHistory> for PriceHistoryDB {
    fn from(domain: PriceHistory) -> Self {
        Self {
            id: domain.id,
            product_master_id: domain.product_master_id,
            store_id: domain.store_id,
            price: domain.price.to_string(),
            currency: domain.currency,
            unit: domain.unit,
            valid_from: to_db_timestamp(domain.valid_from),
            valid_to: domain.valid_to.map(to_db_timestamp),
            created_at: to_db_timestamp(domain.created_at),
            updated_at: to_db_timestamp(domain.updated_at),
            price_sort_key: decimal_sort_key(domain.price),
        }
    }
}

impl TryFrom<PriceHistoryDB> for PriceHistory {
    type Error = StorageError;

    fn try_from(db: PriceHistoryDB) -> Result<Self, Self::Error> {
        Ok(PriceHistory {
            id: db.id,
            product_master_id: db.product_master_id,
            store_id: db.store_id,
            price: parse_decimal("price", &db.price)?,
            currency: db.currency,
            unit: db.unit,
            valid_from: from_db_timestamp(db.valid_from),
            valid_to: db.valid_to.map(from_db_timestamp),
            created_at: from_db_timestamp(db.created_at),
            updated_at: from_db_timestamp(db.updated_at),
        })
    }
}

pub(crate) fn into_price_history(
    rows: Vec<PriceHistoryDB>,
) -> Result<Vec<PriceHistory>, StorageError> {
    rows.into_iter().map(PriceHistory::try_from).collect()
}
