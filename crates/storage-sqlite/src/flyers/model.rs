//! Database models for flyers.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use pricewatch_core::flyers::{Flyer, FlyerStatus, NewFlyer};

use crate::errors::StorageError;
use crate::utils::{from_db_timestamp, to_db_timestamp};

/// Database model for flyers
#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::flyers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FlyerDB {
    pub id: i64,
    pub store_id: i64,
    pub status: String,
    pub valid_from: chrono::NaiveDateTime,
    pub valid_to: Option<chrono::NaiveDateTime>,
    pub processed_at: Option<chrono::NaiveDateTime>,
    pub products_extracted: Option<i32>,
    pub archived_at: Option<chrono::NaiveDateTime>,
    pub version: i64,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Database model for registering a flyer
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::flyers)]
pub struct NewFlyerDB {
    pub store_id: i64,
    pub status: String,
    pub valid_from: chrono::NaiveDateTime,
    pub valid_to: Option<chrono::NaiveDateTime>,
    pub version: i64,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Mutable flyer columns written by a versioned update.
///
/// `None` clears the column rather than leaving it untouched.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::flyers)]
#[diesel(treat_none_as_null = true)]
pub struct FlyerChangesetDB {
    pub store_id: i64,
    pub status: String,
    pub valid_from: chrono::NaiveDateTime,
    pub valid_to: Option<chrono::NaiveDateTime>,
    pub processed_at: Option<chrono::NaiveDateTime>,
    pub products_extracted: Option<i32>,
    pub archived_at: Option<chrono::NaiveDateTime>,
    pub version: i64,
    pub updated_at: chrono::NaiveDateTime,
}

impl NewFlyerDB {
    pub fn from_domain(new_flyer: NewFlyer, now: DateTime<Utc>) -> Self {
        let now = to_db_timestamp(now);
        Self {
            store_id: new_flyer.store_id,
            status: FlyerStatus::Pending.as_str().to_string(),
            valid_from: to_db_timestamp(new_flyer.valid_from),
            valid_to: new_flyer.valid_to.map(to_db_timestamp),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl FlyerChangesetDB {
    /// Changeset for `flyer` that moves the stored version to `expected_version + 1`.
    pub fn next_version(flyer: &Flyer, expected_version: i64) -> Self {
        Self {
            store_id: flyer.store_id,
            status: flyer.status.as_str().to_string(),
            valid_from: to_db_timestamp(flyer.valid_from),
            valid_to: flyer.valid_to.map(to_db_timestamp),
            processed_at: flyer.processed_at.map(to_db_timestamp),
            products_extracted: flyer.products_extracted,
            archived_at: flyer.archived_at.map(to_db_timestamp),
            version: expected_version + 1,
            updated_at: to_db_timestamp(flyer.updated_at),
        }
    }
}

impl TryFrom<FlyerDB> for Flyer {
    type Error = StorageError;

    fn try_from(db: FlyerDB) -> Result<Self, Self::Error> {
        let status = FlyerStatus::from_str(&db.status).map_err(|_| {
            StorageError::Decode(format!("flyer {} has unknown status '{}'", db.id, db.status))
        })?;
        Ok(Flyer {
            id: db.id,
            store_id: db.store_id,
            status,
            valid_from: from_db_timestamp(db.valid_from),
            valid_to: db.valid_to.map(from_db_timestamp),
            processed_at: db.processed_at.map(from_db_timestamp),
            products_extracted: db.products_extracted,
            archived_at: db.archived_at.map(from_db_timestamp),
            version: db.version,
            created_at: from_db_timestamp(db.created_at),
            updated_at: from_db_timestamp(db.updated_at),
        })
    }
}

pub(crate) fn into_flyers(rows: Vec<FlyerDB>) -> Result<Vec<Flyer>, StorageError> {
    rows.into_iter().map(Flyer::try_from).collect()
}
