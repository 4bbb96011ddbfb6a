use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use pricewatch_core::errors::{Entity, Error};
use pricewatch_core::price_history::{
    closing_instant_for, NewPriceHistory, PriceHistory, PriceHistoryFilters,
    PriceHistoryOrderField, PriceHistoryRepositoryTrait,
};
use pricewatch_core::query::SortDirection;
use pricewatch_core::Result;

use super::model::{into_price_history, NewPriceHistoryDB, PriceHistoryDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::price_history;
use crate::utils::to_db_timestamp;

pub struct PriceHistoryRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PriceHistoryRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        PriceHistoryRepository { pool, writer }
    }

    fn filtered_query(
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> price_history::BoxedQuery<'static, Sqlite> {
        let mut query = price_history::table
            .filter(price_history::product_master_id.eq(product_master_id))
            .into_boxed();

        if let Some(store) = filters.store_id {
            query = query.filter(price_history::store_id.eq(store));
        }
        if let Some(start) = filters.valid_from.start {
            query = query.filter(price_history::valid_from.ge(to_db_timestamp(start)));
        }
        if let Some(end) = filters.valid_from.end {
            query = query.filter(price_history::valid_from.le(to_db_timestamp(end)));
        }
        query
    }

    fn ordered(
        query: price_history::BoxedQuery<'static, Sqlite>,
        order_by: PriceHistoryOrderField,
        direction: SortDirection,
    ) -> price_history::BoxedQuery<'static, Sqlite> {
        match (order_by, direction) {
            (PriceHistoryOrderField::ValidFrom, SortDirection::Asc) => query
                .order(price_history::valid_from.asc())
                .then_order_by(price_history::id.asc()),
            (PriceHistoryOrderField::ValidFrom, SortDirection::Desc) => query
                .order(price_history::valid_from.desc())
                .then_order_by(price_history::id.desc()),
            (PriceHistoryOrderField::CreatedAt, SortDirection::Asc) => query
                .order(price_history::created_at.asc())
                .then_order_by(price_history::id.asc()),
            (PriceHistoryOrderField::CreatedAt, SortDirection::Desc) => query
                .order(price_history::created_at.desc())
                .then_order_by(price_history::id.desc()),
            (PriceHistoryOrderField::Price, SortDirection::Asc) => query
                .order(price_history::price_sort_key.asc())
                .then_order_by(price_history::id.asc()),
            (PriceHistoryOrderField::Price, SortDirection::Desc) => query
                .order(price_history::price_sort_key.desc())
                .then_order_by(price_history::id.desc()),
        }
    }
}

/// The open record for the key of `record`, read on the writer's connection.
fn find_open_record(
    conn: &mut SqliteConnection,
    record: &NewPriceHistory,
) -> Result<Option<PriceHistory>> {
    let mut query = price_history::table
        .filter(price_history::product_master_id.eq(record.product_master_id))
        .filter(price_history::valid_to.is_null())
        .into_boxed();
    query = match record.store_id {
        Some(store) => query.filter(price_history::store_id.eq(store)),
        None => query.filter(price_history::store_id.is_null()),
    };

    let row = query
        .first::<PriceHistoryDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row.map(PriceHistory::try_from).transpose()?)
}

#[async_trait]
impl PriceHistoryRepositoryTrait for PriceHistoryRepository {
    async fn create(&self, new_record: NewPriceHistory) -> Result<PriceHistory> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PriceHistory> {
                let now = Utc::now();
                let existing_open = find_open_record(conn, &new_record)?;

                let closing = closing_instant_for(existing_open.as_ref(), &new_record)?;
                if let (Some(existing), Some(close_at)) = (existing_open.as_ref(), closing) {
                    diesel::update(price_history::table.find(existing.id))
                        .set((
                            price_history::valid_to.eq(Some(to_db_timestamp(close_at))),
                            price_history::updated_at.eq(to_db_timestamp(now)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    debug!(
                        "Closed price history {} for {} at {}",
                        existing.id,
                        existing.key(),
                        close_at
                    );
                }

                let inserted = diesel::insert_into(price_history::table)
                    .values(&NewPriceHistoryDB::from_domain(&new_record, now))
                    .returning(PriceHistoryDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(PriceHistory::try_from(inserted)?)
            })
            .await
    }

    fn get_by_id(&self, price_history_id: i64) -> Result<Option<PriceHistory>> {
        let mut conn = get_connection(&self.pool)?;
        let row = price_history::table
            .find(price_history_id)
            .select(PriceHistoryDB::as_select())
            .first::<PriceHistoryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(PriceHistory::try_from).transpose()?)
    }

    fn find_covering(
        &self,
        product_master_id: i64,
        store_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<Vec<PriceHistory>> {
        let mut conn = get_connection(&self.pool)?;
        let at_db = to_db_timestamp(at);

        let mut query = price_history::table
            .filter(price_history::product_master_id.eq(product_master_id))
            .filter(price_history::valid_from.le(at_db))
            .filter(
                price_history::valid_to
                    .is_null()
                    .or(price_history::valid_to.ge(at_db)),
            )
            .into_boxed();
        if let Some(store) = store_id {
            query = query.filter(
                price_history::store_id
                    .eq(store)
                    .or(price_history::store_id.is_null()),
            );
        }

        let rows = query
            .order((price_history::valid_from.desc(), price_history::id.desc()))
            .load::<PriceHistoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(into_price_history(rows)?)
    }

    fn list_by_product_master(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<Vec<PriceHistory>> {
        let mut conn = get_connection(&self.pool)?;
        let query = Self::ordered(
            Self::filtered_query(product_master_id, filters),
            filters.order_by,
            filters.direction,
        );

        let rows = query
            .offset(filters.pagination.offset())
            .limit(filters.pagination.limit())
            .load::<PriceHistoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(into_price_history(rows)?)
    }

    fn count_by_product_master(
        &self,
        product_master_id: i64,
        filters: &PriceHistoryFilters,
    ) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let total = Self::filtered_query(product_master_id, filters)
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(total)
    }

    async fn update(&self, record: PriceHistory) -> Result<PriceHistory> {
        let record_id = record.id;
        let mut record_db = PriceHistoryDB::from(record);
        record_db.updated_at = to_db_timestamp(Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PriceHistory> {
                let affected = diesel::update(price_history::table.find(record_id))
                    .set(&record_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(Error::not_found(Entity::PriceHistory, record_id));
                }

                let row = price_history::table
                    .find(record_id)
                    .select(PriceHistoryDB::as_select())
                    .first::<PriceHistoryDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(PriceHistory::try_from(row)?)
            })
            .await
    }

    async fn delete(&self, price_history_id: i64) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(price_history::table.find(price_history_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
