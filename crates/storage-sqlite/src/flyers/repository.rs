use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use pricewatch_core::flyers::{
    Flyer, FlyerFilters, FlyerOrderField, FlyerRepositoryTrait, FlyerStatus, NewFlyer,
};
use pricewatch_core::query::SortDirection;
use pricewatch_core::Result;

use super::model::{into_flyers, FlyerChangesetDB, FlyerDB, NewFlyerDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::flyers;
use crate::utils::{chunk_for_sqlite, to_db_timestamp};

pub struct FlyerRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl FlyerRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        FlyerRepository { pool, writer }
    }

    fn filtered_query(filters: &FlyerFilters) -> flyers::BoxedQuery<'static, Sqlite> {
        let mut query = flyers::table.into_boxed();

        if let Some(store) = filters.store_id {
            query = query.filter(flyers::store_id.eq(store));
        }
        if !filters.statuses.is_empty() {
            let statuses: Vec<String> = filters
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            query = query.filter(flyers::status.eq_any(statuses));
        }
        if let Some(start) = filters.valid_from.start {
            query = query.filter(flyers::valid_from.ge(to_db_timestamp(start)));
        }
        if let Some(end) = filters.valid_from.end {
            query = query.filter(flyers::valid_from.le(to_db_timestamp(end)));
        }
        query
    }

    fn ordered(
        query: flyers::BoxedQuery<'static, Sqlite>,
        order_by: FlyerOrderField,
        direction: SortDirection,
    ) -> flyers::BoxedQuery<'static, Sqlite> {
        match (order_by, direction) {
            (FlyerOrderField::ValidFrom, SortDirection::Asc) => query
                .order(flyers::valid_from.asc())
                .then_order_by(flyers::id.asc()),
            (FlyerOrderField::ValidFrom, SortDirection::Desc) => query
                .order(flyers::valid_from.desc())
                .then_order_by(flyers::id.desc()),
            (FlyerOrderField::CreatedAt, SortDirection::Asc) => query
                .order(flyers::created_at.asc())
                .then_order_by(flyers::id.asc()),
            (FlyerOrderField::CreatedAt, SortDirection::Desc) => query
                .order(flyers::created_at.desc())
                .then_order_by(flyers::id.desc()),
            (FlyerOrderField::Id, SortDirection::Asc) => query.order(flyers::id.asc()),
            (FlyerOrderField::Id, SortDirection::Desc) => query.order(flyers::id.desc()),
        }
    }
}

#[async_trait]
impl FlyerRepositoryTrait for FlyerRepository {
    async fn create(&self, new_flyer: NewFlyer) -> Result<Flyer> {
        let new_flyer_db = NewFlyerDB::from_domain(new_flyer, Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Flyer> {
                let created = diesel::insert_into(flyers::table)
                    .values(&new_flyer_db)
                    .returning(FlyerDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Flyer::try_from(created)?)
            })
            .await
    }

    fn get_by_id(&self, flyer_id: i64) -> Result<Option<Flyer>> {
        let mut conn = get_connection(&self.pool)?;
        let row = flyers::table
            .find(flyer_id)
            .select(FlyerDB::as_select())
            .first::<FlyerDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Flyer::try_from).transpose()?)
    }

    fn get_by_ids(&self, flyer_ids: &[i64]) -> Result<Vec<Flyer>> {
        if flyer_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = get_connection(&self.pool)?;

        let mut rows = Vec::with_capacity(flyer_ids.len());
        for chunk in chunk_for_sqlite(flyer_ids) {
            let chunk_rows = flyers::table
                .filter(flyers::id.eq_any(chunk))
                .select(FlyerDB::as_select())
                .load::<FlyerDB>(&mut conn)
                .map_err(StorageError::from)?;
            rows.extend(chunk_rows);
        }
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);

        Ok(into_flyers(rows)?)
    }

    fn list(&self, filters: &FlyerFilters) -> Result<Vec<Flyer>> {
        let mut conn = get_connection(&self.pool)?;
        let query = Self::ordered(
            Self::filtered_query(filters),
            filters.order_by,
            filters.direction,
        );

        let rows = query
            .offset(filters.pagination.offset())
            .limit(filters.pagination.limit())
            .load::<FlyerDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(into_flyers(rows)?)
    }

    fn count(&self, filters: &FlyerFilters) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let total = Self::filtered_query(filters)
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(total)
    }

    fn find_processable(&self, now: DateTime<Utc>, limit: Option<i64>) -> Result<Vec<Flyer>> {
        let mut conn = get_connection(&self.pool)?;
        let now_db = to_db_timestamp(now);

        let mut query = flyers::table
            .filter(flyers::status.eq(FlyerStatus::Pending.as_str()))
            .filter(flyers::valid_to.is_null().or(flyers::valid_to.gt(now_db)))
            .order((flyers::valid_from.asc(), flyers::id.asc()))
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let rows = query
            .load::<FlyerDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(into_flyers(rows)?)
    }

    async fn update_if_version(
        &self,
        flyer: Flyer,
        expected_version: i64,
    ) -> Result<Option<Flyer>> {
        let flyer_id = flyer.id;
        let changes = FlyerChangesetDB::next_version(&flyer, expected_version);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Flyer>> {
                let affected = diesel::update(
                    flyers::table
                        .filter(flyers::id.eq(flyer_id))
                        .filter(flyers::version.eq(expected_version)),
                )
                .set(&changes)
                .execute(conn)
                .map_err(StorageError::from)?;

                if affected == 0 {
                    debug!(
                        "Flyer {} no longer at version {}; update skipped",
                        flyer_id, expected_version
                    );
                    return Ok(None);
                }

                let row = flyers::table
                    .find(flyer_id)
                    .select(FlyerDB::as_select())
                    .first::<FlyerDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(Some(Flyer::try_from(row)?))
            })
            .await
    }

    async fn archive_older_than(
        &self,
        cutoff: DateTime<Utc>,
        archived_at: DateTime<Utc>,
    ) -> Result<usize> {
        let cutoff_db = to_db_timestamp(cutoff);
        let archived_at_db = to_db_timestamp(archived_at);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let archived = diesel::update(
                    flyers::table
                        .filter(flyers::status.ne(FlyerStatus::Archived.as_str()))
                        .filter(flyers::valid_from.lt(cutoff_db)),
                )
                .set((
                    flyers::status.eq(FlyerStatus::Archived.as_str()),
                    flyers::archived_at.eq(Some(archived_at_db)),
                    flyers::updated_at.eq(archived_at_db),
                    flyers::version.eq(flyers::version + 1),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(archived)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, write_actor::spawn_writer};
    use chrono::{Duration, TimeZone};
    use pricewatch_core::flyers::FlyerTransition;
    use tempfile::tempdir;

    async fn create_test_repository() -> (FlyerRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (FlyerRepository::new(Arc::clone(&pool), writer), temp_dir)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn new_flyer(store_id: i64, valid_from: DateTime<Utc>) -> NewFlyer {
        NewFlyer {
            store_id,
            valid_from,
            valid_to: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending_at_version_zero() {
        let (repo, _temp_dir) = create_test_repository().await;

        let created = repo.create(new_flyer(3, now())).await.unwrap();
        assert_eq!(created.status, FlyerStatus::Pending);
        assert_eq!(created.version, 0);
        assert_eq!(created.valid_from, now());

        let loaded = repo.get_by_id(created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(repo.get_by_id(created.id + 100).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archive_older_than_uses_valid_from_cutoff() {
        let (repo, _temp_dir) = create_test_repository().await;
        let old = repo.create(new_flyer(1, now() - Duration::days(10))).await.unwrap();
        let recent = repo.create(new_flyer(1, now() - Duration::days(5))).await.unwrap();
        let fresh = repo.create(new_flyer(1, now() - Duration::days(1))).await.unwrap();

        let archived = repo
            .archive_older_than(now() - Duration::days(7), now())
            .await
            .unwrap();
        assert_eq!(archived, 1);

        let old = repo.get_by_id(old.id).unwrap().unwrap();
        assert_eq!(old.status, FlyerStatus::Archived);
        assert_eq!(old.archived_at, Some(now()));
        assert_eq!(old.version, 1);
        assert_eq!(
            repo.get_by_id(recent.id).unwrap().unwrap().status,
            FlyerStatus::Pending
        );
        assert_eq!(
            repo.get_by_id(fresh.id).unwrap().unwrap().status,
            FlyerStatus::Pending
        );

        // Already archived rows are not touched again.
        let again = repo
            .archive_older_than(now() - Duration::days(7), now())
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_update_if_version_rejects_stale_writer() {
        let (repo, _temp_dir) = create_test_repository().await;
        let created = repo.create(new_flyer(1, now() - Duration::hours(1))).await.unwrap();

        let started = created
            .apply_transition(FlyerTransition::StartProcessing, now())
            .unwrap()
            .unwrap();
        let first = repo
            .update_if_version(started.clone(), created.version)
            .await
            .unwrap()
            .expect("first writer wins");
        assert_eq!(first.status, FlyerStatus::Processing);
        assert_eq!(first.version, 1);

        let second = repo
            .update_if_version(started, created.version)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_update_if_version_clears_optional_columns() {
        let (repo, _temp_dir) = create_test_repository().await;
        let created = repo.create(new_flyer(1, now() - Duration::hours(1))).await.unwrap();

        let mut edited = created.clone();
        edited.valid_to = Some(now() + Duration::days(3));
        let edited = repo.update_if_version(edited, 0).await.unwrap().unwrap();
        assert!(edited.valid_to.is_some());

        let mut cleared = edited.clone();
        cleared.valid_to = None;
        let cleared = repo.update_if_version(cleared, 1).await.unwrap().unwrap();
        assert_eq!(cleared.valid_to, None);
        assert_eq!(cleared.version, 2);
    }

    #[tokio::test]
    async fn test_find_processable_orders_and_skips_lapsed() {
        let (repo, _temp_dir) = create_test_repository().await;
        let later = repo.create(new_flyer(1, now() - Duration::days(1))).await.unwrap();
        let earlier = repo.create(new_flyer(2, now() - Duration::days(2))).await.unwrap();
        let lapsed = repo
            .create(NewFlyer {
                store_id: 3,
                valid_from: now() - Duration::days(3),
                valid_to: Some(now()),
            })
            .await
            .unwrap();
        let started = repo.create(new_flyer(4, now() - Duration::days(4))).await.unwrap();
        let processing = started
            .apply_transition(FlyerTransition::StartProcessing, now())
            .unwrap()
            .unwrap();
        repo.update_if_version(processing, 0).await.unwrap().unwrap();

        let processable = repo.find_processable(now(), None).unwrap();
        let ids: Vec<i64> = processable.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
        assert!(!ids.contains(&lapsed.id));

        let limited = repo.find_processable(now(), Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, earlier.id);
    }

    #[tokio::test]
    async fn test_list_and_count_apply_filters() {
        let (repo, _temp_dir) = create_test_repository().await;
        for day in 1..=5 {
            repo.create(new_flyer(7, now() - Duration::days(day))).await.unwrap();
        }
        repo.create(new_flyer(8, now())).await.unwrap();

        let mut filters = FlyerFilters::for_store(7);
        filters.direction = SortDirection::Asc;
        filters.pagination = pricewatch_core::query::Pagination::new(1, 2);

        let page = repo.list(&filters).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].valid_from < page[1].valid_from);
        assert!(page.iter().all(|f| f.store_id == 7));
        assert_eq!(repo.count(&filters).unwrap(), 5);

        let archived_only = FlyerFilters::default().with_statuses(&[FlyerStatus::Archived]);
        assert_eq!(repo.count(&archived_only).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_unknown() {
        let (repo, _temp_dir) = create_test_repository().await;
        let a = repo.create(new_flyer(1, now())).await.unwrap();
        let b = repo.create(new_flyer(1, now())).await.unwrap();

        let found = repo.get_by_ids(&[b.id, 999, a.id]).unwrap();
        let ids: Vec<i64> = found.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(repo.get_by_ids(&[]).unwrap().is_empty());
    }
}
