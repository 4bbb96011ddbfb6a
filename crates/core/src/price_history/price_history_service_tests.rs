#[cfg(test)]
mod tests {
    use crate::errors::{Error, ErrorKind, Result};
    use crate::price_history::{
        closing_instant_for, resolve_current, NewPriceHistory, PriceHistory,
        PriceHistoryFilters, PriceHistoryRepositoryTrait, PriceHistoryService,
        PriceHistoryServiceTrait,
    };
    use crate::query::{DateRange, Pagination, SortDirection};
    use crate::utils::{Clock, FixedClock};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    // --- Mock PriceHistoryRepository ---
    fn in_range(range: &DateRange, instant: DateTime<Utc>) -> bool {
        range.start.map_or(true, |s| s <= instant) && range.end.map_or(true, |e| instant <= e)
    }

    #[derive(Default)]
    struct MockPriceHistoryRepository {
        records: Mutex<Vec<PriceHistory>>,
    }

    impl MockPriceHistoryRepository {
        fn all(&self) -> Vec<PriceHistory> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceHistoryRepositoryTrait for MockPriceHistoryRepository {
        async fn create(&self, new_record: NewPriceHistory) -> Result<PriceHistory> {
            let mut records = self.records.lock().unwrap();
            let key = new_record.key();
            let open_idx = records.iter().position(|r| r.key() == key && r.is_open());
            let close_at = closing_instant_for(open_idx.map(|i| &records[i]), &new_record)?;
            if let (Some(i), Some(close_at)) = (open_idx, close_at) {
                records[i].valid_to = Some(close_at);
            }

            let record = PriceHistory {
                id: records.len() as i64 + 1,
                product_master_id: new_record.product_master_id,
                store_id: new_record.store_id,
                price: new_record.price,
                currency: new_record.currency,
                unit: new_record.unit,
                valid_from: new_record.valid_from,
                valid_to: new_record.valid_to,
                created_at: new_record.valid_from,
                updated_at: new_record.valid_from,
            };
            records.push(record.clone());
            Ok(record)
        }

        fn get_by_id(&self, price_history_id: i64) -> Result<Option<PriceHistory>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == price_history_id)
                .cloned())
        }

        fn find_covering(
            &self,
            product_master_id: i64,
            store_id: Option<i64>,
            at: DateTime<Utc>,
        ) -> Result<Vec<PriceHistory>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.product_master_id == product_master_id && r.covers(at))
                .filter(|r| store_id.is_none() || r.store_id.is_none() || r.store_id == store_id)
                .cloned()
                .collect())
        }

        fn list_by_product_master(
            &self,
            product_master_id: i64,
            filters: &PriceHistoryFilters,
        ) -> Result<Vec<PriceHistory>> {
            let mut found: Vec<PriceHistory> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.product_master_id == product_master_id)
                .filter(|r| filters.store_id.map_or(true, |s| r.store_id == Some(s)))
                .filter(|r| in_range(&filters.valid_from, r.valid_from))
                .cloned()
                .collect();
            found.sort_by_key(|r| (r.valid_from, r.id));
            if filters.direction == SortDirection::Desc {
                found.reverse();
            }
            Ok(found
                .into_iter()
                .skip(filters.pagination.offset() as usize)
                .take(filters.pagination.limit() as usize)
                .collect())
        }

        fn count_by_product_master(
            &self,
            product_master_id: i64,
            filters: &PriceHistoryFilters,
        ) -> Result<i64> {
            let unpaged = PriceHistoryFilters {
                pagination: Pagination::default(),
                ..filters.clone()
            };
            Ok(self.list_by_product_master(product_master_id, &unpaged)?.len() as i64)
        }

        async fn update(&self, record: PriceHistory) -> Result<PriceHistory> {
            let mut records = self.records.lock().unwrap();
            let slot = records
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or_else(|| Error::not_found(crate::errors::Entity::PriceHistory, record.id))?;
            *slot = record.clone();
            Ok(record)
        }

        async fn delete(&self, price_history_id: i64) -> Result<usize> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != price_history_id);
            Ok(before - records.len())
        }
    }

    // --- Helpers ---

    fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn new_price(
        store_id: Option<i64>,
        price: rust_decimal::Decimal,
        valid_from: DateTime<Utc>,
        valid_to: Option<DateTime<Utc>>,
    ) -> NewPriceHistory {
        NewPriceHistory {
            product_master_id: 42,
            store_id,
            price,
            currency: "EUR".to_string(),
            unit: Some("kg".to_string()),
            valid_from,
            valid_to,
        }
    }

    fn setup(
        now: DateTime<Utc>,
    ) -> (
        PriceHistoryService,
        Arc<MockPriceHistoryRepository>,
        Arc<FixedClock>,
    ) {
        let repo = Arc::new(MockPriceHistoryRepository::default());
        let clock = Arc::new(FixedClock::new(now));
        let service = PriceHistoryService::new(repo.clone(), clock.clone() as Arc<dyn Clock>);
        (service, repo, clock)
    }

    // ==================== Current price ====================

    #[tokio::test]
    async fn test_current_price_follows_windows() {
        let (service, _repo, clock) = setup(day(2024, 1, 1));
        let january = service
            .create(new_price(Some(1), dec!(2.49), day(2024, 1, 1), Some(day(2024, 1, 15))))
            .await
            .unwrap();
        let current = service
            .create(new_price(Some(1), dec!(2.79), day(2024, 1, 15), None))
            .await
            .unwrap();

        clock.set(day(2024, 1, 10));
        assert_eq!(service.get_current_price(42, Some(1)).unwrap(), january);

        clock.set(day(2024, 1, 20));
        assert_eq!(service.get_current_price(42, Some(1)).unwrap(), current);

        clock.set(day(2023, 12, 31));
        let err = service.get_current_price(42, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_store_price_beats_baseline() {
        let (service, _repo, _clock) = setup(day(2024, 3, 1));
        service
            .create(new_price(None, dec!(3.00), day(2024, 1, 1), None))
            .await
            .unwrap();
        let store = service
            .create(new_price(Some(7), dec!(2.50), day(2023, 6, 1), None))
            .await
            .unwrap();

        assert_eq!(service.get_current_price(42, Some(7)).unwrap(), store);
    }

    #[tokio::test]
    async fn test_baseline_used_when_store_has_no_price() {
        let (service, _repo, _clock) = setup(day(2024, 3, 1));
        let baseline = service
            .create(new_price(None, dec!(3.00), day(2024, 1, 1), None))
            .await
            .unwrap();
        service
            .create(new_price(Some(7), dec!(2.50), day(2024, 1, 1), None))
            .await
            .unwrap();

        assert_eq!(service.get_current_price(42, Some(8)).unwrap(), baseline);
    }

    #[tokio::test]
    async fn test_get_price_at_uses_given_instant() {
        let (service, _repo, _clock) = setup(day(2024, 6, 1));
        let old = service
            .create(new_price(Some(1), dec!(1.99), day(2024, 1, 1), None))
            .await
            .unwrap();
        service
            .create(new_price(Some(1), dec!(2.19), day(2024, 5, 1), None))
            .await
            .unwrap();

        let resolved = service.get_price_at(42, Some(1), day(2024, 2, 1)).unwrap();
        assert_eq!(resolved.id, old.id);
        assert_eq!(resolved.price, dec!(1.99));
    }

    // ==================== Create ====================

    #[tokio::test]
    async fn test_create_closes_previous_open_window() {
        let (service, repo, _clock) = setup(day(2024, 2, 1));
        let first = service
            .create(new_price(Some(1), dec!(4.00), day(2024, 1, 1), None))
            .await
            .unwrap();
        service
            .create(new_price(Some(1), dec!(4.50), day(2024, 1, 20), None))
            .await
            .unwrap();

        let stored_first = repo.all().into_iter().find(|r| r.id == first.id).unwrap();
        assert_eq!(stored_first.valid_to, Some(day(2024, 1, 20)));
        assert_eq!(repo.all().iter().filter(|r| r.is_open()).count(), 1);
    }

    #[tokio::test]
    async fn test_create_does_not_close_other_stores() {
        let (service, repo, _clock) = setup(day(2024, 2, 1));
        service
            .create(new_price(Some(1), dec!(4.00), day(2024, 1, 1), None))
            .await
            .unwrap();
        service
            .create(new_price(Some(2), dec!(4.10), day(2024, 1, 5), None))
            .await
            .unwrap();

        assert_eq!(repo.all().iter().filter(|r| r.is_open()).count(), 2);
    }

    #[tokio::test]
    async fn test_backdated_open_record_conflicts() {
        let (service, _repo, _clock) = setup(day(2024, 2, 1));
        service
            .create(new_price(Some(1), dec!(4.00), day(2024, 1, 10), None))
            .await
            .unwrap();

        let err = service
            .create(new_price(Some(1), dec!(3.90), day(2024, 1, 5), None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (service, _repo, _clock) = setup(day(2024, 2, 1));
        let negative = new_price(Some(1), dec!(-0.01), day(2024, 1, 1), None);
        assert_eq!(
            service.create(negative).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let empty_window = new_price(Some(1), dec!(1), day(2024, 1, 1), Some(day(2024, 1, 1)));
        assert_eq!(
            service.create(empty_window).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut no_currency = new_price(Some(1), dec!(1), day(2024, 1, 1), None);
        no_currency.currency = " ".to_string();
        assert!(service.create(no_currency).await.is_err());
    }

    #[tokio::test]
    async fn test_create_then_get_by_id_round_trip() {
        let (service, _repo, _clock) = setup(day(2024, 2, 1));
        let input = new_price(Some(3), dec!(12.3456), day(2024, 1, 1), Some(day(2024, 3, 1)));
        let created = service.create(input.clone()).await.unwrap();

        let fetched = service.get_by_id(created.id).unwrap();
        assert_eq!(fetched.product_master_id, input.product_master_id);
        assert_eq!(fetched.store_id, input.store_id);
        assert_eq!(fetched.price, dec!(12.3456));
        assert_eq!(fetched.currency, input.currency);
        assert_eq!(fetched.unit, input.unit);
        assert_eq!(fetched.valid_from, input.valid_from);
        assert_eq!(fetched.valid_to, input.valid_to);
    }

    // ==================== History listing ====================

    #[tokio::test]
    async fn test_history_store_filter_and_order() {
        let (service, _repo, _clock) = setup(day(2024, 6, 1));
        for (store, from) in [(1, 1), (2, 2), (1, 3), (2, 4)] {
            service
                .create(new_price(Some(store), dec!(1), day(2024, from, 1), None))
                .await
                .unwrap();
        }

        let store_one = service
            .get_by_product_master_id(42, Some(1), PriceHistoryFilters::default())
            .unwrap();
        assert_eq!(store_one.len(), 2);
        assert!(store_one.iter().all(|r| r.store_id == Some(1)));

        let all = service
            .get_by_product_master_id(42, None, PriceHistoryFilters::default())
            .unwrap();
        let months: Vec<_> = all.iter().map(|r| r.valid_from).collect();
        assert_eq!(
            months,
            vec![day(2024, 4, 1), day(2024, 3, 1), day(2024, 2, 1), day(2024, 1, 1)]
        );
    }

    #[tokio::test]
    async fn test_history_pagination_and_count() {
        let (service, _repo, _clock) = setup(day(2024, 6, 1));
        for month in 1..=5 {
            service
                .create(new_price(Some(1), dec!(1), day(2024, month, 1), None))
                .await
                .unwrap();
        }

        let filters = PriceHistoryFilters {
            pagination: Pagination::new(1, 2),
            ..PriceHistoryFilters::default()
        };
        let page = service.get_by_product_master_id(42, None, filters.clone()).unwrap();
        assert_eq!(
            page.iter().map(|r| r.valid_from).collect::<Vec<_>>(),
            vec![day(2024, 4, 1), day(2024, 3, 1)]
        );
        assert_eq!(service.get_price_history_count(42, &filters).unwrap(), 5);
    }

    // ==================== Admin accessors ====================

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, _repo, _clock) = setup(day(2024, 6, 1));
        let created = service
            .create(new_price(Some(1), dec!(5.00), day(2024, 1, 1), None))
            .await
            .unwrap();

        let corrected = service
            .update(PriceHistory {
                price: dec!(0.50),
                ..created.clone()
            })
            .await
            .unwrap();
        assert_eq!(service.get_by_id(created.id).unwrap().price, corrected.price);

        service.delete(created.id).await.unwrap();
        assert_eq!(
            service.get_by_id(created.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            service.delete(created.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    // ==================== Pure helpers ====================

    fn record(
        id: i64,
        store_id: Option<i64>,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> PriceHistory {
        PriceHistory {
            id,
            product_master_id: 42,
            store_id,
            price: dec!(1),
            currency: "EUR".to_string(),
            unit: None,
            valid_from: from,
            valid_to: to,
            created_at: from,
            updated_at: from,
        }
    }

    #[test]
    fn test_resolve_current_prefers_latest_valid_from_on_overlap() {
        let records = vec![
            record(1, Some(1), day(2024, 1, 1), None),
            record(2, Some(1), day(2024, 2, 1), None),
        ];
        let winner = resolve_current(&records, Some(1), day(2024, 3, 1)).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn test_resolve_current_boundary_goes_to_successor() {
        let records = vec![
            record(1, Some(1), day(2024, 1, 1), Some(day(2024, 1, 15))),
            record(2, Some(1), day(2024, 1, 15), None),
        ];
        let winner = resolve_current(&records, Some(1), day(2024, 1, 15)).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn test_closing_instant_only_for_open_incoming() {
        let existing = record(1, Some(1), day(2024, 1, 1), None);
        let closed_incoming = new_price(Some(1), dec!(1), day(2024, 2, 1), Some(day(2024, 2, 5)));
        assert_eq!(closing_instant_for(Some(&existing), &closed_incoming).unwrap(), None);

        let open_incoming = new_price(Some(1), dec!(1), day(2024, 2, 1), None);
        assert_eq!(
            closing_instant_for(Some(&existing), &open_incoming).unwrap(),
            Some(day(2024, 2, 1))
        );
        assert_eq!(closing_instant_for(None, &open_incoming).unwrap(), None);
    }
}
