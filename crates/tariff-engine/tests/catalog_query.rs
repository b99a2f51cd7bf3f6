use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tariff_engine::catalog::domain::{DateRange, PowerRange, TariffQuery, TariffRecord};
use tariff_engine::catalog::store::{StoreError, TariffStore};
use tariff_engine::catalog::{CatalogError, TariffCatalog};

struct CountingStore {
    records: Vec<TariffRecord>,
    lookups: AtomicUsize,
}

impl CountingStore {
    fn with_records(records: Vec<TariffRecord>) -> Self {
        Self {
            records,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl TariffStore for CountingStore {
    fn by_energy_source(&self, energy_source: &str) -> Result<Vec<TariffRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .records
            .iter()
            .filter(|record| record.energy_source == energy_source)
            .cloned()
            .collect())
    }

    fn put_batch(&self, _: &[TariffRecord]) -> Result<(), StoreError> {
        Ok(())
    }
}

fn record(category_code: &str, power_range: Option<PowerRange>) -> TariffRecord {
    TariffRecord {
        energy_source: "Solar/Gebäude".to_string(),
        category_code: category_code.to_string(),
        designation: format!("Kategorie {category_code}"),
        raw_period_text: None,
        raw_criteria_text: None,
        proportional_allocation: None,
        date_range: Some(DateRange::closed(
            NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date"),
            NaiveDate::from_ymd_opt(2030, 12, 31).expect("valid date"),
        )),
        power_range,
        feed_in_tariff: Some(10.0),
        reference_value: None,
        fallback_payment: None,
        tenant_power_surcharge: None,
        added_date: None,
    }
}

#[test]
fn power_query_returns_containing_ranges_sorted_ascending() {
    let store = Arc::new(CountingStore::with_records(vec![
        record("c-100", Some(PowerRange::bounded(100.0, 500.0))),
        record("c-0", Some(PowerRange::bounded(0.0, 40.0))),
        record("c-10", Some(PowerRange::unbounded(10.0))),
    ]));
    let catalog = TariffCatalog::new(store);

    let query = TariffQuery {
        power_output: Some(25.0),
        ..TariffQuery::for_source("Solar/Gebäude")
    };
    let selection = catalog.query(&query).expect("query succeeds");

    assert!(selection.found);
    assert_eq!(selection.total_count, 2);
    let order: Vec<&str> = selection
        .records
        .iter()
        .map(|record| record.category_code.as_str())
        .collect();
    assert_eq!(order, vec!["c-0", "c-10"]);
}

#[test]
fn empty_energy_type_fails_without_a_store_lookup() {
    let store = Arc::new(CountingStore::with_records(vec![record("c-0", None)]));
    let catalog = TariffCatalog::new(store.clone());

    let error = catalog
        .query(&TariffQuery::default())
        .expect_err("validation fails");
    assert!(matches!(error, CatalogError::MissingEnergyType));
    assert_eq!(error.to_string(), "energyType parameter is required");
    assert_eq!(store.lookups.load(Ordering::Relaxed), 0);
}

#[test]
fn unknown_energy_source_is_found_false_not_an_error() {
    let store = Arc::new(CountingStore::with_records(vec![record("c-0", None)]));
    let catalog = TariffCatalog::new(store);

    let selection = catalog
        .query(&TariffQuery::for_source("Wasserkraft"))
        .expect("query succeeds");
    assert!(!selection.found);
    assert_eq!(selection.total_count, 0);
}

#[test]
fn commissioning_date_filter_honors_staleness_of_open_ranges() {
    let fresh_start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
    let stale_start = NaiveDate::from_ymd_opt(2017, 1, 1).expect("valid date");

    let mut fresh = record("fresh", None);
    fresh.date_range = Some(DateRange::open(fresh_start));
    let mut stale = record("stale", None);
    stale.date_range = Some(DateRange::open(stale_start));
    let mut undated = record("undated", None);
    undated.date_range = None;

    let store = Arc::new(CountingStore::with_records(vec![fresh, stale, undated]));
    let catalog = TariffCatalog::new(store);

    let query = TariffQuery {
        commissioning_date: Some(NaiveDate::from_ymd_opt(2020, 6, 1).expect("valid date")),
        ..TariffQuery::for_source("Solar/Gebäude")
    };
    let selection = catalog.query(&query).expect("query succeeds");

    let order: Vec<&str> = selection
        .records
        .iter()
        .map(|record| record.category_code.as_str())
        .collect();
    assert_eq!(order, vec!["fresh"]);
}
