pub mod date_text;
pub mod domain;
pub mod ingestion;
pub mod matcher;
pub mod power_text;
pub mod store;
pub mod webhook;

use std::sync::Arc;

use chrono::NaiveDate;

use domain::{TariffQuery, TariffRecord, TariffSelection};
use matcher::{date_in_range, open_range_is_stale, power_in_range};
use store::{StoreError, TariffStore};

/// Error raised by the catalog query pipeline. The missing-parameter
/// message is part of the upstream contract and must stay stable.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("energyType parameter is required")]
    MissingEnergyType,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Query service composing the store lookup with the filter pipeline.
pub struct TariffCatalog<S> {
    store: Arc<S>,
}

impl<S> TariffCatalog<S>
where
    S: TariffStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run the full query pipeline: validate, fetch candidates for the
    /// energy-source partition, filter, and sort. The store is never
    /// consulted for a query without an energy source.
    pub fn query(&self, query: &TariffQuery) -> Result<TariffSelection, CatalogError> {
        if query.energy_source.trim().is_empty() {
            return Err(CatalogError::MissingEnergyType);
        }

        let candidates = self.store.by_energy_source(&query.energy_source)?;
        Ok(TariffSelection::from_records(filter_records(
            candidates, query,
        )))
    }
}

/// Pure filter/sort pipeline over candidate records. Each optional query
/// field gates one stage; records lacking the dimension a stage filters on
/// are dropped by that stage.
pub fn filter_records(records: Vec<TariffRecord>, query: &TariffQuery) -> Vec<TariffRecord> {
    let mut records: Vec<TariffRecord> = records
        .into_iter()
        .filter(|record| matches_commissioning_date(record, query.commissioning_date))
        .filter(|record| {
            contains_case_insensitive(
                record.raw_criteria_text.as_deref(),
                query.criteria_text.as_deref(),
            )
        })
        .filter(|record| {
            contains_case_insensitive(
                Some(record.designation.as_str()),
                query.designation_text.as_deref(),
            )
        })
        .filter(|record| matches_power_output(record, query.power_output))
        .collect();

    // Stable sort; records without a power range keep their relative order
    // after every record that has one.
    records.sort_by(|a, b| power_sort_key(a).total_cmp(&power_sort_key(b)));
    records
}

/// Pick the single record the automation flow attaches to an entity: the
/// first sorted record containing the concrete power value, falling back to
/// the first (smallest-power) record.
pub fn best_match(records: &[TariffRecord], power_output: Option<f64>) -> Option<&TariffRecord> {
    match power_output {
        Some(power) => records
            .iter()
            .find(|record| {
                record
                    .power_range
                    .as_ref()
                    .is_some_and(|range| power_in_range(power, range))
            })
            .or_else(|| records.first()),
        None => records.first(),
    }
}

fn matches_commissioning_date(record: &TariffRecord, date: Option<NaiveDate>) -> bool {
    match date {
        None => true,
        Some(date) => record
            .date_range
            .as_ref()
            .is_some_and(|range| date_in_range(date, range) && !open_range_is_stale(date, range)),
    }
}

fn matches_power_output(record: &TariffRecord, power: Option<f64>) -> bool {
    match power {
        None => true,
        Some(power) => record
            .power_range
            .as_ref()
            .is_some_and(|range| power_in_range(power, range)),
    }
}

fn contains_case_insensitive(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack
            .is_some_and(|haystack| haystack.to_lowercase().contains(&needle.to_lowercase())),
    }
}

fn power_sort_key(record: &TariffRecord) -> f64 {
    record
        .power_range
        .as_ref()
        .map_or(f64::INFINITY, |range| range.from)
}
