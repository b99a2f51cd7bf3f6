use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validity period of a tariff category. A missing `to` means the category
/// is open-ended: valid indefinitely from `from` (subject to the staleness
/// rule applied by the catalog filter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn closed(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to: Some(to) }
    }

    pub fn open(from: NaiveDate) -> Self {
        Self { from, to: None }
    }
}

/// Power-output window of a tariff category in kilowatts. A missing `to`
/// means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerRange {
    pub from: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

impl PowerRange {
    pub fn bounded(from: f64, to: f64) -> Self {
        Self { from, to: Some(to) }
    }

    pub fn unbounded(from: f64) -> Self {
        Self { from, to: None }
    }
}

/// A normalized regulatory tariff entry. Records are immutable once
/// ingested; normalization happens exactly once, at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffRecord {
    /// Partition key: the energy carrier category (e.g. "Solar/Gebäude").
    pub energy_source: String,
    /// Identity of the record within its energy source.
    pub category_code: String,
    pub designation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_period_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_criteria_text: Option<String>,
    /// Grouping tag for mutually-exclusive allocation classes. Display
    /// only, never consulted during matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proportional_allocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_range: Option<PowerRange>,
    /// Rate fields, ct/kWh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_in_tariff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_payment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_power_surcharge: Option<f64>,
    /// Provenance metadata, unused in matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
}

/// A transient query against the catalog. Only `energy_source` is required;
/// every absent field disables its filter stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TariffQuery {
    pub energy_source: String,
    pub commissioning_date: Option<NaiveDate>,
    pub power_output: Option<f64>,
    pub criteria_text: Option<String>,
    pub designation_text: Option<String>,
}

impl TariffQuery {
    pub fn for_source(energy_source: impl Into<String>) -> Self {
        Self {
            energy_source: energy_source.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a catalog query after filtering and sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffSelection {
    pub found: bool,
    pub records: Vec<TariffRecord>,
    pub total_count: usize,
}

impl TariffSelection {
    pub fn from_records(records: Vec<TariffRecord>) -> Self {
        let total_count = records.len();
        Self {
            found: total_count > 0,
            records,
            total_count,
        }
    }
}

/// Wire-facing response shape shared with the upstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<TariffRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TariffResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            found: false,
            records: None,
            total_count: None,
            error: Some(message.into()),
        }
    }
}

impl From<TariffSelection> for TariffResponse {
    fn from(selection: TariffSelection) -> Self {
        Self {
            found: selection.found,
            total_count: Some(selection.total_count),
            records: Some(selection.records),
            error: None,
        }
    }
}
