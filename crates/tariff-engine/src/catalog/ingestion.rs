use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{error, warn};

use super::date_text;
use super::domain::TariffRecord;
use super::power_text;
use super::store::TariffStore;

/// Records per store write. The batch API caps writes at this size.
const PERSIST_CHUNK_SIZE: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read tariff sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tariff sheet data: {0}")]
    Sheet(#[from] csv::Error),
}

/// Batch transform from the regulatory spreadsheet export to normalized
/// records. Ingestion is best-effort over noisy data: rows and cells that
/// cannot be normalized are logged and skipped, never fatal.
pub struct TariffSheetImporter;

impl TariffSheetImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TariffRecord>, IngestError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_sheet(&raw)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Vec<TariffRecord>, IngestError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Self::from_sheet(&raw)
    }

    /// Normalize a whole sheet, preserving row order. No deduplication by
    /// category code happens here; duplicates overwrite each other once the
    /// external store persists them.
    pub fn from_sheet(raw: &str) -> Result<Vec<TariffRecord>, IngestError> {
        let mut sheet_reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(raw))
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let mut records = Vec::new();
        for row in sheet_reader.deserialize::<SheetRow>() {
            if let Some(record) = normalize_row(row?) {
                records.push(record);
            }
        }

        Ok(records)
    }
}

/// Write normalized records to the store in fixed-size sequential chunks.
/// A failed chunk is logged and skipped so one bad chunk cannot abort the
/// run; the report carries what actually landed.
pub fn persist<S: TariffStore>(records: &[TariffRecord], store: &S) -> PersistReport {
    let mut report = PersistReport::default();

    for chunk in records.chunks(PERSIST_CHUNK_SIZE) {
        match store.put_batch(chunk) {
            Ok(()) => report.written += chunk.len(),
            Err(err) => {
                error!(chunk_len = chunk.len(), %err, "tariff chunk write failed, continuing");
                report.failed += chunk.len();
                report.failed_chunks += 1;
            }
        }
    }

    report
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub written: usize,
    pub failed: usize,
    pub failed_chunks: usize,
}

/// Raw sheet row in the fixed export column order.
#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Kategorie", default, deserialize_with = "empty_string_as_none")]
    category_code: Option<String>,
    #[serde(rename = "Bezeichnung", default, deserialize_with = "empty_string_as_none")]
    designation: Option<String>,
    #[serde(
        rename = "Energieträger",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    energy_source: Option<String>,
    #[serde(
        rename = "Inbetriebnahme",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    period_text: Option<String>,
    #[serde(rename = "Leistung", default, deserialize_with = "empty_string_as_none")]
    criteria_text: Option<String>,
    #[serde(
        rename = "Anteilige Zuordnung",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    proportional_allocation: Option<String>,
    #[serde(
        rename = "Vergütungssatz",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    feed_in_tariff: Option<String>,
    #[serde(
        rename = "Anzulegender Wert",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    reference_value: Option<String>,
    #[serde(
        rename = "Auffangvergütung",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    fallback_payment: Option<String>,
    #[serde(
        rename = "Mieterstromzuschlag",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    tenant_power_surcharge: Option<String>,
    #[serde(rename = "Hinzugefügt", default, deserialize_with = "empty_string_as_none")]
    added_date: Option<String>,
}

fn normalize_row(row: SheetRow) -> Option<TariffRecord> {
    // Rows without a category code are filler inside the header region.
    let category_code = row.category_code?;

    let (Some(energy_source), Some(designation)) = (row.energy_source, row.designation) else {
        warn!(%category_code, "skipping row without energy source or designation");
        return None;
    };

    let date_range = row.period_text.as_deref().and_then(|text| {
        let parsed = date_text::parse(text);
        if parsed.is_none() {
            warn!(%category_code, period = %text, "unrecognized commissioning period, stored without date range");
        }
        parsed
    });

    let power_range = row.criteria_text.as_deref().and_then(|text| {
        let parsed = power_text::parse(text);
        if parsed.is_none() {
            warn!(%category_code, criteria = %text, "unrecognized power criteria, stored without power range");
        }
        parsed
    });

    Some(TariffRecord {
        energy_source,
        category_code,
        designation,
        raw_period_text: row.period_text,
        raw_criteria_text: row.criteria_text,
        proportional_allocation: row.proportional_allocation,
        date_range,
        power_range,
        feed_in_tariff: row.feed_in_tariff.as_deref().and_then(parse_rate),
        reference_value: row.reference_value.as_deref().and_then(parse_rate),
        fallback_payment: row.fallback_payment.as_deref().and_then(parse_rate),
        tenant_power_surcharge: row.tenant_power_surcharge.as_deref().and_then(parse_rate),
        added_date: row.added_date,
    })
}

/// Rate cells use the German decimal comma.
fn parse_rate(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

fn sniff_delimiter(raw: &str) -> u8 {
    let header = raw.lines().next().unwrap_or_default();
    if header.matches(';').count() >= header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
