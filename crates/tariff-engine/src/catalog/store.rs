use super::domain::TariffRecord;

/// Storage abstraction so the catalog and ingestion can be exercised
/// without a live backing store. The store is a partition-style lookup
/// keyed by energy source and gives no ordering guarantee; the catalog
/// performs its own sort.
pub trait TariffStore: Send + Sync {
    fn by_energy_source(&self, energy_source: &str) -> Result<Vec<TariffRecord>, StoreError>;
    fn put_batch(&self, records: &[TariffRecord]) -> Result<(), StoreError>;
}

/// Error enumeration for store failures. Lookup failures surface as a
/// generic server-side failure with no partial results.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tariff store unavailable: {0}")]
    Unavailable(String),
    #[error("tariff store rejected the batch: {0}")]
    Rejected(String),
}
