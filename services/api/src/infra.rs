use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tariff_engine::catalog::domain::TariffRecord;
use tariff_engine::catalog::store::{StoreError, TariffStore};
use tariff_engine::catalog::webhook::{EntityRateUpdate, GatewayError, WorkflowGateway};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Partition-keyed in-memory store. Records with the same category code
/// within an energy source overwrite each other, matching the external
/// store's keying.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTariffStore {
    partitions: Arc<Mutex<HashMap<String, Vec<TariffRecord>>>>,
}

impl TariffStore for InMemoryTariffStore {
    fn by_energy_source(&self, energy_source: &str) -> Result<Vec<TariffRecord>, StoreError> {
        let guard = self.partitions.lock().expect("store mutex poisoned");
        Ok(guard.get(energy_source).cloned().unwrap_or_default())
    }

    fn put_batch(&self, records: &[TariffRecord]) -> Result<(), StoreError> {
        let mut guard = self.partitions.lock().expect("store mutex poisoned");
        for record in records {
            let partition = guard.entry(record.energy_source.clone()).or_default();
            match partition
                .iter_mut()
                .find(|existing| existing.category_code == record.category_code)
            {
                Some(existing) => *existing = record.clone(),
                None => partition.push(record.clone()),
            }
        }
        Ok(())
    }
}

/// Production gateway: posts rate updates to the configured entity endpoint
/// and resumes the upstream workflow via its callback URL.
pub(crate) struct HttpWorkflowGateway {
    client: reqwest::Client,
    entity_endpoint: Option<String>,
}

impl HttpWorkflowGateway {
    pub(crate) fn new(entity_endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            entity_endpoint,
        }
    }
}

#[async_trait]
impl WorkflowGateway for HttpWorkflowGateway {
    async fn apply_rates(&self, update: &EntityRateUpdate) -> Result<(), GatewayError> {
        let Some(endpoint) = self.entity_endpoint.as_deref() else {
            info!(designation = %update.designation, "no entity endpoint configured, rate update not forwarded");
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .json(update)
            .send()
            .await
            .map_err(|err| GatewayError::EntityUpdate(err.to_string()))?;
        response
            .error_for_status()
            .map_err(|err| GatewayError::EntityUpdate(err.to_string()))?;
        Ok(())
    }

    async fn resume_workflow(
        &self,
        callback_url: &str,
        resume_token: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(callback_url)
            .json(&serde_json::json!({ "resumeToken": resume_token }))
            .send()
            .await
            .map_err(|err| GatewayError::Callback(err.to_string()))?;
        response
            .error_for_status()
            .map_err(|err| GatewayError::Callback(err.to_string()))?;
        Ok(())
    }
}

pub(crate) fn parse_query_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Power arrives as a numeric string in kW; the decimal comma of the source
/// locale is tolerated.
pub(crate) fn parse_query_power(raw: &str) -> Result<f64, String> {
    raw.trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("failed to parse '{raw}' as a power value in kW"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_query_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

pub(crate) fn deserialize_optional_power<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_query_power(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tariff_engine::catalog::domain::PowerRange;

    fn record(energy_source: &str, category_code: &str) -> TariffRecord {
        TariffRecord {
            energy_source: energy_source.to_string(),
            category_code: category_code.to_string(),
            designation: format!("Kategorie {category_code}"),
            raw_period_text: None,
            raw_criteria_text: None,
            proportional_allocation: None,
            date_range: None,
            power_range: Some(PowerRange::bounded(0.0, 100.0)),
            feed_in_tariff: Some(8.2),
            reference_value: None,
            fallback_payment: None,
            tenant_power_surcharge: None,
            added_date: None,
        }
    }

    #[test]
    fn store_partitions_by_energy_source() {
        let store = InMemoryTariffStore::default();
        store
            .put_batch(&[record("Wind", "W-1"), record("Solar/Gebäude", "S-1")])
            .expect("write succeeds");

        let wind = store.by_energy_source("Wind").expect("lookup succeeds");
        assert_eq!(wind.len(), 1);
        assert_eq!(wind[0].category_code, "W-1");
        assert!(store
            .by_energy_source("Biomasse")
            .expect("lookup succeeds")
            .is_empty());
    }

    #[test]
    fn rewriting_a_category_code_overwrites_the_record() {
        let store = InMemoryTariffStore::default();
        store.put_batch(&[record("Wind", "W-1")]).expect("write");

        let mut updated = record("Wind", "W-1");
        updated.feed_in_tariff = Some(6.19);
        store.put_batch(&[updated]).expect("write");

        let wind = store.by_energy_source("Wind").expect("lookup succeeds");
        assert_eq!(wind.len(), 1);
        assert_eq!(wind[0].feed_in_tariff, Some(6.19));
    }

    #[test]
    fn power_strings_accept_the_decimal_comma() {
        assert_eq!(parse_query_power("25"), Ok(25.0));
        assert_eq!(parse_query_power("0,5"), Ok(0.5));
        assert!(parse_query_power("viel").is_err());
    }
}
