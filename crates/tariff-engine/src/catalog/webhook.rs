use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{TariffQuery, TariffRecord};
use super::store::TariffStore;
use super::{best_match, CatalogError, TariffCatalog};

/// Label attached to an entity when no tariff category could be matched.
pub const UNKNOWN_INSTALLATION: &str = "Unbekannte Anlage";

/// Payload the upstream workflow system posts when an entity needs tariff
/// rates attached. The resume token un-blocks the waiting workflow run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub energy_source: String,
    pub commissioning_date: Option<NaiveDate>,
    pub power_output: Option<f64>,
    pub resume_token: String,
    pub callback_url: String,
}

/// Rate fields plus provenance persisted onto the entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRateUpdate {
    pub designation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    pub energy_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_in_tariff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_payment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_power_surcharge: Option<f64>,
}

impl EntityRateUpdate {
    fn from_record(record: &TariffRecord) -> Self {
        Self {
            designation: record.designation.clone(),
            category_code: Some(record.category_code.clone()),
            energy_source: record.energy_source.clone(),
            feed_in_tariff: record.feed_in_tariff,
            reference_value: record.reference_value,
            fallback_payment: record.fallback_payment,
            tenant_power_surcharge: record.tenant_power_surcharge,
        }
    }

    fn unknown(energy_source: &str) -> Self {
        Self {
            designation: UNKNOWN_INSTALLATION.to_string(),
            category_code: None,
            energy_source: energy_source.to_string(),
            feed_in_tariff: None,
            reference_value: None,
            fallback_payment: None,
            tenant_power_surcharge: None,
        }
    }
}

/// Outbound side of the webhook flow: persisting rates onto the entity and
/// resuming the upstream workflow.
#[async_trait]
pub trait WorkflowGateway: Send + Sync {
    async fn apply_rates(&self, update: &EntityRateUpdate) -> Result<(), GatewayError>;
    async fn resume_workflow(
        &self,
        callback_url: &str,
        resume_token: &str,
    ) -> Result<(), GatewayError>;
}

/// Gateway failures are fatal for the invocation: a dropped callback would
/// leave the upstream workflow hanging indefinitely.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("entity update failed: {0}")]
    EntityUpdate(String),
    #[error("workflow callback failed: {0}")]
    Callback(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    /// Always `"ok"` when the invocation completed; failures never produce
    /// an outcome, they propagate as errors.
    pub status: &'static str,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
}

/// Automation flow: query by energy source and commissioning date, reduce
/// to the best single match by power, persist, then resume the workflow.
pub struct TariffWebhookService<S, G> {
    catalog: TariffCatalog<S>,
    gateway: Arc<G>,
}

impl<S, G> TariffWebhookService<S, G>
where
    S: TariffStore,
    G: WorkflowGateway,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self {
            catalog: TariffCatalog::new(store),
            gateway,
        }
    }

    pub async fn handle(&self, request: WebhookRequest) -> Result<WebhookOutcome, WebhookError> {
        // Power narrows the best-match pick, not the candidate list.
        let query = TariffQuery {
            energy_source: request.energy_source.clone(),
            commissioning_date: request.commissioning_date,
            ..TariffQuery::default()
        };
        let selection = self.catalog.query(&query)?;
        let best = best_match(&selection.records, request.power_output);

        let update = match best {
            Some(record) => EntityRateUpdate::from_record(record),
            None => EntityRateUpdate::unknown(&request.energy_source),
        };
        let outcome = WebhookOutcome {
            status: "ok",
            matched: best.is_some(),
            category_code: best.map(|record| record.category_code.clone()),
        };

        self.gateway.apply_rates(&update).await?;
        self.gateway
            .resume_workflow(&request.callback_url, &request.resume_token)
            .await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::PowerRange;
    use crate::catalog::store::StoreError;
    use std::sync::Mutex;

    struct FixedStore {
        records: Vec<TariffRecord>,
    }

    impl TariffStore for FixedStore {
        fn by_energy_source(&self, _: &str) -> Result<Vec<TariffRecord>, StoreError> {
            Ok(self.records.clone())
        }

        fn put_batch(&self, _: &[TariffRecord]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        updates: Mutex<Vec<EntityRateUpdate>>,
        callbacks: Mutex<Vec<(String, String)>>,
        fail_callback: bool,
    }

    #[async_trait]
    impl WorkflowGateway for RecordingGateway {
        async fn apply_rates(&self, update: &EntityRateUpdate) -> Result<(), GatewayError> {
            self.updates
                .lock()
                .expect("gateway mutex poisoned")
                .push(update.clone());
            Ok(())
        }

        async fn resume_workflow(
            &self,
            callback_url: &str,
            resume_token: &str,
        ) -> Result<(), GatewayError> {
            if self.fail_callback {
                return Err(GatewayError::Callback("upstream returned 500".to_string()));
            }
            self.callbacks
                .lock()
                .expect("gateway mutex poisoned")
                .push((callback_url.to_string(), resume_token.to_string()));
            Ok(())
        }
    }

    fn record(category_code: &str, from: f64, to: Option<f64>, rate: f64) -> TariffRecord {
        TariffRecord {
            energy_source: "Solar/Gebäude".to_string(),
            category_code: category_code.to_string(),
            designation: format!("Kategorie {category_code}"),
            raw_period_text: None,
            raw_criteria_text: None,
            proportional_allocation: None,
            date_range: None,
            power_range: Some(PowerRange { from, to }),
            feed_in_tariff: Some(rate),
            reference_value: None,
            fallback_payment: None,
            tenant_power_surcharge: None,
            added_date: None,
        }
    }

    fn request(power_output: Option<f64>) -> WebhookRequest {
        WebhookRequest {
            energy_source: "Solar/Gebäude".to_string(),
            commissioning_date: None,
            power_output,
            resume_token: "token-42".to_string(),
            callback_url: "https://workflow.example/resume".to_string(),
        }
    }

    #[tokio::test]
    async fn attaches_rates_from_the_best_match_and_resumes() {
        let store = Arc::new(FixedStore {
            records: vec![
                record("klein", 0.0, Some(10.0), 12.6),
                record("mittel", 10.0, Some(100.0), 10.8),
            ],
        });
        let gateway = Arc::new(RecordingGateway::default());
        let service = TariffWebhookService::new(store, gateway.clone());

        let outcome = service.handle(request(Some(40.0))).await.expect("handled");
        assert_eq!(outcome.status, "ok");
        assert!(outcome.matched);
        assert_eq!(outcome.category_code.as_deref(), Some("mittel"));

        let updates = gateway.updates.lock().expect("gateway mutex poisoned");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].feed_in_tariff, Some(10.8));

        let callbacks = gateway.callbacks.lock().expect("gateway mutex poisoned");
        assert_eq!(
            callbacks[0],
            (
                "https://workflow.example/resume".to_string(),
                "token-42".to_string()
            )
        );
    }

    #[tokio::test]
    async fn unknown_installation_when_no_candidates_exist() {
        let store = Arc::new(FixedStore {
            records: Vec::new(),
        });
        let gateway = Arc::new(RecordingGateway::default());
        let service = TariffWebhookService::new(store, gateway.clone());

        let outcome = service.handle(request(Some(40.0))).await.expect("handled");
        assert_eq!(outcome.status, "ok");
        assert!(!outcome.matched);
        assert_eq!(outcome.category_code, None);

        let updates = gateway.updates.lock().expect("gateway mutex poisoned");
        assert_eq!(updates[0].designation, UNKNOWN_INSTALLATION);
        assert_eq!(updates[0].feed_in_tariff, None);

        // The workflow is resumed even without a match.
        let callbacks = gateway.callbacks.lock().expect("gateway mutex poisoned");
        assert_eq!(callbacks.len(), 1);
    }

    #[tokio::test]
    async fn callback_failures_propagate() {
        let store = Arc::new(FixedStore {
            records: vec![record("klein", 0.0, Some(10.0), 12.6)],
        });
        let gateway = Arc::new(RecordingGateway {
            fail_callback: true,
            ..RecordingGateway::default()
        });
        let service = TariffWebhookService::new(store, gateway.clone());

        let error = service
            .handle(request(None))
            .await
            .expect_err("callback failure is fatal");
        assert!(matches!(
            error,
            WebhookError::Gateway(GatewayError::Callback(_))
        ));
    }
}
