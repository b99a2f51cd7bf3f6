use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tariff_engine::catalog::domain::{TariffQuery, TariffResponse};
use tariff_engine::catalog::ingestion::{self, TariffSheetImporter};
use tariff_engine::catalog::webhook::{
    TariffWebhookService, WebhookOutcome, WebhookRequest, WorkflowGateway,
};
use tariff_engine::catalog::TariffCatalog;
use tariff_engine::error::AppError;

use crate::infra::{
    deserialize_optional_date, deserialize_optional_power, AppState, HttpWorkflowGateway,
    InMemoryTariffStore,
};

/// Generic over the gateway so tests can swap the HTTP gateway for a
/// double and still exercise the real handlers.
pub(crate) struct ApiServices<G = HttpWorkflowGateway> {
    pub(crate) store: Arc<InMemoryTariffStore>,
    pub(crate) catalog: Arc<TariffCatalog<InMemoryTariffStore>>,
    pub(crate) webhook: Arc<TariffWebhookService<InMemoryTariffStore, G>>,
}

impl<G> Clone for ApiServices<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            catalog: self.catalog.clone(),
            webhook: self.webhook.clone(),
        }
    }
}

impl<G> ApiServices<G>
where
    G: WorkflowGateway,
{
    pub(crate) fn new(store: Arc<InMemoryTariffStore>, gateway: Arc<G>) -> Self {
        Self {
            catalog: Arc::new(TariffCatalog::new(store.clone())),
            webhook: Arc::new(TariffWebhookService::new(store.clone(), gateway)),
            store,
        }
    }
}

/// Upstream query parameters. Field names follow the established external
/// interface, including the German `bezeichnung` for the designation filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TariffQueryParams {
    #[serde(default)]
    pub(crate) energy_type: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) commissioning_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_power")]
    pub(crate) power_output: Option<f64>,
    #[serde(default)]
    pub(crate) criteria: Option<String>,
    #[serde(default)]
    pub(crate) bezeichnung: Option<String>,
}

impl TariffQueryParams {
    fn into_query(self) -> TariffQuery {
        TariffQuery {
            energy_source: self.energy_type,
            commissioning_date: self.commissioning_date,
            power_output: self.power_output,
            criteria_text: self.criteria.filter(|value| !value.trim().is_empty()),
            designation_text: self.bezeichnung.filter(|value| !value.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IngestResponse {
    pub(crate) normalized: usize,
    pub(crate) written: usize,
    pub(crate) failed: usize,
}

pub(crate) fn tariff_router<G>(services: ApiServices<G>) -> Router
where
    G: WorkflowGateway + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/tariffs", get(tariff_query_endpoint::<G>))
        .route("/api/v1/tariffs/webhook", post(tariff_webhook_endpoint::<G>))
        .route("/api/v1/tariffs/ingest", post(tariff_ingest_endpoint::<G>))
        .with_state(services)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn tariff_query_endpoint<G>(
    State(services): State<ApiServices<G>>,
    Query(params): Query<TariffQueryParams>,
) -> Result<Json<TariffResponse>, AppError>
where
    G: WorkflowGateway + 'static,
{
    let selection = services.catalog.query(&params.into_query())?;
    Ok(Json(selection.into()))
}

pub(crate) async fn tariff_webhook_endpoint<G>(
    State(services): State<ApiServices<G>>,
    Json(request): Json<WebhookRequest>,
) -> Result<Json<WebhookOutcome>, AppError>
where
    G: WorkflowGateway + 'static,
{
    let outcome = services.webhook.handle(request).await?;
    Ok(Json(outcome))
}

pub(crate) async fn tariff_ingest_endpoint<G>(
    State(services): State<ApiServices<G>>,
    body: String,
) -> Result<Json<IngestResponse>, AppError>
where
    G: WorkflowGateway + 'static,
{
    let records = TariffSheetImporter::from_sheet(&body)?;
    let report = ingestion::persist(&records, services.store.as_ref());
    Ok(Json(IngestResponse {
        normalized: records.len(),
        written: report.written,
        failed: report.failed,
    }))
}
