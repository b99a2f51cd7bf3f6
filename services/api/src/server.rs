use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tariff_engine::catalog::ingestion::{self, TariffSheetImporter};
use tariff_engine::config::AppConfig;
use tariff_engine::error::AppError;
use tariff_engine::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, HttpWorkflowGateway, InMemoryTariffStore};
use crate::routes::{tariff_router, ApiServices};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.catalog_path = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryTariffStore::default());
    if let Some(path) = config.catalog_path.as_ref() {
        let records = TariffSheetImporter::from_path(path)?;
        let report = ingestion::persist(&records, store.as_ref());
        info!(
            normalized = records.len(),
            written = report.written,
            failed = report.failed,
            "seeded tariff store from catalog sheet"
        );
    }

    let gateway = Arc::new(HttpWorkflowGateway::new(config.entity_endpoint.clone()));
    let services = ApiServices::new(store, gateway);

    let app = tariff_router(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tariff matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
