use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::ServeArgs;
use crate::infra::{build_advisor, build_assistant, build_catalog, AppState};
use crate::routes::with_advisor_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use card_advisor::config::AppConfig;
use card_advisor::error::AppError;
use card_advisor::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.catalog.take() {
        config.catalog.path = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = build_catalog(&config.catalog)?;
    let assistant = build_assistant(&config.assistant)?;
    let (advisor, _sink) = build_advisor(catalog, assistant);
    let assisted = advisor.has_assistant();

    let app = with_advisor_routes(Arc::new(advisor))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, assisted, "card advisor ready");

    axum::serve(listener, app).await?;
    Ok(())
}
