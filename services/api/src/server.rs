use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use expert_console::config::AppConfig;
use expert_console::error::AppError;
use expert_console::review::{
    misconfigured_router, review_router, CommonAccount, ExpertReviewService, UpdatePaths,
};
use expert_console::supabase::SupabaseBackend;
use expert_console::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let paths = UpdatePaths::from(&config.review);
    if config.review.common_account.is_none() {
        warn!("COMMON_MAIL_ADDRESS is not set; authorized updates will be refused");
    }

    let review_routes = match config.backend.credentials() {
        Ok(credentials) => {
            let backend = SupabaseBackend::connect(credentials, &config.backend)?;
            let service = ExpertReviewService::new(
                backend.store.clone(),
                backend.store,
                backend.identity,
                config.review.common_account.clone().map(CommonAccount::new),
                paths,
            );
            review_router(Arc::new(service))
        }
        Err(err) => {
            warn!(error = %err, "backend not configured; review routes will report a server error");
            misconfigured_router(err.to_string())
        }
    };

    let app = with_operational_routes(review_routes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        direct_update = paths.direct,
        authorized_update = paths.authorized,
        "expert review console ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
