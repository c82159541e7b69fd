use crate::cli::ServeArgs;
use crate::infra::{AppState, HeaderIdentity, InMemoryPipelineStore};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruit_pipeline::config::AppConfig;
use recruit_pipeline::error::AppError;
use recruit_pipeline::pipeline::{PipelineContext, PipelineEngine};
use recruit_pipeline::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let store = Arc::new(InMemoryPipelineStore::default());
    let context = Arc::new(PipelineContext {
        engine: PipelineEngine::new(store),
        identity: HeaderIdentity::default(),
    });

    let app = with_pipeline_routes(context)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "recruitment pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
