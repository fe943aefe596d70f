use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAssessmentRepository, InMemoryJobStore};
use crate::routes::with_platform_routes;
use crate::seed::demo_assessment;
use assess_ai::config::AppConfig;
use assess_ai::error::AppError;
use assess_ai::evaluator::{HttpTransport, ResponseCache, TextEvaluator};
use assess_ai::service::AssessmentService;
use assess_ai::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let repository = Arc::new(InMemoryAssessmentRepository::default());
    repository.insert_snapshot(demo_assessment());
    let jobs = Arc::new(InMemoryJobStore::default());

    let transport = HttpTransport::new(&config.evaluator)?;
    let evaluator = Arc::new(TextEvaluator::new(
        Arc::new(transport),
        ResponseCache::new(config.evaluator.cache_ttl),
    ));

    let service = Arc::new(AssessmentService::new(
        repository,
        jobs,
        evaluator,
        config.evaluator.model.clone(),
    ));

    let app = with_platform_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "assessment scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
