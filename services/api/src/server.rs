use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRankingRepository, InMemoryScholarshipCatalog, SeedData};
use crate::routes::with_distribution_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scholarship_quota::config::{AppConfig, DistributionConfig};
use scholarship_quota::error::AppError;
use scholarship_quota::telemetry;
use scholarship_quota::workflows::distribution::{
    DistributionService, EligibilityEvaluator, PermissiveEvaluator, StudentDataEvaluator,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type InMemoryDistributionService =
    DistributionService<InMemoryRankingRepository, InMemoryScholarshipCatalog>;

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

    let distribution_service = Arc::new(build_distribution_service(&config.distribution)?);

    let app = with_distribution_routes(distribution_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scholarship quota distribution ready");

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn build_distribution_service(
    config: &DistributionConfig,
) -> Result<InMemoryDistributionService, AppError> {
    let seed = match &config.seed_path {
        Some(path) => {
            let seed = SeedData::from_path(path)?;
            info!(
                path = %path.display(),
                rankings = seed.rankings.len(),
                configurations = seed.configurations.len(),
                "distribution seed loaded"
            );
            seed
        }
        None => {
            warn!("DISTRIBUTION_SEED_PATH not set, starting with empty stores");
            SeedData::default()
        }
    };
    let (rankings, catalog) = seed.into_stores()?;

    let evaluator: Arc<dyn EligibilityEvaluator> = if config.enforce_eligibility_rules {
        Arc::new(StudentDataEvaluator)
    } else {
        Arc::new(PermissiveEvaluator)
    };

    Ok(DistributionService::with_evaluator(
        Arc::new(rankings),
        Arc::new(catalog),
        evaluator,
    ))
}
