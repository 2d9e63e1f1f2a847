use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::RankingId;
use super::repository::{RankingRepository, ScholarshipCatalog};
use super::service::{DistributionService, DistributionServiceError};

/// Router builder exposing distribution execution, results, and roster export.
pub fn distribution_router<R, C>(service: Arc<DistributionService<R, C>>) -> Router
where
    R: RankingRepository + 'static,
    C: ScholarshipCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/rankings/:ranking_id/distribution",
            post(execute_handler::<R, C>).get(results_handler::<R, C>),
        )
        .route(
            "/api/v1/rankings/:ranking_id/roster",
            get(roster_handler::<R, C>),
        )
        .with_state(service)
}

pub(crate) async fn execute_handler<R, C>(
    State(service): State<Arc<DistributionService<R, C>>>,
    Path(ranking_id): Path<String>,
) -> Response
where
    R: RankingRepository + 'static,
    C: ScholarshipCatalog + 'static,
{
    let ranking_id = RankingId(ranking_id);
    match service.execute(&ranking_id) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(&ranking_id, error),
    }
}

pub(crate) async fn results_handler<R, C>(
    State(service): State<Arc<DistributionService<R, C>>>,
    Path(ranking_id): Path<String>,
) -> Response
where
    R: RankingRepository + 'static,
    C: ScholarshipCatalog + 'static,
{
    let ranking_id = RankingId(ranking_id);
    match service.results(&ranking_id) {
        Ok(items) => {
            let payload = json!({
                "ranking_id": ranking_id,
                "items": items,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(&ranking_id, error),
    }
}

pub(crate) async fn roster_handler<R, C>(
    State(service): State<Arc<DistributionService<R, C>>>,
    Path(ranking_id): Path<String>,
) -> Response
where
    R: RankingRepository + 'static,
    C: ScholarshipCatalog + 'static,
{
    let ranking_id = RankingId(ranking_id);
    match service.export_roster(&ranking_id) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(error) => error_response(&ranking_id, error),
    }
}

fn error_response(ranking_id: &RankingId, error: DistributionServiceError) -> Response {
    let (status, hint) = match &error {
        DistributionServiceError::RankingNotFound(_) => (StatusCode::NOT_FOUND, None),
        DistributionServiceError::Configuration(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("configure matrix quotas for this scholarship type before running distribution"),
        ),
        DistributionServiceError::AlreadyRunning(_) => (StatusCode::CONFLICT, None),
        DistributionServiceError::NotDistributed(_) => (
            StatusCode::CONFLICT,
            Some("run the distribution before exporting a roster"),
        ),
        DistributionServiceError::Repository(_) | DistributionServiceError::Roster(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    };

    if status.is_server_error() {
        warn!(%ranking_id, error = %error, "distribution request failed");
    }

    let mut payload = json!({
        "ranking_id": ranking_id,
        "error": error.to_string(),
    });
    if let Some(hint) = hint {
        payload["hint"] = json!(hint);
    }
    (status, axum::Json(payload)).into_response()
}
