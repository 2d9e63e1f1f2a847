use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::distribution::{DistributionServiceError, RankingImportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Serialization(serde_json::Error),
    Distribution(DistributionServiceError),
    Import(RankingImportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Serialization(err) => write!(f, "serialization error: {}", err),
            AppError::Distribution(err) => write!(f, "distribution error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Serialization(err) => Some(err),
            AppError::Distribution(err) => Some(err),
            AppError::Import(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Import(_) | AppError::Serialization(_) => StatusCode::BAD_REQUEST,
            AppError::Distribution(DistributionServiceError::RankingNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Distribution(DistributionServiceError::Configuration(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Distribution(
                DistributionServiceError::AlreadyRunning(_)
                | DistributionServiceError::NotDistributed(_),
            ) => StatusCode::CONFLICT,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Distribution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<DistributionServiceError> for AppError {
    fn from(value: DistributionServiceError) -> Self {
        Self::Distribution(value)
    }
}

impl From<RankingImportError> for AppError {
    fn from(value: RankingImportError) -> Self {
        Self::Import(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::distribution::{ConfigurationError, RankingId};

    #[test]
    fn configuration_failures_map_to_unprocessable() {
        let error = AppError::from(DistributionServiceError::Configuration(
            ConfigurationError::NoActiveConfiguration {
                scholarship_type: "phd".to_string(),
                academic_year: 113,
                semester: None,
            },
        ));
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn unknown_ranking_maps_to_not_found() {
        let error = AppError::from(DistributionServiceError::RankingNotFound(RankingId::new(
            "rk-missing",
        )));
        assert!(error.to_string().contains("rk-missing"));
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn roster_before_distribution_maps_to_conflict() {
        let error = AppError::from(DistributionServiceError::NotDistributed(RankingId::new(
            "rk-113",
        )));
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }
}
