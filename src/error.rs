use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::pickup::{PickupId, PickupStatus};

/// Failures surfaced by a data-access collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("pickup {0} does not exist")]
    NotFound(PickupId),

    #[error("pickup {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: PickupId,
        expected: PickupStatus,
        actual: PickupStatus,
        target: PickupStatus,
    },

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("invalid search query: {0}")]
    InvalidSearchQuery(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("invalid time frame: {0}")]
    InvalidTimeFrame(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: PickupStatus, to: PickupStatus },

    #[error("a reason is required to cancel a pickup")]
    MissingReason,

    #[error("a courier is required to accept a pickup")]
    MissingCourier,

    #[error("{0}")]
    NotFound(String),

    #[error("repository error: {0}")]
    Repository(RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::InvalidDateRange(_) => "invalid_date_range",
            AppError::InvalidSearchQuery(_) => "invalid_search_query",
            AppError::InvalidSort(_) => "invalid_sort",
            AppError::InvalidPagination(_) => "invalid_pagination",
            AppError::InvalidTimeFrame(_) => "invalid_time_frame",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::MissingReason => "missing_reason",
            AppError::MissingCourier => "missing_courier",
            AppError::NotFound(_) => "not_found",
            AppError::Repository(_) => "repository_error",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Repository(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => AppError::NotFound(format!("pickup {id} not found")),
            RepositoryError::StatusConflict { actual, target, .. } => {
                AppError::InvalidTransition {
                    from: actual,
                    to: target,
                }
            }
            other => AppError::Repository(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidFilter(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Repository(err) = &self {
            tracing::error!(error = %err, "repository call failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
