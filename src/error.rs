use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("partner {0} is inactive and cannot be assigned")]
    PartnerUnavailable(String),

    #[error("status '{0}' requires an assigned delivery partner")]
    PartnerRequired(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("order {0} already has an assigned partner")]
    AlreadyAssigned(String),

    #[error("partner {0} is at capacity")]
    PartnerAtCapacity(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("metrics aggregation failed: {0}")]
    AggregationFailed(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "ERR_INVALID_INPUT",
            AppError::NotFound(_) => "ERR_NOT_FOUND",
            AppError::PartnerUnavailable(_) => "ERR_PARTNER_UNAVAILABLE",
            AppError::PartnerRequired(_) => "ERR_PARTNER_REQUIRED",
            AppError::InvalidStatus(_) => "ERR_INVALID_STATUS",
            AppError::InvalidTransition(_) => "ERR_INVALID_TRANSITION",
            AppError::AlreadyAssigned(_) => "ERR_ALREADY_ASSIGNED",
            AppError::PartnerAtCapacity(_) => "ERR_PARTNER_AT_CAPACITY",
            AppError::Conflict(_) => "ERR_CONFLICT",
            AppError::AggregationFailed(_) => "ERR_AGGREGATION_FAILED",
            AppError::Unavailable(_) => "ERR_UNAVAILABLE",
            AppError::Internal(_) => "ERR_INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::PartnerUnavailable(_)
            | AppError::PartnerRequired(_)
            | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_)
            | AppError::AlreadyAssigned(_)
            | AppError::PartnerAtCapacity(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AggregationFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::AggregationFailed(_) | AppError::Unavailable(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %message, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %message, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "message": message,
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Unavailable(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
