use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::reservation::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    SlotUnavailable(String),

    #[error("slot is temporarily held by another booking attempt")]
    SlotLocked,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    /// Stable machine-readable code so clients can tell "refresh and retry"
    /// conflicts apart from "not bookable" rejections.
    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL",
            AppError::Validation(_) => "VALIDATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SlotUnavailable(_) => "SLOT_UNAVAILABLE",
            AppError::SlotLocked => "SLOT_ALREADY_LOCKED",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotUnavailable(_) => StatusCode::CONFLICT,
            AppError::SlotLocked => StatusCode::CONFLICT,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(msg) => AppError::Validation(msg),
            ReservationError::ResourceNotFound(id) => {
                AppError::NotFound(format!("resource {id}"))
            }
            ReservationError::BookingNotFound(id) => AppError::NotFound(format!("booking {id}")),
            ReservationError::SlotUnavailable(msg) => AppError::SlotUnavailable(msg),
            ReservationError::SlotLocked => AppError::SlotLocked,
            err @ ReservationError::InvalidTransition { .. } => {
                AppError::InvalidTransition(err.to_string())
            }
            ReservationError::Storage(e) => AppError::Internal(e),
        }
    }
}
