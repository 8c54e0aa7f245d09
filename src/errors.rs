use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use tracing::error;
use utoipa::ToSchema;

use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Unauthorized(String),
    NotFound(String),
    /// The second write of a linked pair failed and the compensating
    /// delete/revert succeeded. The ledger is consistent again; the
    /// operation as a whole did not happen.
    PartialWrite {
        stage: &'static str,
        message: String,
    },
    /// A compensation or balance reversal itself failed. Ledger state and
    /// a derived aggregate may now diverge; needs operator attention.
    ConsistencyWarning {
        stage: &'static str,
        message: String,
    },
    InternalError(String),
}

/// Standard error response format
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type code (e.g., "VALIDATION_ERROR", "CONSISTENCY_WARNING")
    #[schema(example = "VALIDATION_ERROR")]
    pub error: String,
    /// Human-readable error message
    #[schema(example = "Invalid input provided")]
    pub message: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::PartialWrite { stage, message } => {
                write!(f, "Partial write at {stage}: {message}")
            }
            AppError::ConsistencyWarning { stage, message } => {
                write!(f, "Consistency warning at {stage}: {message}")
            }
            AppError::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
            ),
            AppError::Unauthorized(msg) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::PartialWrite { stage, message } => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "PARTIAL_WRITE",
                format!("Write failed at {stage}; no changes were kept: {message}"),
            ),
            AppError::ConsistencyWarning { stage, message } => {
                // Operator-visible: ledger and an aggregate may now disagree.
                error!(stage, %message, "consistency warning");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "CONSISTENCY_WARNING",
                    format!("Ledger may be inconsistent after {stage}; manual review needed"),
                )
            }
            AppError::InternalError(msg) => {
                // Log the actual error for debugging, but don't expose to client
                error!("Internal error: {msg}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message,
        })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RowNotFound(what) => AppError::NotFound(what),
            other => AppError::InternalError(other.to_string()),
        }
    }
}
