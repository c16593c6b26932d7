//! Unified error handling
//!
//! [`AppError`] is the HTTP-facing error type; every lifecycle-manager
//! failure maps onto it without collapsing the taxonomy: the wire code
//! stays distinct so callers can react per category.
//!
//! # Response shape
//!
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "...", "data": { ... } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::error::ErrorCode;
use tracing::error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    /// Structured detail, e.g. the offending products on stock failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Application error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication (4xx) ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    // ========== Business (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Business failure with a precise wire code and optional detail
    #[error("{message}")]
    Business {
        code: ErrorCode,
        message: String,
        data: Option<serde_json::Value>,
    },

    // ========== System (5xx) ==========
    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ClientDisconnected)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn business(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Business {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn business_with_data(
        code: ErrorCode,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self::Business {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    fn status_for(code: ErrorCode) -> StatusCode {
        match code {
            ErrorCode::InsufficientStock
            | ErrorCode::AmountTooSmall
            | ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::DuplicatePayment => StatusCode::CONFLICT,
            ErrorCode::IllegalTransition => StatusCode::CONFLICT,
            ErrorCode::NotPermitted => StatusCode::FORBIDDEN,
            ErrorCode::OrderNotFound | ErrorCode::ProductNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ReconciliationRequired
            | ErrorCode::PersistenceFailure
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, data) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "Please login first".to_string(),
                None,
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "Invalid token".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotPermitted, msg, None)
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::OrderNotFound, msg, None)
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::ValidationFailed,
                msg,
                None,
            ),
            AppError::Business {
                code,
                message,
                data,
            } => {
                if code == ErrorCode::ReconciliationRequired {
                    // Money moved without an order; this must never pass quietly
                    error!(error_code = %code, message = %message, "Reconciliation required");
                }
                (Self::status_for(code), code, message, data)
            }
            AppError::ClientDisconnected => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Client disconnected".to_string(),
                None,
            ),
            AppError::Storage(msg) => {
                error!(target: "storage", error = %msg, "Storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::PersistenceFailure,
                    "Storage error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            code,
            message,
            data,
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
