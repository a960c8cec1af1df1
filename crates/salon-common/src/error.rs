//! Centralized error types for the booking backend.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used across all salon services.
#[derive(Debug, thiserror::Error)]
pub enum SalonError {
    // === Auth errors ===
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    /// The request is well-formed but clashes with current state
    /// (full slot, exhausted voucher, illegal status transition).
    #[error("{message}")]
    Conflict { message: String },

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Upstream errors ===
    #[error("Payment provider error: {message}")]
    Payment { message: String },

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    status: bool,
    message: String,
    error: String,
}

impl SalonError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Payment { .. } => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Conflict { .. } => "CONFLICT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Payment { .. } => "PAYMENT_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for SalonError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to clients
        let message = match &self {
            SalonError::Database(sqlx::Error::RowNotFound) => "Record not found".to_string(),
            SalonError::Database(e) => {
                tracing::error!("Database error: {e}");
                "An internal error occurred".to_string()
            }
            SalonError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "An internal error occurred".to_string()
            }
            SalonError::Payment { message } => {
                tracing::warn!("Payment provider error: {message}");
                "Payment provider is unavailable".to_string()
            }
            other => other.to_string(),
        };

        let status = match &self {
            SalonError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            _ => status,
        };

        let body = ErrorResponse {
            status: false,
            message,
            error: self.error_code().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using SalonError.
pub type SalonResult<T> = Result<T, SalonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(SalonError::not_found("Branch").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(SalonError::conflict("full").status_code(), StatusCode::CONFLICT);
        assert_eq!(SalonError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(SalonError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(SalonError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_row_becomes_not_found_response() {
        let resp = SalonError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_are_masked() {
        let resp = SalonError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
