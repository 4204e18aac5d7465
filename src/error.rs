use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum BookingError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// Error string reported by an SMS vendor.
    #[error("{provider} error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("No SMS provider is configured")]
    SmsNotConfigured,

    #[error("Admin password is not configured")]
    AdminNotConfigured,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Access denied from this IP address")]
    ForbiddenIp,

    #[error("Too many failed attempts. Try again in {0} minutes.")]
    LockedOut(i64),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl IntoResponse for BookingError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BookingError::InvalidInput(_) | BookingError::InvalidPhone(_) => {
                StatusCode::BAD_REQUEST
            }
            BookingError::Unauthorized
            | BookingError::InvalidPassword
            | BookingError::SessionExpired => StatusCode::UNAUTHORIZED,
            BookingError::ForbiddenIp => StatusCode::FORBIDDEN,
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::LockedOut(_) | BookingError::RateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            BookingError::Provider { .. } | BookingError::Reqwest(_) => StatusCode::BAD_GATEWAY,
            BookingError::SmsNotConfigured | BookingError::AdminNotConfigured => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BookingError::DatabaseError(_)
            | BookingError::JsonError(_)
            | BookingError::Io(_)
            | BookingError::Config(_)
            | BookingError::RactorError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed with internal error");
            "An internal server error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiErrorResponse { error: message })).into_response()
    }
}

/// Error body shape shared by every JSON endpoint.
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}
