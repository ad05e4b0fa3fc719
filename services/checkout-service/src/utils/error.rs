// /mp-checkout/services/checkout-service/src/utils/error.rs
// Centralized error handling untuk checkout service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use crate::models::ErrorResponse;

/// Type alias untuk Result dengan AppError
pub type AppResult<T> = Result<T, AppError>;

/// Application error enum dengan semua possible errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    /// Convert AppError ke HTTP response
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match &self {
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone()),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg.clone()),
            AppError::ValidationError(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone()),
            // Admission rejections stay generic, the reason is only logged
            AppError::Forbidden(_) => ("FORBIDDEN", "Forbidden".to_string()),
            AppError::ExternalService(msg) => {
                tracing::error!("External service error: {}", msg);
                ("EXTERNAL_SERVICE_ERROR", "External service unavailable".to_string())
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ("CONFIGURATION_ERROR", "Service configuration error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error_code: Some(error_code.to_string()),
            details: None,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ExternalService(format!("Upstream timeout: {}", err))
        } else {
            AppError::ExternalService(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
