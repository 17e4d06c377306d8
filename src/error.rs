//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::pricing::responses::ErrorResponse;
use crate::pricing::{PricingError, ValidationError};

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<ValidationError>),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Price calculator is disabled")]
    Disabled,

    #[error("Calculation error: {0}")]
    Calculation(String),
}

impl From<PricingError> for AppError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::Validation(errors) => AppError::Validation(errors),
            PricingError::Configuration { message } => AppError::Calculation(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, errors) = match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "The request contains invalid data".to_string(),
                errors,
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg, Vec::new()),
            AppError::Disabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CALCULATOR_DISABLED",
                "The price calculator is currently not available".to_string(),
                Vec::new(),
            ),
            AppError::Calculation(msg) => {
                tracing::error!("Calculation error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CALCULATION_ERROR",
                    "The price could not be calculated".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            error_code,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
