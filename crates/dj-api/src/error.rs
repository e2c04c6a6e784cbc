//! HTTP mapping for core errors.

use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use dj_core::error::AppError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Not a failure: guards use it to short-circuit into a 303.
    #[error("redirect to {0}")]
    Redirect(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    pub fn redirect(location: impl Into<String>) -> Self {
        ApiError::Redirect(location.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::App(AppError::Internal(err.into()))
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        ApiError::internal(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Redirect(_) => StatusCode::SEE_OTHER,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::NotFound(..) => StatusCode::NOT_FOUND,
                AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AppError::Conflict(_) => StatusCode::CONFLICT,
                AppError::Configuration(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ApiError::Redirect(location) => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, location.as_str()))
                .finish(),
            ApiError::App(AppError::Validation(errors)) => {
                HttpResponse::build(status).json(json!({ "errors": errors }))
            }
            ApiError::App(AppError::Conflict(message)) | ApiError::App(AppError::Unauthorized(message)) => {
                HttpResponse::build(status).json(json!({ "error": message }))
            }
            ApiError::App(err @ (AppError::Configuration(_) | AppError::Internal(_))) => {
                error!(error = %err, "request failed");
                HttpResponse::build(status)
                    .content_type(ContentType::plaintext())
                    .body("Internal Server Error")
            }
            other => HttpResponse::build(status)
                .content_type(ContentType::plaintext())
                .body(other.to_string()),
        }
    }
}
