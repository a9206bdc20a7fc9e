use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::composer::ComposerError;
use crate::application::error::ErrorReport;
use crate::application::store::StoreError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_error";
    pub const UPLOAD: &str = "upload_error";
    pub const STORE_WRITE: &str = "store_write_error";
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

/// User-visible failure: one machine-readable code plus one message string.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let (status, code) = match &err {
            StoreError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, codes::VALIDATION),
            StoreError::Upload { .. } => (StatusCode::INTERNAL_SERVER_ERROR, codes::UPLOAD),
            StoreError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, codes::STORE_WRITE),
            StoreError::Unavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, codes::STORE_UNAVAILABLE)
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<ComposerError> for ApiError {
    fn from(err: ComposerError) -> Self {
        match err {
            ComposerError::MissingField(_) | ComposerError::InvalidDate(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                codes::VALIDATION,
                err.to_string(),
            ),
            ComposerError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.clone(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http",
            self.status,
            format!("{}: {}", self.code, self.message),
        )
        .attach(&mut response);
        response
    }
}
