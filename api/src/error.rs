//! API error type and its HTTP mapping.

use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested todo does not exist.
    #[error("Todo not found")]
    NotFound,

    /// The request body failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Description of a server-side failure, attached to the response so that
/// the tracing middleware can put it on the request span.
#[derive(Debug, Clone)]
pub struct ErrorDescription(pub String);

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            response
                .extensions_mut()
                .insert(ErrorDescription(self.to_string()));
        }
        response
    }
}
