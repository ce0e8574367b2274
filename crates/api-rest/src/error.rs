//! Mapping from core errors to HTTP responses.

use api_shared::{ErrorDetail, ErrorRes};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dxr_core::{ErrorKind, RecordError};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Record(RecordError),
    /// The request body was not valid JSON for the endpoint.
    BadBody(String),
    /// A blocking task panicked or was cancelled.
    Internal(String),
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        Self::Record(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Reference => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body(code: &str, message: String, fields: Vec<String>) -> Json<ErrorRes> {
    Json(ErrorRes {
        error: ErrorDetail {
            code: code.to_string(),
            message,
            fields,
        },
    })
}

const INTERNAL_MESSAGE: &str = "the record store is unavailable";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Record(err) => {
                let kind = err.kind();
                let status = status_for(kind);
                if kind == ErrorKind::StorageUnavailable {
                    tracing::error!(error = %err, "record store failure");
                    return (status, body(kind.as_str(), INTERNAL_MESSAGE.into(), Vec::new()))
                        .into_response();
                }

                let message = match &err {
                    RecordError::CaseNotFound { .. } => format!(
                        "{err}; submitting a diagnosis with this case id will open a new case"
                    ),
                    _ => err.to_string(),
                };
                let fields = err.fields().iter().map(|f| f.as_str().to_string()).collect();
                (status, body(kind.as_str(), message, fields)).into_response()
            }
            Self::BadBody(message) => (
                StatusCode::BAD_REQUEST,
                body(ErrorKind::Validation.as_str(), message, Vec::new()),
            )
                .into_response(),
            Self::Internal(message) => {
                tracing::error!(error = %message, "request task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    body(
                        ErrorKind::StorageUnavailable.as_str(),
                        INTERNAL_MESSAGE.into(),
                        Vec::new(),
                    ),
                )
                    .into_response()
            }
        }
    }
}
