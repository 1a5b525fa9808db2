//! API error types and conversions

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bapi_core::{InvalidField, Message, RfcError};
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed or incomplete input
    BadRequest(String),
    /// 400 Bad Request - the backend rejected the call with Error/Abort
    /// messages; the transaction was rolled back
    Business {
        summary: String,
        messages: Vec<Message>,
    },
    /// 500 Internal Server Error - the backend call itself failed
    Backend {
        kind: &'static str,
        message: String,
        messages: Vec<Message>,
    },
    /// 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    /// A business failure built from the messages of a rolled-back call
    pub fn business(messages: Vec<Message>) -> Self {
        ApiError::Business {
            summary: bapi_core::summarize(&messages),
            messages,
        }
    }
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<Message>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, messages) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, Vec::new()),
            ApiError::Business { summary, messages } => {
                (StatusCode::BAD_REQUEST, "business_error", summary, messages)
            }
            ApiError::Backend {
                kind,
                message,
                messages,
            } => (StatusCode::INTERNAL_SERVER_ERROR, kind, message, messages),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg,
                Vec::new(),
            ),
        };

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            messages,
        });

        (status, body).into_response()
    }
}

impl From<RfcError> for ApiError {
    fn from(err: RfcError) -> Self {
        let kind = match &err {
            RfcError::Connection(_) => "connection_error",
            RfcError::InterfaceMismatch(_) => "interface_mismatch",
            RfcError::RemoteRuntime(_) => "remote_runtime_error",
            RfcError::TransactionInfrastructure { .. } => "transaction_failed",
        };
        let messages = err.messages().to_vec();
        ApiError::Backend {
            kind,
            message: err.to_string(),
            messages,
        }
    }
}

impl From<InvalidField> for ApiError {
    fn from(err: InvalidField) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
