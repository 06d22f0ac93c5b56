//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;
use checkout::CheckoutMessage;
use orchestrator::OrchestratorError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Checkout messages keep their stable keys in the body; raw gateway and
/// storage detail never leaves the server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// A local checkout guard refused the request.
    #[error("{0}")]
    Validation(CheckoutMessage),

    /// The order system reported a stock conflict.
    #[error("{0}")]
    Conflict(CheckoutMessage),

    /// Cart storage failure.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": message }),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message }),
            ),
            ApiError::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message_body(&message))
            }
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message_body(&message)),
            ApiError::Cart(error) => {
                tracing::error!(%error, "cart storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "cart storage unavailable" }),
                )
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": message }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn message_body(message: &CheckoutMessage) -> serde_json::Value {
    serde_json::json!({
        "error": message.to_string(),
        "key": message.key(),
    })
}

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::Cart(cart) => ApiError::Cart(cart),
        }
    }
}
