//! Mapping from the engine error taxonomy onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use costwatch_core::EngineError;

/// Response wrapper turning an [`EngineError`] into a status + JSON body.
///
/// A missing project is the caller's fault (404), malformed range input is a
/// bad request (400), and every upstream fault surfaces as a bad gateway
/// (502): the process itself never fails because an upstream did.
#[derive(Debug)]
pub struct ApiFailure(pub EngineError);

impl ApiFailure {
    fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            EngineError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Authentication(_)
            | EngineError::BillingQuery(_)
            | EngineError::Api { .. }
            | EngineError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<EngineError> for ApiFailure {
    fn from(error: EngineError) -> Self {
        Self(error)
    }
}

// ============================================================================
// Tests
// ============================================================================
