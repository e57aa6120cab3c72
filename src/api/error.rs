use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::TrackerError;

impl TrackerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackerError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            TrackerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            TrackerError::UpstreamUnavailable(_)
            | TrackerError::UpstreamFailed(_)
            | TrackerError::InvalidObservation(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TrackerError::MalformedRecord(_) | TrackerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every error renders as `{ error, kind, instructions? }`.
impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("❌ {} ({})", self, status);
        } else {
            log::debug!("↩️  {} ({})", self, status);
        }

        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if !self.instructions().is_empty() {
            body["instructions"] = json!(self.instructions());
        }
        (status, axum::Json(body)).into_response()
    }
}
