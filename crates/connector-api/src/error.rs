//! HTTP error response conversion.
//!
//! Every trigger endpoint returns the coarse `{status: "success"|"error"}`
//! contract; the detailed `ConnectorError` message lives in the registry
//! entry and in the logs, not in the HTTP body (see the teacher's
//! `HttpAppError` for the pattern this narrows down to a single shape).

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use connector_core::{ConnectorError, LogLevel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
}

impl TriggerResponse {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

pub struct HttpConnectorError(pub ConnectorError);

impl From<ConnectorError> for HttpConnectorError {
    fn from(err: ConnectorError) -> Self {
        Self(err)
    }
}

fn log(err: &ConnectorError) {
    match err.log_level() {
        LogLevel::Warn => tracing::warn!(error = %err, "trigger failed"),
        LogLevel::Error => tracing::error!(error = %err, "trigger failed"),
    }
}

fn status_code_for(err: &ConnectorError) -> StatusCode {
    match err {
        ConnectorError::NotFound(_) | ConnectorError::AssetNotFound(_) => StatusCode::NOT_FOUND,
        ConnectorError::PreconditionFailed { .. } => StatusCode::CONFLICT,
        ConnectorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpConnectorError {
    fn into_response(self) -> Response {
        log(&self.0);
        let status = status_code_for(&self.0);
        (status, Json(TriggerResponse { status: "error" })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = HttpConnectorError(ConnectorError::NotFound("r1".into()));
        assert_eq!(status_code_for(&err.0), StatusCode::NOT_FOUND);
    }

    #[test]
    fn precondition_failed_maps_to_409() {
        let err = ConnectorError::precondition("r1", "upload", "already uploaded");
        assert_eq!(status_code_for(&err), StatusCode::CONFLICT);
    }
}
