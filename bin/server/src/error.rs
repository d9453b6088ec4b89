//! HTTP error responses.
//!
//! Every failure leaves a handler as an [`ApiError`], which renders the
//! gateway's public message and curated details as `{error, details?}`.
//! The full report, including internal causes, only goes to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medigate_gateway::GatewayError;
use rootcause::Report;
use serde::Serialize;
use serde_json::Value;

/// Failure body sent to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A gateway failure on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub Report<GatewayError>);

impl ApiError {
    /// Returns the underlying gateway error.
    #[must_use]
    pub fn kind(&self) -> &GatewayError {
        self.0.current_context()
    }
}

impl From<Report<GatewayError>> for ApiError {
    fn from(report: Report<GatewayError>) -> Self {
        Self(report)
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(Report::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status =
            StatusCode::from_u16(kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if kind.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %kind, status = status.as_u16(), "request rejected");
        }

        let body = ErrorBody {
            error: kind.public_message(),
            details: kind.public_details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use medigate_core::IdentityId;
    use medigate_gateway::Operation;
    use serde_json::json;

    async fn render(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn upstream_failure_hides_internal_cause() {
        let report = Report::<GatewayError>::from(GatewayError::Internal {
            details: "relation \"customers\" does not exist".to_string(),
        })
        .context(GatewayError::Upstream {
            operation: Operation::LoadAccount,
            identity: Some(IdentityId::new("u-1")),
            timed_out: false,
        });

        let (status, body) = render(ApiError::from(report)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": "Failed to retrieve customer profile",
                "details": { "userId": "u-1" },
            })
        );
    }

    #[tokio::test]
    async fn method_not_allowed_has_no_details() {
        let (status, body) = render(GatewayError::MethodNotAllowed.into()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn configuration_error_does_not_name_keys() {
        let error = GatewayError::Configuration {
            missing: vec!["IDENTITY__SERVICE_KEY".to_string()],
        };
        let (status, body) = render(error.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server configuration error" }));
    }
}
