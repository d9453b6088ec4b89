//! Auth route handlers.
//!
//! Each handler checks configuration first, then parses the JSON body, then
//! hands a typed request to the gateway.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use medigate_accounts::RequestOrigin;
use medigate_gateway::response::{OAuthLogin, RegistrationData};
use medigate_gateway::{
    Envelope, GatewayError, LoginData, LoginRequest, OAuthCallbackRequest, RegistrationRequest,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Envelope<LoginData>>, ApiError> {
    let gateway = state.gateway()?;
    let request: LoginRequest = parse_body(&body)?;
    let envelope = gateway.login(request, request_origin(&headers)).await?;
    Ok(Json(envelope))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Envelope<RegistrationData>>), ApiError> {
    let gateway = state.gateway()?;
    let request: RegistrationRequest = parse_body(&body)?;
    let envelope = gateway.register(request, request_origin(&headers)).await?;
    Ok((StatusCode::CREATED, Json(envelope)))
}

/// `POST /google-oauth-callback`
pub async fn oauth_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Envelope<OAuthLogin>>, ApiError> {
    let gateway = state.gateway()?;
    let request: OAuthCallbackRequest = parse_body(&body)?;
    let presentation = request.into_presentation()?;
    let envelope = gateway.oauth_login(presentation).await?;
    Ok(Json(envelope))
}

/// Any method other than `POST` or `OPTIONS` on an auth route.
pub async fn method_not_allowed() -> ApiError {
    GatewayError::MethodNotAllowed.into()
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!(error = %err, "rejected request body");
        ApiError::from(GatewayError::InvalidInput {
            message: "Invalid JSON body",
            details: None,
        })
    })
}

/// Extracts the caller's user agent and address for refresh credentials.
///
/// The address is the first `X-Forwarded-For` hop, falling back to
/// `X-Real-IP`.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let ip_address = header_str("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| header_str("x-real-ip"))
        .map(str::to_string);

    RequestOrigin {
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
        ip_address,
    }
}
