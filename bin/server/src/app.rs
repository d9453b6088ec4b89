//! Router assembly.

use crate::config::CorsConfig;
use crate::routes;
use crate::state::AppState;
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{MethodRouter, get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request headers browsers may send to the auth routes.
const ALLOWED_HEADERS: [&str; 6] = [
    "authorization",
    "x-client-info",
    "apikey",
    "content-type",
    "x-code-verifier",
    "x-user-role",
];

/// Builds the application router.
pub fn router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/login", auth_route(post(routes::login)))
        .route("/register", auth_route(post(routes::register)))
        .route(
            "/google-oauth-callback",
            auth_route(post(routes::oauth_callback)),
        )
        .route("/health", get(routes::health))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// `OPTIONS` never reaches the method router: the CORS layer answers it.
fn auth_route(handler: MethodRouter<AppState>) -> MethodRouter<AppState> {
    handler.fallback(routes::method_not_allowed)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list([Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::list(
            ALLOWED_HEADERS.map(HeaderName::from_static),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use medigate_accounts::{AccountProfile, RefreshCredential, RequestOrigin};
    use medigate_core::IdentityId;
    use medigate_gateway::testing::TestGateway;
    use medigate_identity::Identity;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(t: &TestGateway) -> Router {
        router(AppState::ready(t.gateway.clone()), &CorsConfig::default())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    fn seed_customer(t: &TestGateway, id: &str, phone: &str, password: &str) -> IdentityId {
        let id = IdentityId::new(id);
        let identity = Identity::new(id.clone()).with_phone(Some(phone.to_string()));
        t.identity.add_password(phone, password, identity);
        t.repository.seed_account(AccountProfile::new_phone_registration(
            id.clone(),
            phone.to_string(),
            None,
            None,
            Utc::now(),
        ));
        id
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let t = TestGateway::new();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(&t), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let t = TestGateway::new();
        let request = Request::get("/login").body(Body::empty()).unwrap();
        let (status, body) = send(app(&t), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn preflight_lists_methods_and_headers() {
        let t = TestGateway::new();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/register")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app(&t).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST,OPTIONS");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            ALLOWED_HEADERS.join(",").as_str()
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
        assert!(t.repository.calls().is_empty());
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin_by_default() {
        let t = TestGateway::new();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/login")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(&t).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(t.identity.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let t = TestGateway::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .body(Body::from("{\"phone\":"))
            .unwrap();
        let (status, body) = send(app(&t), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid JSON body" }));
        assert!(t.identity.calls().is_empty());
    }

    #[tokio::test]
    async fn password_login_returns_session() {
        let t = TestGateway::new();
        let id = seed_customer(&t, "u-1", "+15550100", "correct");

        let (status, body) = send(
            app(&t),
            post_json("/login", json!({ "phone": "+15550100", "password": "correct" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Login successful"));
        assert_eq!(body["data"]["customer_id"], json!("u-1"));
        assert_eq!(body["data"]["token_type"], json!("Bearer"));
        let token = body["data"]["refresh_token"].as_str().unwrap();
        let stored = t.repository.refresh_credentials_for(&id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].token, token);
    }

    #[tokio::test]
    async fn password_login_records_forwarded_origin() {
        let t = TestGateway::new();
        let id = seed_customer(&t, "u-2", "+15550101", "correct");

        let mut request =
            post_json("/login", json!({ "phone": "+15550101", "password": "correct" }));
        let headers = request.headers_mut();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("medigate-app/2.1"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        let (status, _) = send(app(&t), request).await;

        assert_eq!(status, StatusCode::OK);
        let stored = t.repository.refresh_credentials_for(&id);
        assert_eq!(
            stored[0].origin,
            RequestOrigin {
                user_agent: Some("medigate-app/2.1".to_string()),
                ip_address: Some("203.0.113.9".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let t = TestGateway::new();
        seed_customer(&t, "u-3", "+15550102", "correct");

        let (status, body) = send(
            app(&t),
            post_json("/login", json!({ "phone": "+15550102", "password": "wrong" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("Login failed"));
    }

    #[tokio::test]
    async fn inactive_account_is_forbidden_and_keeps_credentials() {
        let t = TestGateway::new();
        let id = seed_customer(&t, "u-4", "+15550103", "correct");
        let mut profile = t.repository.account(&id).unwrap();
        profile.status = "suspended".into();
        t.repository.seed_account(profile);
        let prior = RefreshCredential::issue(
            id.clone(),
            chrono::Duration::days(7),
            RequestOrigin::default(),
            Utc::now(),
        )
        .unwrap();
        t.repository.seed_refresh_credential(prior.clone());

        let (status, body) = send(
            app(&t),
            post_json("/login", json!({ "phone": "+15550103", "password": "correct" })),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["details"], json!({ "status": "suspended" }));
        assert_eq!(t.repository.refresh_credentials_for(&id), vec![prior]);
    }

    #[tokio::test]
    async fn malformed_access_token_gets_format_hint() {
        let t = TestGateway::new();

        let (status, body) = send(
            app(&t),
            post_json("/login", json!({ "access_token": "not-a-jwt" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["details"],
            json!({ "hint": "Access token should start with 'eyJ'" })
        );
        assert!(t.identity.calls().is_empty());
        assert!(t.repository.calls().is_empty());
    }

    #[tokio::test]
    async fn registration_returns_created() {
        let t = TestGateway::new();

        let (status, body) = send(
            app(&t),
            post_json(
                "/register",
                json!({ "phone": "+15550200", "password": "s3cret", "full_name": "Ada" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body["message"],
            json!("User created successfully. Phone number pre-verified.")
        );
        let id = IdentityId::new(body["data"]["customer_id"].as_str().unwrap());
        assert!(t.repository.account(&id).unwrap().is_active());
        assert_eq!(t.repository.refresh_credentials_for(&id).len(), 1);
    }

    #[tokio::test]
    async fn callback_without_verifier_reports_what_was_missing() {
        let t = TestGateway::new();

        let (status, body) = send(
            app(&t),
            post_json("/google-oauth-callback", json!({ "code": "abc" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "Missing code or codeVerifier",
                "details": { "codeProvided": true, "codeVerifierProvided": false },
            })
        );
        assert!(t.identity.calls().is_empty());
    }

    #[tokio::test]
    async fn callback_provisions_doctor() {
        let t = TestGateway::new();
        let identity = Identity::new(IdentityId::new("d-1"))
            .with_email(Some("house@example.com".to_string()))
            .with_display_name(Some("Gregory House".to_string()));
        t.identity.add_code("code-1", "verifier-1", identity);

        let (status, body) = send(
            app(&t),
            post_json(
                "/google-oauth-callback",
                json!({ "code": "code-1", "codeVerifier": "verifier-1", "role": "doctor" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["staff"]["role"], json!("doctor"));
        assert!(body["data"]["doctor"]["license_no"].is_string());
        assert_eq!(t.repository.doctor_count(), 1);
    }

    #[tokio::test]
    async fn misconfigured_server_fails_before_reading_body() {
        let state = AppState::misconfigured(MissingConfig {
            keys: vec!["IDENTITY__SERVICE_KEY"],
        });
        let app = router(state, &CorsConfig::default());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server configuration error" }));

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/login")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(preflight).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
