//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router, with Keygen replaced by a `wiremock` server per app.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use dashmap::DashSet;
use ff_server::api::{create_router, AppState};
use ff_server::config::Config;
use ff_server::webhooks::handlers::APPSUMO_SIGNATURE_HEADER;
use ff_server::webhooks::signing::sign_payload;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Account ID used by [`Config::default_for_test`].
pub const ACCOUNT: &str = "test-account";

/// Keygen licenses collection path for the test account.
pub const LICENSES_PATH: &str = "/accounts/test-account/licenses";

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    /// Mock Keygen API the app talks to.
    pub keygen: MockServer,
    /// Orders the app considers in flight.
    pub in_flight: Arc<DashSet<String>>,
}

impl TestApp {
    /// Create a new test app with the default test config.
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    /// Create a test app with a custom config. Keygen is always the mock.
    pub async fn with_config(mut config: Config) -> Self {
        let keygen = MockServer::start().await;
        config.keygen_api_url = keygen.uri();

        let state = AppState::from_config(config.clone()).expect("Failed to build app state");
        let in_flight = Arc::clone(&state.in_flight);
        let router = create_router(state);

        Self {
            router,
            config: Arc::new(config),
            keygen,
            in_flight,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// POST a JSON body to the AppSumo webhook, signed with the configured secret.
    pub async fn post_appsumo(&self, body: &Value) -> Response<Body> {
        let raw = body.to_string();
        let signature = sign_payload(&self.config.appsumo_webhook_secret, raw.as_bytes());
        self.post_appsumo_raw(raw, &signature).await
    }

    /// POST a raw body to the AppSumo webhook with an explicit signature.
    pub async fn post_appsumo_raw(&self, raw: String, signature: &str) -> Response<Body> {
        let request = Self::request(Method::POST, "/webhook/appsumo")
            .header(header::CONTENT_TYPE, "application/json")
            .header(APPSUMO_SIGNATURE_HEADER, signature)
            .body(Body::from(raw))
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// POST form fields to the Gumroad webhook at `uri`.
    pub async fn post_gumroad(&self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Self::request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// Number of requests Keygen received.
    pub async fn keygen_request_count(&self) -> usize {
        self.keygen
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}

// ============================================================================
// Keygen mocks
// ============================================================================

/// A Keygen license resource.
pub fn license_json(id: &str, key: &str, tier: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": "licenses",
        "attributes": {
            "key": key,
            "status": status,
            "expiry": null,
            "metadata": { "tier": tier }
        }
    })
}

/// Keygen has no license for `order_key`.
pub async fn mock_no_license_for_order(server: &MockServer, order_key: &str) {
    Mock::given(method("GET"))
        .and(path(LICENSES_PATH))
        .and(query_param("metadata[orderId]", order_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
}

/// Keygen already holds `license` for `order_key`.
pub async fn mock_license_for_order(server: &MockServer, order_key: &str, license: Value) {
    Mock::given(method("GET"))
        .and(path(LICENSES_PATH))
        .and(query_param("metadata[orderId]", order_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [license] })))
        .mount(server)
        .await;
}

// ============================================================================
// Response helpers
// ============================================================================

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
