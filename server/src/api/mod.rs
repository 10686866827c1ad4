//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, extract::State, routing::get, Json, Router};
use dashmap::DashSet;
use ff_keygen::KeygenClient;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{config::Config, email::EmailService, webhooks};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Keygen client authorized to issue and suspend licenses
    pub keygen: KeygenClient,
    /// Email service (optional, keys are only logged without it)
    pub email: Option<EmailService>,
    /// Orders currently being fulfilled
    pub in_flight: Arc<DashSet<String>>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, keygen: KeygenClient, email: Option<EmailService>) -> Self {
        Self {
            config: Arc::new(config),
            keygen,
            email,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Build state from configuration, wiring the Keygen client and, when
    /// SMTP is configured, the email service.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let keygen = KeygenClient::new(&config.keygen_api_url, &config.keygen_account_id)?
            .with_token(&config.keygen_api_key);

        let email = if config.has_smtp() {
            Some(EmailService::new(&config)?)
        } else {
            None
        };

        Ok(Self::new(config, keygen, email))
    }

    /// Check if license emails are delivered.
    #[must_use]
    pub const fn has_email(&self) -> bool {
        self.email.is_some()
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Storefront webhooks
        .nest("/webhook", webhooks::router())
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether license emails are delivered
    email: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        email: state.has_email(),
    })
}
