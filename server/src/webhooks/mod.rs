//! Storefront Webhooks
//!
//! AppSumo and Gumroad purchase notifications: verification, plan mapping,
//! license issuance through Keygen and key delivery by email.

pub mod fulfillment;
pub mod handlers;
pub mod plans;
pub mod signing;
pub mod types;

use axum::routing::post;
use axum::Router;

use crate::api::AppState;

/// Routes mounted under `/webhook`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appsumo", post(handlers::appsumo_webhook))
        .route("/gumroad", post(handlers::gumroad_webhook))
}
