//! Storefront Webhook Handlers
//!
//! `POST /webhook/appsumo` and `POST /webhook/gumroad`.

use std::collections::HashMap;

use axum::extract::rejection::{BytesRejection, FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::fulfillment::{self, Purchase};
use super::plans::{self, Storefront, APPSUMO_DEFAULT_PLAN};
use super::signing;
use super::types::{AppSumoEvent, GumroadPing, WebhookError, WebhookResponse};
use crate::api::AppState;
use crate::config::Config;

/// Header carrying the hex HMAC-SHA256 of the AppSumo request body.
pub const APPSUMO_SIGNATURE_HEADER: &str = "x-appsumo-signature";

/// POST /webhook/appsumo
#[instrument(skip_all)]
pub async fn appsumo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let body = body?;
    let signature = headers
        .get(APPSUMO_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !signing::verify_signature(&state.config.appsumo_webhook_secret, &body, signature) {
        warn!("Invalid AppSumo signature");
        return Err(WebhookError::InvalidSignature);
    }

    let event: AppSumoEvent = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::BadRequest(format!("Invalid JSON payload: {e}")))?;

    match event.event.as_deref() {
        Some("purchase") => {
            let email = required(event.customer.email.as_deref(), "Missing customer email")?;
            let name = event
                .customer
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(Storefront::AppSumo.default_customer_name());
            let plan_id = event.plan_id.as_deref().unwrap_or(APPSUMO_DEFAULT_PLAN);
            let tier = plans::appsumo_tier(plan_id);

            info!(plan_id, %tier, order_id = ?event.order_id(), "Processing AppSumo purchase");

            let fulfilled = fulfillment::fulfill(
                &state,
                Purchase {
                    storefront: Storefront::AppSumo,
                    order_id: event.order_id().map(str::to_string),
                    email: email.to_string(),
                    name: name.to_string(),
                    tier,
                },
            )
            .await?;

            Ok(Json(WebhookResponse::license_created(fulfilled.license_key)))
        }
        Some("refund") => {
            info!(order_id = ?event.order_id(), "AppSumo refund received");
            fulfillment::revoke(&state, Storefront::AppSumo, event.order_id()).await?;
            Ok(Json(WebhookResponse::refund_processed()))
        }
        other => {
            info!(event = ?other, "Unhandled AppSumo event");
            Ok(Json(WebhookResponse::event_received()))
        }
    }
}

/// Query string of the Gumroad ping URL.
#[derive(Debug, Default, Deserialize)]
pub struct GumroadQuery {
    #[serde(default)]
    pub secret: Option<String>,
}

/// POST /webhook/gumroad
#[instrument(skip_all)]
pub async fn gumroad_webhook(
    State(state): State<AppState>,
    query: Result<Query<GumroadQuery>, QueryRejection>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let Query(query) = query?;
    let Form(fields) = form?;
    let ping = GumroadPing::new(fields);

    if !verify_gumroad(&state.config, &ping, query.secret.as_deref()) {
        warn!("Invalid Gumroad webhook");
        return Err(WebhookError::InvalidWebhook);
    }

    if ping.is_refund() {
        info!(order_id = ?ping.order_id(), "Gumroad refund received");
        fulfillment::revoke(&state, Storefront::Gumroad, ping.order_id()).await?;
        return Ok(Json(WebhookResponse::refund_processed()));
    }

    if ping.resource_name() != Some("sale") {
        info!(resource_name = ?ping.resource_name(), "Unhandled Gumroad event");
        return Ok(Json(WebhookResponse::event_received()));
    }

    let email = required(ping.get("email"), "Missing customer email")?;
    let name = ping
        .get("full_name")
        .unwrap_or(Storefront::Gumroad.default_customer_name());
    let product_name = ping.get("product_name").unwrap_or_default();
    let tier = plans::gumroad_tier(product_name);

    info!(
        product_id = ?ping.get("product_id"),
        product_name,
        %tier,
        order_id = ?ping.order_id(),
        "Processing Gumroad sale"
    );

    let fulfilled = fulfillment::fulfill(
        &state,
        Purchase {
            storefront: Storefront::Gumroad,
            order_id: ping.order_id().map(str::to_string),
            email: email.to_string(),
            name: name.to_string(),
            tier,
        },
    )
    .await?;

    Ok(Json(WebhookResponse::license_created(fulfilled.license_key)))
}

/// Gumroad pings are unsigned: require the fields every ping carries, plus
/// the configured seller ID and URL secret when those are set.
fn verify_gumroad(config: &Config, ping: &GumroadPing, secret: Option<&str>) -> bool {
    if !ping.has_required_fields() {
        return false;
    }

    if let Some(expected) = config.gumroad_seller_id.as_deref() {
        if ping.get("seller_id") != Some(expected) {
            return false;
        }
    }

    match config.gumroad_webhook_secret.as_deref() {
        Some(expected) => {
            secret.is_some_and(|given| signing::constant_time_eq(expected, given))
        }
        None => true,
    }
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, WebhookError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WebhookError::BadRequest(message.to_string()))
}
