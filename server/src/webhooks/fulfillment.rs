//! Purchase Fulfilment
//!
//! Turns a verified storefront purchase into a Keygen license and delivers
//! the key, and suspends that license again on refund.
//!
//! Licenses are tagged with `<storefront>:<order id>` in their metadata so a
//! redelivered webhook finds the license it already produced instead of
//! issuing a second one.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use ff_common::Tier;
use ff_keygen::NewLicense;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::plans::Storefront;
use super::types::WebhookError;
use crate::api::AppState;

/// A verified purchase ready for fulfilment.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub storefront: Storefront,
    /// Storefront order identifier, when the webhook carried one.
    pub order_id: Option<String>,
    pub email: String,
    pub name: String,
    pub tier: Tier,
}

/// Result of a successful fulfilment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    pub license_key: String,
    /// The license already existed from an earlier delivery of this order.
    pub reused: bool,
}

/// Metadata value identifying an order across storefronts.
pub fn order_key(storefront: Storefront, order_id: &str) -> String {
    format!("{storefront}:{order_id}")
}

/// Marks an order as being fulfilled; released on drop.
struct InFlight {
    orders: Arc<DashSet<String>>,
    key: String,
}

impl InFlight {
    fn acquire(orders: &Arc<DashSet<String>>, key: String) -> Option<Self> {
        orders.insert(key.clone()).then(|| Self {
            orders: Arc::clone(orders),
            key,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.orders.remove(&self.key);
    }
}

/// Issue (or re-find) the license for a purchase and email it to the customer.
#[instrument(
    skip(state, purchase),
    fields(storefront = %purchase.storefront, tier = %purchase.tier)
)]
pub async fn fulfill(state: &AppState, purchase: Purchase) -> Result<Fulfillment, WebhookError> {
    let order_key = match purchase.order_id.as_deref() {
        Some(id) => order_key(purchase.storefront, id),
        None => {
            warn!("Purchase carries no order id; refunds will not be able to find this license");
            order_key(purchase.storefront, &Uuid::new_v4().to_string())
        }
    };

    let _guard = InFlight::acquire(&state.in_flight, order_key.clone())
        .ok_or(WebhookError::AlreadyProcessing)?;

    if purchase.order_id.is_some() {
        if let Some(existing) = state
            .keygen
            .find_license_by_order(&order_key)
            .await
            .map_err(WebhookError::LicenseCreation)?
        {
            info!(
                order = %order_key,
                license_id = %existing.id,
                "License already issued for order, resending"
            );
            let tier = existing.tier.unwrap_or(purchase.tier);
            deliver_license_email(state, &purchase.email, &purchase.name, &existing.key, tier)
                .await;
            return Ok(Fulfillment {
                license_key: existing.key,
                reused: true,
            });
        }
    }

    let new_license = NewLicense {
        policy_id: state.config.keygen_policy_id.clone(),
        customer_name: purchase.name.clone(),
        customer_email: purchase.email.clone(),
        tier: purchase.tier,
        source: purchase.storefront.as_str().to_string(),
        order_id: order_key.clone(),
        purchased_at: Utc::now(),
    };

    let license = state
        .keygen
        .create_license(&new_license)
        .await
        .map_err(WebhookError::LicenseCreation)?;

    info!(order = %order_key, license_id = %license.id, "License created");

    deliver_license_email(state, &purchase.email, &purchase.name, &license.key, purchase.tier)
        .await;

    Ok(Fulfillment {
        license_key: license.key,
        reused: false,
    })
}

/// Suspend the license issued for a refunded order.
///
/// A refund that cannot be matched to a license is acknowledged and logged.
#[instrument(skip(state))]
pub async fn revoke(
    state: &AppState,
    storefront: Storefront,
    order_id: Option<&str>,
) -> Result<(), WebhookError> {
    let Some(order_id) = order_id else {
        warn!("Refund carries no order id; nothing to revoke");
        return Ok(());
    };
    let order_key = order_key(storefront, order_id);

    let license = state
        .keygen
        .find_license_by_order(&order_key)
        .await
        .map_err(WebhookError::Revocation)?;

    let Some(license) = license else {
        warn!(order = %order_key, "Refund for an order with no license");
        return Ok(());
    };

    if license.status.as_deref() == Some("SUSPENDED") {
        info!(order = %order_key, license_id = %license.id, "License already suspended");
        return Ok(());
    }

    state
        .keygen
        .suspend_license(&license.id)
        .await
        .map_err(WebhookError::Revocation)?;

    info!(order = %order_key, license_id = %license.id, "License suspended after refund");
    Ok(())
}

/// Email the key, or log what would have been sent when SMTP is not configured.
/// Delivery failures are logged, not returned.
async fn deliver_license_email(state: &AppState, email: &str, name: &str, key: &str, tier: Tier) {
    match &state.email {
        Some(service) => {
            if let Err(e) = service.send_license_key(email, name, key, tier).await {
                error!(recipient = %email, error = %e, "Failed to email license key");
            } else {
                info!(recipient = %email, "License key emailed");
            }
        }
        None => {
            info!(recipient = %email, "Would send license key (SMTP not configured)");
        }
    }
}
