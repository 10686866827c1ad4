//! Webhook Types
//!
//! Storefront payloads, webhook responses and errors.

use std::collections::HashMap;

use axum::extract::rejection::{BytesRejection, FormRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ff_keygen::KeygenError;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// AppSumo webhook body.
#[derive(Debug, Deserialize)]
pub struct AppSumoEvent {
    /// Event name (`purchase`, `refund`, ...).
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer: AppSumoCustomer,
    #[serde(default)]
    pub invoice_item_uuid: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppSumoCustomer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AppSumoEvent {
    /// Storefront order identifier (`invoice_item_uuid`, then `uuid`).
    pub fn order_id(&self) -> Option<&str> {
        non_blank(self.invoice_item_uuid.as_deref()).or_else(|| non_blank(self.uuid.as_deref()))
    }
}

/// Gumroad ping, delivered as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Default)]
pub struct GumroadPing {
    fields: HashMap<String, String>,
}

/// Fields every genuine Gumroad ping carries.
pub const GUMROAD_REQUIRED_FIELDS: [&str; 3] = ["resource_name", "seller_id", "product_id"];

impl GumroadPing {
    #[must_use]
    pub const fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Non-blank field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        non_blank(self.fields.get(name).map(String::as_str))
    }

    pub fn has_required_fields(&self) -> bool {
        GUMROAD_REQUIRED_FIELDS
            .iter()
            .all(|field| self.fields.contains_key(*field))
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.get("resource_name")
    }

    /// Whether this ping reports a refund (a `refund` resource, or a sale
    /// re-sent with `refunded=true`).
    pub fn is_refund(&self) -> bool {
        self.resource_name() == Some("refund") || self.get("refunded") == Some("true")
    }

    /// Storefront order identifier (`sale_id`, then `order_number`).
    pub fn order_id(&self) -> Option<&str> {
        self.get("sale_id").or_else(|| self.get("order_number"))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Successful webhook acknowledgement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
}

impl WebhookResponse {
    pub fn license_created(license_key: String) -> Self {
        Self {
            success: true,
            message: "License created successfully".into(),
            license_key: Some(license_key),
        }
    }

    pub fn refund_processed() -> Self {
        Self {
            success: true,
            message: "Refund processed".into(),
            license_key: None,
        }
    }

    pub fn event_received() -> Self {
        Self {
            success: true,
            message: "Event received".into(),
            license_key: None,
        }
    }
}

/// Webhook errors.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid webhook")]
    InvalidWebhook,
    #[error("{0}")]
    BadRequest(String),
    #[error("Purchase is already being processed")]
    AlreadyProcessing,
    #[error("Failed to create license: {0}")]
    LicenseCreation(#[source] KeygenError),
    #[error("Failed to revoke license: {0}")]
    Revocation(#[source] KeygenError),
    /// The request could not be extracted (content type, body size, encoding).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for WebhookError {
                fn from(rejection: $rejection) -> Self {
                    Self::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

impl_from_rejection!(BytesRejection, FormRejection, QueryRejection);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidSignature | Self::InvalidWebhook => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": self.to_string() }),
            ),
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            Self::AlreadyProcessing => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": self.to_string() }),
            ),
            Self::Rejected { status, message } => {
                tracing::warn!(%status, "Rejected webhook request: {message}");
                (*status, serde_json::json!({ "error": message }))
            }
            Self::LicenseCreation(err) => {
                tracing::error!(error = %err, "Error creating license");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "success": false, "message": "Failed to create license" }),
                )
            }
            Self::Revocation(err) => {
                tracing::error!(error = %err, "Error revoking license");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "success": false, "message": "Failed to process refund" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
