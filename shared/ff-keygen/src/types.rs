//! Keygen Wire Types
//!
//! JSON:API documents as Keygen sends them, and the flattened views the rest
//! of the workspace works with.

use chrono::{DateTime, Utc};
use ff_common::Tier;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// A license as seen by FileFlow.
#[derive(Debug, Clone, PartialEq)]
pub struct License {
    pub id: String,
    pub key: String,
    /// Keygen status (`ACTIVE`, `EXPIRED`, `SUSPENDED`, ...).
    pub status: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    /// Tier recorded in the license metadata at issuance.
    pub tier: Option<Tier>,
    pub metadata: Map<String, Value>,
}

impl License {
    /// Metadata value as a string, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

impl From<LicenseResource> for License {
    fn from(resource: LicenseResource) -> Self {
        let attrs = resource.attributes;
        let tier = attrs
            .metadata
            .get("tier")
            .and_then(Value::as_str)
            .and_then(|t| t.parse().ok());
        Self {
            id: resource.id,
            key: attrs.key,
            status: attrs.status,
            expiry: attrs.expiry,
            tier,
            metadata: attrs.metadata,
        }
    }
}

/// Everything needed to issue a license for a storefront purchase.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub policy_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub tier: Tier,
    /// Storefront that sold the license (`appsumo`, `gumroad`).
    pub source: String,
    /// Storefront order identifier, used for idempotency and refunds.
    pub order_id: String,
    pub purchased_at: DateTime<Utc>,
}

impl NewLicense {
    /// JSON:API create document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        json!({
            "data": {
                "type": "licenses",
                "attributes": {
                    "name": format!("{}'s License", self.customer_name),
                    "maxMachines": self.tier.max_machines(),
                    "metadata": {
                        "tier": self.tier.as_str(),
                        "purchaseDate": self.purchased_at.to_rfc3339(),
                        "source": self.source,
                        "orderId": self.order_id,
                        "customerEmail": self.customer_email,
                        "customerName": self.customer_name,
                    }
                },
                "relationships": {
                    "policy": {
                        "data": { "type": "policies", "id": self.policy_id }
                    }
                }
            }
        })
    }
}

/// Outcome of a `validate-key` action.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    /// Keygen validation code (`VALID`, `NOT_FOUND`, `EXPIRED`, ...).
    pub code: Option<String>,
    pub detail: Option<String>,
    pub license: Option<License>,
}

// ============================================================================
// Raw documents
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct Document<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LicenseResource {
    pub id: String,
    pub attributes: LicenseAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LicenseAttributes {
    pub key: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidationDocument {
    #[serde(default)]
    pub data: Option<LicenseResource>,
    pub meta: ValidationMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidationMeta {
    pub valid: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl From<ValidationDocument> for Validation {
    fn from(doc: ValidationDocument) -> Self {
        Self {
            valid: doc.meta.valid,
            code: doc.meta.code,
            detail: doc.meta.detail,
            license: doc.data.map(License::from),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDocument {
    #[serde(default)]
    pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorDocument {
    /// First human-readable message in the document.
    pub fn message(&self) -> Option<String> {
        self.errors
            .first()
            .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
    }
}
