//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:5000")
    pub bind_address: String,

    /// Keygen API base URL
    pub keygen_api_url: String,

    /// Keygen account ID
    pub keygen_account_id: String,

    /// Keygen product or admin token used to issue licenses
    pub keygen_api_key: String,

    /// Keygen product ID licenses are scoped to
    pub keygen_product_id: String,

    /// Keygen policy new licenses are created under
    pub keygen_policy_id: String,

    /// HMAC-SHA256 key for `X-Appsumo-Signature`
    pub appsumo_webhook_secret: String,

    /// Shared secret expected in the Gumroad ping URL (optional)
    pub gumroad_webhook_secret: Option<String>,

    /// Gumroad seller ID pings must come from (optional)
    pub gumroad_seller_id: Option<String>,

    /// SMTP host (optional, email disabled without it)
    pub smtp_host: Option<String>,

    /// SMTP port (default: 587)
    pub smtp_port: u16,

    /// SMTP username (optional)
    pub smtp_username: Option<String>,

    /// SMTP password (optional)
    pub smtp_password: Option<String>,

    /// Sender address for license emails (optional)
    pub smtp_from: Option<String>,

    /// SMTP transport security: "starttls" (default), "tls" or "none"
    pub smtp_tls: String,

    /// Maximum webhook body size in bytes (default: 64KB)
    pub max_body_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".into()),
            keygen_api_url: env::var("KEYGEN_API_URL")
                .unwrap_or_else(|_| ff_keygen::DEFAULT_API_URL.into()),
            keygen_account_id: env::var("KEYGEN_ACCOUNT_ID")
                .context("KEYGEN_ACCOUNT_ID must be set")?,
            keygen_api_key: env::var("KEYGEN_API_KEY").context("KEYGEN_API_KEY must be set")?,
            keygen_product_id: env::var("KEYGEN_PRODUCT_ID").unwrap_or_else(|_| "fileflow".into()),
            keygen_policy_id: env::var("KEYGEN_POLICY_ID")
                .unwrap_or_else(|_| "fileflow-license-policy".into()),
            appsumo_webhook_secret: env::var("APPSUMO_WEBHOOK_SECRET")
                .context("APPSUMO_WEBHOOK_SECRET must be set")?,
            gumroad_webhook_secret: non_empty_var("GUMROAD_WEBHOOK_SECRET"),
            gumroad_seller_id: non_empty_var("GUMROAD_SELLER_ID"),
            smtp_host: non_empty_var("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_username: non_empty_var("SMTP_USERNAME"),
            smtp_password: non_empty_var("SMTP_PASSWORD"),
            smtp_from: non_empty_var("SMTP_FROM"),
            smtp_tls: env::var("SMTP_TLS").unwrap_or_else(|_| "starttls".into()),
            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64 * 1024),
        })
    }

    /// Check if SMTP is fully configured.
    #[must_use]
    pub const fn has_smtp(&self) -> bool {
        self.smtp_host.is_some()
            && self.smtp_username.is_some()
            && self.smtp_password.is_some()
            && self.smtp_from.is_some()
    }

    /// Create a default configuration for testing.
    ///
    /// Points Keygen at an unroutable local port; tests that exercise Keygen
    /// override `keygen_api_url` with a mock server URI.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".into(),
            keygen_api_url: "http://127.0.0.1:9".into(),
            keygen_account_id: "test-account".into(),
            keygen_api_key: "test-token".into(),
            keygen_product_id: "fileflow".into(),
            keygen_policy_id: "fileflow-license-policy".into(),
            appsumo_webhook_secret: "test-appsumo-secret".into(),
            gumroad_webhook_secret: None,
            gumroad_seller_id: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: "starttls".into(),
            max_body_size: 64 * 1024,
        }
    }
}

/// Read an optional variable, treating an empty value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
