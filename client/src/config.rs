//! Client Configuration
//!
//! Keygen coordinates and license file location for the desktop app.

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use directories::BaseDirs;

use crate::error::{LicenseError, Result};

/// Keygen account the desktop app validates against.
pub const DEFAULT_ACCOUNT_ID: &str = "1-rjweb-v68f-47be-b32c-101ntwbtnfdz";

/// Keygen product the desktop app is licensed as.
pub const DEFAULT_PRODUCT_ID: &str = "fileflow";

/// Days an offline activation is honoured without reaching Keygen.
pub const OFFLINE_GRACE_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Keygen API base URL
    pub api_url: String,

    /// Keygen account ID
    pub account_id: String,

    /// Keygen product ID keys are validated against
    pub product_id: String,

    /// Where the activated license is stored
    pub license_path: PathBuf,

    /// Offline activation lifetime in days
    pub offline_grace_days: i64,
}

impl ClientConfig {
    /// Build the configuration, honouring `FILEFLOW_*` overrides.
    pub fn from_env() -> Result<Self> {
        let license_path = match non_empty_var("FILEFLOW_LICENSE_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_license_path()?,
        };

        Ok(Self {
            api_url: non_empty_var("FILEFLOW_KEYGEN_API_URL")
                .unwrap_or_else(|| ff_keygen::DEFAULT_API_URL.into()),
            account_id: non_empty_var("FILEFLOW_KEYGEN_ACCOUNT_ID")
                .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.into()),
            product_id: non_empty_var("FILEFLOW_KEYGEN_PRODUCT_ID")
                .unwrap_or_else(|| DEFAULT_PRODUCT_ID.into()),
            license_path,
            offline_grace_days: OFFLINE_GRACE_DAYS,
        })
    }

    /// Configuration pointing at `api_url` and storing the license at `license_path`.
    #[must_use]
    pub fn new(api_url: impl Into<String>, license_path: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into(),
            account_id: DEFAULT_ACCOUNT_ID.into(),
            product_id: DEFAULT_PRODUCT_ID.into(),
            license_path: license_path.into(),
            offline_grace_days: OFFLINE_GRACE_DAYS,
        }
    }

    #[must_use]
    pub fn offline_grace(&self) -> Duration {
        Duration::days(self.offline_grace_days)
    }
}

/// `~/.fileflow/license.json`
pub fn default_license_path() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or(LicenseError::NoHomeDir)?;
    Ok(dirs.home_dir().join(".fileflow").join("license.json"))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
