//! License File
//!
//! The activated license is kept as pretty-printed JSON. A missing or
//! unreadable file means "no license"; only writes can fail.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ff_common::Tier;
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Inactive,
}

/// How the stored license was last confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMethod {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub license_key: String,
    pub activation_date: DateTime<Utc>,
    pub status: LicenseStatus,
    pub product_id: String,
    #[serde(default)]
    pub validation_method: ValidationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Deadline for reaching Keygen after an offline activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_validation_expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    /// Whether an offline activation has outlived its grace period at `now`.
    #[must_use]
    pub fn offline_grace_expired(&self, now: DateTime<Utc>) -> bool {
        self.offline_validation_expires
            .is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Clone)]
pub struct LicenseStore {
    path: PathBuf,
}

impl LicenseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored license, if any.
    pub fn load(&self) -> Option<LicenseRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| {
                    tracing::warn!(
                        path = %self.path.display(),
                        "Corrupt license file, ignoring: {e}"
                    );
                })
                .ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read license file: {e}");
                None
            }
        }
    }

    /// Write the license, creating the parent directory as needed.
    pub fn save(&self, record: &LicenseRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LicenseError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, json).map_err(|source| LicenseError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
