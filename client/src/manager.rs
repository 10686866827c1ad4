//! License Manager
//!
//! Activates, re-checks and deactivates the locally stored license. Keygen is
//! the source of truth; when it cannot be reached the manager falls back to
//! the stored record and the Keygen key pattern, within a grace period.

use chrono::{DateTime, Utc};
use ff_common::{key, Tier};
use ff_keygen::{KeygenClient, KeygenError, Validation};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::store::{LicenseRecord, LicenseStatus, LicenseStore, ValidationMethod};

/// Where a [`LicenseCheck`] verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Keygen answered.
    Online,
    /// Answered from the stored license record.
    Cached,
    /// Keygen was unreachable (or not consulted) and local rules decided.
    Offline,
}

/// Outcome of a license operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseCheck {
    pub success: bool,
    pub message: String,
    pub mode: CheckMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl LicenseCheck {
    fn ok(mode: CheckMode, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            mode,
            tier: None,
            expires: None,
        }
    }

    fn failed(mode: CheckMode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(mode, message)
        }
    }

    fn with_record(mut self, record: &LicenseRecord) -> Self {
        self.tier = record.tier;
        self.expires = record.expires;
        self
    }
}

const INVALID_FORMAT: &str = "Invalid license key format";
const INVALID_KEY: &str = "Invalid license key";
const LICENSE_EXPIRED: &str = "License has expired";
const GRACE_EXPIRED: &str = "Offline validation period has expired";

pub struct LicenseManager {
    config: ClientConfig,
    keygen: KeygenClient,
    store: LicenseStore,
    record: Option<LicenseRecord>,
}

impl LicenseManager {
    /// Create a manager and load any stored license.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let keygen = KeygenClient::new(config.api_url.clone(), config.account_id.clone())?;
        let store = LicenseStore::new(config.license_path.clone());
        let record = store.load();

        Ok(Self {
            config,
            keygen,
            store,
            record,
        })
    }

    /// The stored license, if any.
    pub const fn record(&self) -> Option<&LicenseRecord> {
        self.record.as_ref()
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Tier unlocked by the stored license, if it is active.
    ///
    /// Licenses issued without tier metadata unlock [`Tier::DEFAULT_PAID`].
    pub fn effective_tier(&self) -> Option<Tier> {
        self.record
            .as_ref()
            .filter(|record| record.is_active())
            .map(|record| record.tier.unwrap_or(Tier::DEFAULT_PAID))
    }

    /// Activate `key`, online when Keygen is reachable and offline otherwise.
    #[instrument(skip_all)]
    pub async fn activate(&mut self, key: &str) -> Result<LicenseCheck> {
        let key = key.trim();
        if !key::is_well_formed(key) {
            return Ok(LicenseCheck::failed(CheckMode::Offline, INVALID_FORMAT));
        }

        match self.keygen.validate_key(key, &self.config.product_id).await {
            Ok(validation) if validation.valid => {
                let now = Utc::now();
                let record = LicenseRecord {
                    license_key: key.to_string(),
                    activation_date: now,
                    status: LicenseStatus::Active,
                    product_id: self.config.product_id.clone(),
                    validation_method: ValidationMethod::Online,
                    tier: license_tier(&validation),
                    expires: validation.license.as_ref().and_then(|l| l.expiry),
                    offline_validation_expires: None,
                    last_validated: Some(now),
                };
                self.store(record)?;
                info!(tier = ?self.effective_tier(), "License activated");
                Ok(self.current(CheckMode::Online, "License validated successfully"))
            }
            Ok(validation) => Ok(rejected(validation)),
            Err(e) if e.is_transport() => {
                warn!(error = %e, "Keygen unreachable, activating offline");
                self.activate_offline(key)
            }
            Err(e) => Ok(keygen_failure(&e)),
        }
    }

    fn activate_offline(&mut self, key: &str) -> Result<LicenseCheck> {
        if !key::matches_keygen_pattern(key) {
            return Ok(LicenseCheck::failed(CheckMode::Offline, INVALID_FORMAT));
        }

        let now = Utc::now();
        if let Some(record) = self
            .record
            .as_ref()
            .filter(|r| r.license_key == key && r.is_active())
        {
            if let Some(reason) = offline_refusal(record, now) {
                return Ok(LicenseCheck::failed(CheckMode::Cached, reason));
            }
            return Ok(self.current(CheckMode::Cached, "License is active (cached)"));
        }

        let record = LicenseRecord {
            license_key: key.to_string(),
            activation_date: now,
            status: LicenseStatus::Active,
            product_id: self.config.product_id.clone(),
            validation_method: ValidationMethod::Offline,
            tier: None,
            expires: None,
            offline_validation_expires: Some(now + self.config.offline_grace()),
            last_validated: None,
        };
        self.store(record)?;
        Ok(self.current(CheckMode::Offline, "License activated (offline mode)"))
    }

    /// Re-validate the stored license.
    #[instrument(skip_all)]
    pub async fn check(&mut self) -> Result<LicenseCheck> {
        let Some(record) = self.record.clone() else {
            return Ok(LicenseCheck::failed(CheckMode::Cached, "No license found"));
        };
        if !record.is_active() {
            return Ok(LicenseCheck::failed(CheckMode::Cached, "License is not active"));
        }

        match self
            .keygen
            .validate_key(&record.license_key, &self.config.product_id)
            .await
        {
            Ok(validation) if validation.valid => {
                let tier = license_tier(&validation).or(record.tier);
                let expires = validation.license.as_ref().and_then(|l| l.expiry);
                self.store(LicenseRecord {
                    validation_method: ValidationMethod::Online,
                    tier,
                    expires,
                    offline_validation_expires: None,
                    last_validated: Some(Utc::now()),
                    ..record
                })?;
                Ok(self.current(CheckMode::Online, "License validated successfully"))
            }
            Ok(validation) => Ok(rejected(validation)),
            Err(e) if e.is_transport() => {
                debug!(error = %e, "Keygen unreachable, using stored license");
                if let Some(reason) = offline_refusal(&record, Utc::now()) {
                    return Ok(LicenseCheck::failed(CheckMode::Offline, reason));
                }
                Ok(self.current(CheckMode::Offline, "License is active (offline mode)"))
            }
            Err(e) => Ok(keygen_failure(&e)),
        }
    }

    /// Mark the stored license inactive.
    pub fn deactivate(&mut self) -> Result<LicenseCheck> {
        let Some(record) = self.record.clone() else {
            return Ok(LicenseCheck::failed(CheckMode::Cached, "No license to deactivate"));
        };

        self.store(LicenseRecord {
            status: LicenseStatus::Inactive,
            ..record
        })?;
        info!("License deactivated");
        Ok(LicenseCheck::ok(CheckMode::Cached, "License deactivated"))
    }

    fn store(&mut self, record: LicenseRecord) -> Result<()> {
        self.store.save(&record)?;
        self.record = Some(record);
        Ok(())
    }

    /// Success carrying the stored record's tier and expiry.
    fn current(&self, mode: CheckMode, message: &str) -> LicenseCheck {
        let check = LicenseCheck::ok(mode, message);
        match &self.record {
            Some(record) => check.with_record(record),
            None => check,
        }
    }
}

/// Why a stored license cannot be honoured without Keygen, if it cannot.
fn offline_refusal(record: &LicenseRecord, now: DateTime<Utc>) -> Option<&'static str> {
    if record.expires.is_some_and(|expires| expires <= now) {
        Some(LICENSE_EXPIRED)
    } else if record.offline_grace_expired(now) {
        Some(GRACE_EXPIRED)
    } else {
        None
    }
}

fn license_tier(validation: &Validation) -> Option<Tier> {
    validation.license.as_ref().and_then(|l| l.tier)
}

fn rejected(validation: Validation) -> LicenseCheck {
    let reason = validation.detail.unwrap_or_else(|| INVALID_KEY.into());
    warn!(code = ?validation.code, "License validation failed: {reason}");
    LicenseCheck::failed(CheckMode::Online, reason)
}

fn keygen_failure(error: &KeygenError) -> LicenseCheck {
    warn!(error = %error, "License validation failed");
    LicenseCheck::failed(CheckMode::Online, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "ABCDE-12345-FGHIJ-67890";
    const VALIDATE_PATH: &str = "/accounts/test-account/licenses/actions/validate-key";

    /// Nothing listens on the discard port.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn config(api_url: &str, dir: &TempDir) -> ClientConfig {
        ClientConfig {
            account_id: "test-account".into(),
            ..ClientConfig::new(api_url, dir.path().join(".fileflow").join("license.json"))
        }
    }

    fn manager(api_url: &str, dir: &TempDir) -> LicenseManager {
        LicenseManager::new(config(api_url, dir)).unwrap()
    }

    fn license_path(dir: &TempDir) -> PathBuf {
        dir.path().join(".fileflow").join("license.json")
    }

    async fn mock_valid(server: &MockServer, tier: Option<&str>) {
        let metadata = tier.map_or_else(|| json!({}), |t| json!({ "tier": t }));
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .and(body_partial_json(json!({ "meta": { "scope": { "product": "fileflow" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "lic-1",
                    "type": "licenses",
                    "attributes": {
                        "key": KEY,
                        "status": "ACTIVE",
                        "expiry": "2030-01-01T00:00:00Z",
                        "metadata": metadata
                    }
                },
                "meta": { "valid": true, "code": "VALID", "detail": "is valid" }
            })))
            .mount(server)
            .await;
    }

    async fn mock_invalid(server: &MockServer, detail: Option<&str>) {
        let mut meta = json!({ "valid": false, "code": "SUSPENDED" });
        if let Some(detail) = detail {
            meta["detail"] = json!(detail);
        }
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "meta": meta
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn activate_rejects_malformed_key_without_network() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        let result = manager.activate("SHORT-KEY").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Invalid license key format");
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(!license_path(&dir).exists());
    }

    #[tokio::test]
    async fn activate_online_stores_record() {
        let server = MockServer::start().await;
        mock_valid(&server, Some("business")).await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        let result = manager.activate(KEY).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "License validated successfully");
        assert_eq!(result.mode, CheckMode::Online);
        assert_eq!(result.tier, Some(Tier::Business));
        assert!(result.expires.is_some());

        let stored = LicenseStore::new(license_path(&dir)).load().unwrap();
        assert_eq!(stored.license_key, KEY);
        assert_eq!(stored.status, LicenseStatus::Active);
        assert_eq!(stored.validation_method, ValidationMethod::Online);
        assert!(stored.last_validated.is_some());
        assert_eq!(manager.effective_tier(), Some(Tier::Business));
    }

    #[tokio::test]
    async fn activate_without_tier_unlocks_default_paid() {
        let server = MockServer::start().await;
        mock_valid(&server, None).await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        manager.activate(KEY).await.unwrap();
        assert_eq!(manager.effective_tier(), Some(Tier::DEFAULT_PAID));
    }

    #[tokio::test]
    async fn activate_rejected_key_stores_nothing() {
        let server = MockServer::start().await;
        mock_invalid(&server, Some("is suspended")).await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        let result = manager.activate(KEY).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "is suspended");
        assert!(manager.record().is_none());
        assert!(!license_path(&dir).exists());
    }

    #[tokio::test]
    async fn activate_rejection_without_detail_uses_default_message() {
        let server = MockServer::start().await;
        mock_invalid(&server, None).await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        let result = manager.activate(KEY).await.unwrap();
        assert_eq!(result.message, "Invalid license key");
    }

    #[tokio::test]
    async fn activate_api_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);

        let result = manager.activate(KEY).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.mode, CheckMode::Online);
        assert!(result.message.contains("500"), "{}", result.message);
        assert!(manager.record().is_none());
    }

    #[tokio::test]
    async fn activate_offline_with_keygen_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);

        let before = Utc::now();
        let result = manager.activate(KEY).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "License activated (offline mode)");
        assert_eq!(result.mode, CheckMode::Offline);

        let record = manager.record().unwrap();
        assert_eq!(record.validation_method, ValidationMethod::Offline);
        let deadline = record.offline_validation_expires.unwrap();
        assert!(deadline >= before + Duration::days(7));
        assert!(deadline <= Utc::now() + Duration::days(7));

        let again = manager.activate(KEY).await.unwrap();
        assert_eq!(again.message, "License is active (cached)");
        assert_eq!(again.mode, CheckMode::Cached);
    }

    #[tokio::test]
    async fn activate_offline_rejects_non_keygen_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);

        // Well formed, but the first group is too long for a Keygen key.
        let result = manager.activate("ABCDEFGHIJ-1234-5678-9012").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Invalid license key format");
        assert!(manager.record().is_none());
    }

    #[tokio::test]
    async fn generated_test_key_activates_offline() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);
        let key = key::generate_test_key("fileflow", Utc::now());

        let result = manager.activate(&key).await.unwrap();
        assert!(result.success, "{}", result.message);
    }

    #[tokio::test]
    async fn check_without_license() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);

        let result = manager.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "No license found");
    }

    #[tokio::test]
    async fn check_refreshes_online_record() {
        let server = MockServer::start().await;
        mock_valid(&server, Some("pro")).await;
        let dir = tempfile::tempdir().unwrap();

        let mut offline = manager(UNREACHABLE, &dir);
        offline.activate(KEY).await.unwrap();

        let mut manager = manager(&server.uri(), &dir);
        let result = manager.check().await.unwrap();
        assert!(result.success);
        assert_eq!(result.mode, CheckMode::Online);
        assert_eq!(result.tier, Some(Tier::Pro));

        let record = manager.record().unwrap();
        assert_eq!(record.validation_method, ValidationMethod::Online);
        assert!(record.offline_validation_expires.is_none());
        assert!(record.last_validated.is_some());
    }

    #[tokio::test]
    async fn check_reports_rejection_and_keeps_record() {
        let server = MockServer::start().await;
        mock_invalid(&server, Some("is expired")).await;
        let dir = tempfile::tempdir().unwrap();
        manager(UNREACHABLE, &dir).activate(KEY).await.unwrap();

        let mut manager = manager(&server.uri(), &dir);
        let result = manager.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "is expired");
        assert!(manager.record().is_some());
    }

    #[tokio::test]
    async fn check_offline_within_grace() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);
        manager.activate(KEY).await.unwrap();

        let result = manager.check().await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "License is active (offline mode)");
        assert_eq!(result.mode, CheckMode::Offline);
    }

    #[tokio::test]
    async fn check_offline_after_grace_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = LicenseStore::new(license_path(&dir));
        let now = Utc::now();
        store
            .save(&LicenseRecord {
                license_key: KEY.into(),
                activation_date: now - Duration::days(10),
                status: LicenseStatus::Active,
                product_id: "fileflow".into(),
                validation_method: ValidationMethod::Offline,
                tier: None,
                expires: None,
                offline_validation_expires: Some(now - Duration::days(3)),
                last_validated: None,
            })
            .unwrap();

        let mut manager = manager(UNREACHABLE, &dir);
        let result = manager.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Offline validation period has expired");
    }

    fn save_record(dir: &TempDir, record: LicenseRecord) {
        LicenseStore::new(license_path(dir)).save(&record).unwrap();
    }

    fn stored_record(validation_method: ValidationMethod) -> LicenseRecord {
        LicenseRecord {
            license_key: KEY.into(),
            activation_date: Utc::now() - Duration::days(60),
            status: LicenseStatus::Active,
            product_id: "fileflow".into(),
            validation_method,
            tier: Some(Tier::Business),
            expires: None,
            offline_validation_expires: None,
            last_validated: None,
        }
    }

    #[tokio::test]
    async fn check_offline_after_license_expiry() {
        let dir = tempfile::tempdir().unwrap();
        save_record(
            &dir,
            LicenseRecord {
                expires: Some(Utc::now() - Duration::days(30)),
                ..stored_record(ValidationMethod::Online)
            },
        );

        let mut manager = manager(UNREACHABLE, &dir);
        let result = manager.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "License has expired");
        assert_eq!(result.mode, CheckMode::Offline);

        let gate = crate::gate::FeatureGate::ensure(
            &mut manager,
            ff_common::Feature::ExportDatabase,
        )
        .await;
        assert!(gate.is_err(), "expired license must not unlock features");
    }

    #[tokio::test]
    async fn check_offline_before_license_expiry() {
        let dir = tempfile::tempdir().unwrap();
        save_record(
            &dir,
            LicenseRecord {
                expires: Some(Utc::now() + Duration::days(30)),
                ..stored_record(ValidationMethod::Online)
            },
        );

        let result = manager(UNREACHABLE, &dir).check().await.unwrap();
        assert!(result.success, "{}", result.message);
    }

    #[tokio::test]
    async fn reactivate_offline_after_grace_expired_agrees_with_check() {
        let dir = tempfile::tempdir().unwrap();
        let deadline = Utc::now() - Duration::days(3);
        save_record(
            &dir,
            LicenseRecord {
                tier: None,
                offline_validation_expires: Some(deadline),
                ..stored_record(ValidationMethod::Offline)
            },
        );
        let mut manager = manager(UNREACHABLE, &dir);

        let checked = manager.check().await.unwrap();
        let activated = manager.activate(KEY).await.unwrap();

        assert!(!checked.success);
        assert!(!activated.success);
        assert_eq!(activated.message, "Offline validation period has expired");
        assert_eq!(
            manager.record().unwrap().offline_validation_expires,
            Some(deadline),
            "grace period is not restarted"
        );
    }

    #[tokio::test]
    async fn reactivate_offline_after_license_expiry_fails() {
        let dir = tempfile::tempdir().unwrap();
        save_record(
            &dir,
            LicenseRecord {
                expires: Some(Utc::now() - Duration::days(1)),
                ..stored_record(ValidationMethod::Online)
            },
        );

        let result = manager(UNREACHABLE, &dir).activate(KEY).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "License has expired");
    }

    #[tokio::test]
    async fn deactivate_then_check() {
        let server = MockServer::start().await;
        mock_valid(&server, Some("premium")).await;
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(&server.uri(), &dir);
        manager.activate(KEY).await.unwrap();
        let requests_after_activate = server.received_requests().await.unwrap().len();

        let result = manager.deactivate().unwrap();
        assert!(result.success);
        assert_eq!(result.message, "License deactivated");
        assert_eq!(manager.effective_tier(), None);

        let stored = LicenseStore::new(license_path(&dir)).load().unwrap();
        assert_eq!(stored.status, LicenseStatus::Inactive);

        let result = manager.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "License is not active");
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            requests_after_activate,
            "inactive licenses are not revalidated"
        );
    }

    #[tokio::test]
    async fn deactivate_without_license() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(UNREACHABLE, &dir);

        let result = manager.deactivate().unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "No license to deactivate");
    }
}
