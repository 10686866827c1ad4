//! License Key Formats
//!
//! Local format checks run before (and instead of, when offline) a Keygen
//! validation, plus development key generation.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Minimum length accepted by the pre-activation format check.
pub const MIN_KEY_LENGTH: usize = 20;

/// Minimum number of dash-separated groups accepted by the pre-activation check.
pub const MIN_KEY_GROUPS: usize = 4;

static KEYGEN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9]{5,7}(-[A-Z0-9]{2,7}){3,6}$").expect("valid regex")
});

/// Loose shape check done before any activation attempt.
pub fn is_well_formed(key: &str) -> bool {
    key.len() >= MIN_KEY_LENGTH && key.split('-').count() >= MIN_KEY_GROUPS
}

/// Strict Keygen key shape, used when the key cannot be validated online.
pub fn matches_keygen_pattern(key: &str) -> bool {
    KEYGEN_KEY.is_match(key)
}

/// Generate a development key (`FFTST-YYMMDD-XXXXXX-XXXXXX-TEST`).
///
/// Keys are derived from the timestamp and product, and always pass both
/// [`is_well_formed`] and [`matches_keygen_pattern`]. They are not known to
/// Keygen, so they only ever activate in offline mode.
pub fn generate_test_key(product_id: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d%H%M%S").to_string();
    let product: String = product_id.chars().take(8).collect();
    let digest = Sha256::digest(format!("FILEFLOW-TEST-{timestamp}-{product}").as_bytes());
    let hash = hex::encode_upper(digest);

    format!(
        "FFTST-{}-{}-{}-TEST",
        &timestamp[2..8],
        &hash[..6],
        &hash[6..12]
    )
}
