//! Keygen.sh Client
//!
//! Thin async client over the Keygen JSON:API endpoints FileFlow needs:
//! license creation, lookup by order, suspension and key validation.

pub mod client;
pub mod error;
pub mod types;

pub use client::KeygenClient;
pub use error::{KeygenError, Result};
pub use types::{License, NewLicense, Validation};

/// Default Keygen API base URL.
pub const DEFAULT_API_URL: &str = "https://api.keygen.sh/v1";
