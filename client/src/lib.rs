//! FileFlow Desktop Licensing
//!
//! Activation and re-validation of the user's license against Keygen, with an
//! offline fallback, plus the gate premium features run behind.

pub mod config;
pub mod error;
pub mod gate;
pub mod manager;
pub mod store;

pub use config::ClientConfig;
pub use error::{LicenseError, Result};
pub use gate::{FeatureGate, FeatureLocked};
pub use manager::{CheckMode, LicenseCheck, LicenseManager};
pub use store::{LicenseRecord, LicenseStatus, LicenseStore, ValidationMethod};
