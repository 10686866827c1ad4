//! FileFlow Common Library
//!
//! Licensing vocabulary shared by the webhook server and the desktop client.

pub mod error;
pub mod feature;
pub mod key;
pub mod tier;

pub use error::{Error, Result};
pub use feature::Feature;
pub use tier::Tier;
