//! Common Error Types

use thiserror::Error;

/// Errors raised while parsing licensing vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Unknown license tier: {0}")]
    UnknownTier(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),
}

pub type Result<T> = std::result::Result<T, Error>;
