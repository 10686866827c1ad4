//! Keygen Client Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeygenError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("Keygen is unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// Keygen answered with a non-success status.
    #[error("Keygen API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Unexpected Keygen response: {0}")]
    Decode(String),

    #[error("Keygen API token is required for this request")]
    MissingToken,
}

impl KeygenError {
    /// Whether the failure means Keygen could not be reached at all.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, KeygenError>;
