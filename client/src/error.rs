//! License Manager Errors

use std::path::PathBuf;

use ff_keygen::KeygenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Failed to write license file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize license: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Keygen(#[from] KeygenError),
}

pub type Result<T> = std::result::Result<T, LicenseError>;
