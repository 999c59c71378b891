//! Error taxonomy for bundle encoding and writing

use ferry_store::StoreError;
use thiserror::Error;

/// Errors surfaced while encoding or writing a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A capability set that cannot be constructed or does not match the
    /// requested bundle version.
    #[error("invalid capability set: {0}")]
    InvalidCapabilities(String),

    /// Malformed or unrepresentable changeset content. Always surfaces
    /// before any bytes are finalized at the destination.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// A translation store failure; the store is rolled back before this
    /// propagates.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Destination unwritable or storage error; never leaves a partial
    /// file behind.
    #[error("i/o failure")]
    Io(#[from] std::io::Error),
}

/// Result type for bundle operations
pub type Result<T> = std::result::Result<T, BundleError>;
