//! Error types for guestbook-server

use guestbook_store::StoreError;
use thiserror::Error;

/// Failure of any operation a request handler performs
#[derive(Error, Debug)]
pub enum GuestbookError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse failure class, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Endpoint unreachable or the command failed at the protocol level
    Connectivity,
    /// Result could not be encoded for the response
    Serialization,
}

impl GuestbookError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Store(e) if e.is_connectivity() => FailureKind::Connectivity,
            Self::Store(_) | Self::Serialization(_) => FailureKind::Serialization,
        }
    }
}
