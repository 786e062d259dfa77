/// Structured error types for guestbook-store.
///
/// Uses `thiserror` so the server crate can match on failure classes.
/// The binary (guestbook-cli) wraps these in `anyhow` for startup reporting.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Endpoint could not be reached
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// I/O failed on an established connection
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Malformed frame on the wire
    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    /// The store answered with an error reply
    #[error("store error reply: {message}")]
    Server { message: String },

    /// Reply had a shape the command does not produce
    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// List entries are not valid UTF-8
    ///
    /// `lossy` holds the entries decoded with replacement characters.
    #[error("list '{key}' holds entries that are not valid UTF-8")]
    Encoding { key: String, lossy: Vec<String> },

    /// Acquire or execute exceeded the configured bound
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Pool was closed
    #[error("connection pool for {endpoint} is closed")]
    Closed { endpoint: String },
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create an unexpected reply error
    pub fn unexpected(command: impl Into<String>, reply: impl std::fmt::Debug) -> Self {
        Self::UnexpectedReply {
            command: command.into(),
            reply: format!("{:?}", reply),
        }
    }

    /// True for everything except data that could not be decoded.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, Self::Encoding { .. })
    }
}
