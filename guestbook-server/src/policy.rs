//! Error policy
//!
//! One policy is picked per deployment and every handler settles its
//! failures through [`ErrorPolicy::resolve`]. Handlers get a typed value back
//! only after the failure branch has been dealt with.

use std::fmt;
use std::str::FromStr;

use guestbook_store::StoreError;

use crate::error::GuestbookError;

/// What to do when a storage or serialization step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log, then continue with the type's default value
    #[default]
    Substitute,
    /// Log, then continue with whatever partial value the failure carried
    PassThrough,
    /// Log, then terminate the whole process without answering
    Abort,
}

/// A failed step, with any partial result it produced
#[derive(Debug)]
pub struct Failure<T> {
    pub error: GuestbookError,
    pub partial: Option<T>,
}

impl<T> Failure<T> {
    pub fn new(error: impl Into<GuestbookError>) -> Self {
        Self {
            error: error.into(),
            partial: None,
        }
    }

    pub fn with_partial(error: impl Into<GuestbookError>, partial: T) -> Self {
        Self {
            error: error.into(),
            partial: Some(partial),
        }
    }
}

impl Failure<Vec<String>> {
    /// Failure of a list read. Undecodable entries keep their lossy copy.
    pub fn entries(error: StoreError) -> Self {
        let partial = match &error {
            StoreError::Encoding { lossy, .. } => Some(lossy.clone()),
            _ => None,
        };
        Self {
            error: error.into(),
            partial,
        }
    }
}

/// Outcome of applying the policy
#[derive(Debug)]
pub enum Resolution<T> {
    Value(T),
    Abort(GuestbookError),
}

impl ErrorPolicy {
    pub fn resolve<T: Default>(
        &self,
        operation: &'static str,
        result: Result<T, Failure<T>>,
    ) -> Resolution<T> {
        let failure = match result {
            Ok(value) => return Resolution::Value(value),
            Err(failure) => failure,
        };
        let kind = failure.error.kind();

        match self {
            Self::Substitute => {
                tracing::error!(operation, ?kind, error = %failure.error, "substituting default value");
                Resolution::Value(T::default())
            }
            Self::PassThrough => {
                let partial = failure.partial.is_some();
                tracing::error!(operation, ?kind, partial, error = %failure.error, "passing result through");
                Resolution::Value(failure.partial.unwrap_or_default())
            }
            Self::Abort => {
                tracing::error!(operation, ?kind, error = %failure.error, "aborting on error");
                Resolution::Abort(failure.error)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substitute => "substitute",
            Self::PassThrough => "pass-through",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown error policy '{0}' (expected substitute, pass-through or abort)")]
pub struct UnknownPolicy(String);

impl FromStr for ErrorPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "substitute" => Ok(Self::Substitute),
            "pass-through" | "passthrough" => Ok(Self::PassThrough),
            "abort" => Ok(Self::Abort),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Ends the process when the abort policy fires
pub trait Terminator: Send + Sync {
    fn terminate(&self, error: &GuestbookError) -> !;
}

/// Exits with status 1. Pools are not closed and in-flight requests get no
/// response.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, error: &GuestbookError) -> ! {
        tracing::error!(error = %error, "terminating process");
        std::process::exit(1)
    }
}
