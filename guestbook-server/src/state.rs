//! Application state shared across handlers

use std::sync::Arc;

use guestbook_store::ConnectionPool;

use crate::policy::{ErrorPolicy, Failure, ProcessExit, Resolution, Terminator};

/// Shared application state
///
/// Built once at startup. Writes go to `primary`, reads to `replica`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    primary: ConnectionPool,
    replica: ConnectionPool,
    policy: ErrorPolicy,
    terminator: Box<dyn Terminator>,
}

impl AppState {
    pub fn new(primary: ConnectionPool, replica: ConnectionPool, policy: ErrorPolicy) -> Self {
        Self::with_terminator(primary, replica, policy, ProcessExit)
    }

    pub fn with_terminator(
        primary: ConnectionPool,
        replica: ConnectionPool,
        policy: ErrorPolicy,
        terminator: impl Terminator + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                primary,
                replica,
                policy,
                terminator: Box::new(terminator),
            }),
        }
    }

    pub fn primary(&self) -> &ConnectionPool {
        &self.inner.primary
    }

    pub fn replica(&self) -> &ConnectionPool {
        &self.inner.replica
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.inner.policy
    }

    /// Apply the deployment's error policy to one step's result.
    ///
    /// Under the abort policy this does not return on failure.
    pub fn settle<T: Default>(&self, operation: &'static str, result: Result<T, Failure<T>>) -> T {
        match self.inner.policy.resolve(operation, result) {
            Resolution::Value(value) => value,
            Resolution::Abort(error) => self.inner.terminator.terminate(&error),
        }
    }

    /// Close both pools. Safe to call more than once.
    pub fn close(&self) {
        self.inner.primary.close();
        self.inner.replica.close();
    }
}
