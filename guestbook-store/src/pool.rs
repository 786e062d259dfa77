//! Connection pool management
//!
//! One pool per endpoint. Connections are opened lazily and reused; the
//! number in flight is bounded by a semaphore. Callers never see individual
//! connections, only `execute`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::connection::{Connection, Connector, TcpConnector};
use crate::error::{Result, StoreError};
use crate::resp::{Command, Frame};

/// Default maximum connections per pool.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Upper bound on open connections
    pub max_connections: usize,

    /// Bound on waiting for a connection plus running the command.
    /// `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: None,
        }
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub endpoint: String,
    pub idle: usize,
    pub max_connections: usize,
    pub closed: bool,
}

/// Shared pool of connections to one endpoint. Cloning shares the pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    connector: Box<dyn Connector>,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    permits: Semaphore,
    options: PoolOptions,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new(connector: impl Connector + 'static, options: PoolOptions) -> Self {
        let max = options.max_connections.max(1);
        Self {
            inner: Arc::new(PoolInner {
                connector: Box::new(connector),
                idle: Mutex::new(Vec::with_capacity(max)),
                permits: Semaphore::new(max),
                options: PoolOptions {
                    max_connections: max,
                    ..options
                },
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Pool over a Redis-protocol TCP endpoint (`host:port`).
    ///
    /// Nothing is dialed until the first command.
    pub fn tcp(addr: impl Into<String>, options: PoolOptions) -> Self {
        Self::new(TcpConnector::new(addr), options)
    }

    pub fn endpoint(&self) -> &str {
        self.inner.connector.endpoint()
    }

    /// Run one command on some connection of this pool.
    ///
    /// Blocks until a connection is free. No retries: the first failure is
    /// returned to the caller.
    pub async fn execute(&self, command: &Command) -> Result<Frame> {
        match self.inner.options.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute_unbounded(command))
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => self.execute_unbounded(command).await,
        }
    }

    async fn execute_unbounded(&self, command: &Command) -> Result<Frame> {
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| self.closed_error())?;
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let idle = self.idle().pop();
        let mut conn = match idle {
            Some(conn) => conn,
            None => self.inner.connector.connect().await?,
        };

        let result = conn.execute(command).await;
        match &result {
            // An error reply leaves the stream in a clean state.
            Ok(_) | Err(StoreError::Server { .. }) => self.release(conn),
            Err(err) => {
                tracing::debug!(
                    endpoint = self.endpoint(),
                    command = command.name(),
                    error = %err,
                    "discarding broken store connection"
                );
            }
        }
        result
    }

    /// `PING`, used to verify the endpoint is reachable
    pub async fn ping(&self) -> Result<()> {
        match self.execute(&Command::ping()).await? {
            Frame::Simple(s) if s.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(StoreError::unexpected("PING", other)),
        }
    }

    /// Raw `INFO` payload
    pub async fn info(&self) -> Result<Vec<u8>> {
        match self.execute(&Command::info()).await? {
            Frame::Bulk(Some(data)) => Ok(data),
            Frame::Simple(s) => Ok(s.into_bytes()),
            other => Err(StoreError::unexpected("INFO", other)),
        }
    }

    /// Release all idle connections and reject further commands.
    ///
    /// Connections still in use are dropped when their command finishes.
    /// Calling it again is a no-op.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();
        let released = {
            let mut idle = self.idle();
            let n = idle.len();
            idle.clear();
            n
        };
        tracing::info!(endpoint = self.endpoint(), released, "connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            endpoint: self.endpoint().to_string(),
            idle: self.idle().len(),
            max_connections: self.inner.options.max_connections,
            closed: self.is_closed(),
        }
    }

    fn release(&self, conn: Box<dyn Connection>) {
        if !self.is_closed() {
            self.idle().push(conn);
        }
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Box<dyn Connection>>> {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn closed_error(&self) -> StoreError {
        StoreError::Closed {
            endpoint: self.endpoint().to_string(),
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("endpoint", &self.endpoint())
            .field("closed", &self.is_closed())
            .finish()
    }
}
