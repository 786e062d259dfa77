//! Server startup for the guestbook binary
//!
//! Builds the primary and replica pools, checks both endpoints answer, then
//! runs the HTTP server until shutdown.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use guestbook_server::{run_server, AppState, ErrorPolicy, ServerConfig};
use guestbook_store::{
    ConnectionPool, MemoryConnector, MemoryStore, PoolOptions, DEFAULT_MAX_CONNECTIONS,
};

/// Endpoint value selecting the in-process store
pub const MEMORY_ENDPOINT: &str = "memory";

/// Arguments for running the guestbook server
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Address for server to listen on (":3000" listens on all interfaces)
    #[arg(long, env = "GUESTBOOK_SERVER", default_value = ":3000")]
    pub server: String,

    /// Primary (write) store endpoint, host:port or "memory"
    #[arg(long, env = "GUESTBOOK_REDIS", default_value = "localhost:6379")]
    pub redis: String,

    /// Replica (read) store endpoint, host:port or "memory"
    #[arg(
        long = "redis-replica",
        alias = "redisslave",
        env = "GUESTBOOK_REDIS_REPLICA",
        default_value = "localhost:6379"
    )]
    pub redis_replica: String,

    /// Directory of static assets served for unrouted paths
    #[arg(long, env = "GUESTBOOK_PUBLIC", default_value = "./public")]
    pub public: PathBuf,

    /// Debug mode (verbose logging)
    #[arg(long)]
    pub debug: bool,

    /// Tracing provider license key; absent disables request tracing
    #[arg(
        long = "trace-key",
        alias = "nrkey",
        env = "GUESTBOOK_TRACE_KEY",
        hide_env_values = true
    )]
    pub trace_key: Option<String>,

    /// What to do when a store or serialization step fails
    /// (substitute, pass-through, abort)
    #[arg(long, env = "GUESTBOOK_ERROR_POLICY", default_value = "substitute")]
    pub error_policy: ErrorPolicy,

    /// Maximum connections per store pool
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Bound in seconds on each store command, including the wait for a
    /// connection (default: wait indefinitely)
    #[arg(long)]
    pub store_timeout: Option<u64>,
}

/// Resolve a listen address. A bare ":port" binds every interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    addr.to_socket_addrs()
        .with_context(|| format!("Invalid listen address '{}'", addr))?
        .next()
        .ok_or_else(|| anyhow!("Listen address '{}' did not resolve", addr))
}

/// Build the primary and replica pools.
///
/// When both endpoints are "memory" they share one store.
pub fn build_pools(args: &ServeArgs) -> (ConnectionPool, ConnectionPool) {
    let options = PoolOptions {
        max_connections: args.max_connections,
        acquire_timeout: args.store_timeout.map(Duration::from_secs),
    };
    let memory = MemoryStore::new();

    let pool_for = |endpoint: &str| {
        if endpoint.eq_ignore_ascii_case(MEMORY_ENDPOINT) {
            ConnectionPool::new(MemoryConnector::new(memory.clone()), options.clone())
        } else {
            ConnectionPool::tcp(endpoint, options.clone())
        }
    };

    (pool_for(&args.redis), pool_for(&args.redis_replica))
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let bind_addr = parse_listen_addr(&args.server)?;
    let (primary, replica) = build_pools(&args);

    primary
        .ping()
        .await
        .with_context(|| format!("Primary store {} unreachable", args.redis))?;
    replica
        .ping()
        .await
        .with_context(|| format!("Replica store {} unreachable", args.redis_replica))?;
    tracing::debug!(primary = %args.redis, replica = %args.redis_replica, "store endpoints reachable");

    let state = AppState::new(primary, replica, args.error_policy);
    let config = ServerConfig {
        bind_addr,
        asset_dir: args.public,
        trace_requests: args.trace_key.is_some(),
    };

    // Run server (blocks until shutdown)
    run_server(state, config).await.context("Server error")?;

    Ok(())
}
