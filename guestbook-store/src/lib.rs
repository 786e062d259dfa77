//! guestbook-store: pooled access to an ordered-list key-value store
//!
//! Speaks RESP to a Redis-compatible endpoint, or runs against an in-process
//! store with the same reply shapes.

pub mod connection;
pub mod error;
pub mod list;
pub mod memory;
pub mod pool;
pub mod resp;

pub use connection::{Connection, Connector, TcpConnector};
pub use error::{Result, StoreError};
pub use list::ListStore;
pub use memory::{MemoryConnector, MemoryStore};
pub use pool::{ConnectionPool, PoolOptions, PoolStats, DEFAULT_MAX_CONNECTIONS};
pub use resp::{Command, Frame};
