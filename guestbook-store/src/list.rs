//! List repository
//!
//! Append-only ordered lists keyed by string. Which pool a `ListStore` wraps
//! decides where the command lands: writers wrap the primary pool, readers
//! the replica pool.

use crate::error::{Result, StoreError};
use crate::pool::ConnectionPool;
use crate::resp::{Command, Frame};

/// List repository over one pool
pub struct ListStore<'a> {
    pool: &'a ConnectionPool,
}

impl<'a> ListStore<'a> {
    pub fn new(pool: &'a ConnectionPool) -> Self {
        Self { pool }
    }

    /// Append one entry to the tail of `key`.
    pub async fn append_entry(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.execute(&Command::rpush(key, value)).await? {
            Frame::Integer(len) => {
                tracing::debug!(key, len, "appended entry");
                Ok(())
            }
            other => Err(StoreError::unexpected("RPUSH", other)),
        }
    }

    /// All entries of `key`, oldest first. A key that was never written is an
    /// empty list.
    pub async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        let items = match self.pool.execute(&Command::lrange(key, 0, -1)).await? {
            Frame::Array(Some(items)) => items,
            Frame::Array(None) => return Ok(Vec::new()),
            other => return Err(StoreError::unexpected("LRANGE", other)),
        };

        let mut raw = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Frame::Bulk(Some(data)) => raw.push(data),
                other => return Err(StoreError::unexpected("LRANGE", other)),
            }
        }
        decode_entries(key, raw)
    }
}

fn decode_entries(key: &str, raw: Vec<Vec<u8>>) -> Result<Vec<String>> {
    let mut entries = Vec::with_capacity(raw.len());
    for (i, data) in raw.iter().enumerate() {
        match std::str::from_utf8(data) {
            Ok(s) => entries.push(s.to_owned()),
            Err(_) => {
                let lossy = raw
                    .iter()
                    .map(|d| String::from_utf8_lossy(d).into_owned())
                    .collect();
                tracing::debug!(key, index = i, "list entry is not valid UTF-8");
                return Err(StoreError::Encoding {
                    key: key.to_string(),
                    lossy,
                });
            }
        }
    }
    Ok(entries)
}
