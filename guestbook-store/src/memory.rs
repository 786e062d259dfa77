//! In-process list store
//!
//! Understands the subset of commands the guestbook issues (RPUSH, LRANGE,
//! INFO, PING) with the same reply shapes a Redis server gives. Clones share
//! state, so one store can back both the primary and the replica pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::connection::{Connection, Connector};
use crate::error::{Result, StoreError};
use crate::resp::{Command, Frame};

const ENDPOINT: &str = "memory";

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    lists: Mutex<HashMap<Vec<u8>, Vec<Vec<u8>>>>,
    unavailable: AtomicBool,
    connections_opened: AtomicU64,
    commands_processed: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the endpoint going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        !self.inner.unavailable.load(Ordering::SeqCst)
    }

    /// Number of connections handed out so far
    pub fn connections_opened(&self) -> u64 {
        self.inner.connections_opened.load(Ordering::SeqCst)
    }

    /// Run a command given as raw name and arguments
    pub fn apply(&self, name: &[u8], args: &[Vec<u8>]) -> Frame {
        self.inner.commands_processed.fetch_add(1, Ordering::Relaxed);

        match name.to_ascii_uppercase().as_slice() {
            b"PING" => Frame::Simple("PONG".into()),
            b"RPUSH" => self.rpush(args),
            b"LRANGE" => self.lrange(args),
            b"INFO" => Frame::bulk(self.info()),
            other => Frame::Error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(other)
            )),
        }
    }

    pub fn dispatch(&self, command: &Command) -> Frame {
        self.apply(command.name().as_bytes(), command.args())
    }

    fn lists(&self) -> MutexGuard<'_, HashMap<Vec<u8>, Vec<Vec<u8>>>> {
        // A panic while holding the lock cannot leave a list half-written.
        self.inner
            .lists
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rpush(&self, args: &[Vec<u8>]) -> Frame {
        let Some((key, values)) = args.split_first().filter(|(_, v)| !v.is_empty()) else {
            return wrong_arity("rpush");
        };
        let mut lists = self.lists();
        let list = lists.entry(key.clone()).or_default();
        list.extend(values.iter().cloned());
        Frame::Integer(list.len() as i64)
    }

    fn lrange(&self, args: &[Vec<u8>]) -> Frame {
        let [key, start, stop] = args else {
            return wrong_arity("lrange");
        };
        let (Some(start), Some(stop)) = (parse_index(start), parse_index(stop)) else {
            return Frame::Error("ERR value is not an integer or out of range".into());
        };

        let lists = self.lists();
        let Some(list) = lists.get(key) else {
            return Frame::Array(Some(Vec::new()));
        };

        let items = range_bounds(list.len(), start, stop)
            .map(|(from, to)| list[from..=to].iter().cloned().map(Frame::bulk).collect())
            .unwrap_or_default();
        Frame::Array(Some(items))
    }

    fn info(&self) -> String {
        let lists = self.lists();
        let entries: usize = lists.values().map(Vec::len).sum();
        format!(
            "# Server\r\nredis_mode:memory\r\n\r\n# Stats\r\ntotal_connections_received:{}\r\ntotal_commands_processed:{}\r\n\r\n# Keyspace\r\nkeys:{}\r\nentries:{}\r\n",
            self.connections_opened(),
            self.inner.commands_processed.load(Ordering::Relaxed),
            lists.len(),
            entries,
        )
    }
}

fn wrong_arity(command: &str) -> Frame {
    Frame::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}

fn parse_index(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Resolve LRANGE indices (negative counts from the end) to an inclusive range.
fn range_bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Hands out connections to a shared `MemoryStore`
#[derive(Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        if !self.store.is_available() {
            return Err(StoreError::Connect {
                endpoint: ENDPOINT.into(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }
        self.store
            .inner
            .connections_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            store: self.store.clone(),
        }))
    }

    fn endpoint(&self) -> &str {
        ENDPOINT
    }
}

struct MemoryConnection {
    store: MemoryStore,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn execute(&mut self, command: &Command) -> Result<Frame> {
        if !self.store.is_available() {
            return Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into());
        }
        match self.store.dispatch(command) {
            Frame::Error(message) => Err(StoreError::Server { message }),
            frame => Ok(frame),
        }
    }
}
