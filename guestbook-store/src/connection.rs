//! Connection seam between the pool and a concrete backend
//!
//! The pool only ever sees `Box<dyn Connection>` produced by a `Connector`,
//! so the TCP backend and the in-memory backend are interchangeable.

use async_trait::async_trait;
use tokio::io::BufStream;
use tokio::net::TcpStream;

use crate::error::{Result, StoreError};
use crate::resp::{self, Command, Frame};

/// One live connection to a store endpoint
#[async_trait]
pub trait Connection: Send {
    /// Run one command and return its reply.
    ///
    /// An error reply from the store is returned as `StoreError::Server`.
    async fn execute(&mut self, command: &Command) -> Result<Frame>;
}

/// Factory for connections to one endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Human-readable endpoint, used in logs and errors
    fn endpoint(&self) -> &str;
}

/// Connects to a Redis-protocol server over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| StoreError::Connect {
                endpoint: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        tracing::debug!(endpoint = %self.addr, "opened store connection");

        Ok(Box::new(TcpConnection {
            stream: BufStream::new(stream),
        }))
    }

    fn endpoint(&self) -> &str {
        &self.addr
    }
}

/// RESP over a buffered TCP stream
struct TcpConnection {
    stream: BufStream<TcpStream>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn execute(&mut self, command: &Command) -> Result<Frame> {
        resp::write_command(&mut self.stream, command).await?;

        match resp::read_frame(&mut self.stream).await? {
            Some(Frame::Error(message)) => Err(StoreError::Server { message }),
            Some(frame) => Ok(frame),
            None => Err(StoreError::protocol(format!(
                "connection closed before reply to {}",
                command.name()
            ))),
        }
    }
}
