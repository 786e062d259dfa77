//! RESP (REdis Serialization Protocol) framing
//!
//! Commands go out as arrays of bulk strings; replies come back as any frame
//! type. Only RESP2 is spoken.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StoreError};

/// Largest bulk string the store will send (matches the Redis proto-max-bulk-len default)
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// One protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string (`$-1`)
    Bulk(Option<Vec<u8>>),
    /// `None` is the null array (`*-1`)
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Append the wire encoding of this frame to `buf`
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Frame::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Frame::Integer(n) => {
                buf.extend_from_slice(format!(":{}\r\n", n).as_bytes());
            }
            Frame::Bulk(None) => buf.extend_from_slice(b"$-1\r\n"),
            Frame::Bulk(Some(data)) => {
                buf.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            Frame::Array(None) => buf.extend_from_slice(b"*-1\r\n"),
            Frame::Array(Some(items)) => {
                buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(buf);
                }
            }
        }
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Frame::Bulk(Some(data.into()))
    }
}

/// A store command: name plus binary-safe arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `RPUSH key value`
    pub fn rpush(key: &str, value: &str) -> Self {
        Self::new("RPUSH").arg(key).arg(value)
    }

    /// `LRANGE key start stop`
    pub fn lrange(key: &str, start: i64, stop: i64) -> Self {
        Self::new("LRANGE")
            .arg(key)
            .arg(start.to_string())
            .arg(stop.to_string())
    }

    /// `INFO`
    pub fn info() -> Self {
        Self::new("INFO")
    }

    /// `PING`
    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// The command as it travels on the wire
    pub fn to_frame(&self) -> Frame {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Frame::bulk(self.name));
        items.extend(self.args.iter().cloned().map(Frame::bulk));
        Frame::Array(Some(items))
    }
}

/// Encode and flush one frame
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    frame.encode(&mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode and flush one command
pub async fn write_command<W>(writer: &mut W, command: &Command) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &command.to_frame()).await
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    read_body(reader, line).await.map(Some)
}

type FrameFuture<'a> = Pin<Box<dyn Future<Output = Result<Frame>> + Send + 'a>>;

// Boxed so arrays can recurse into their elements.
fn read_body<'a, R>(reader: &'a mut R, line: Vec<u8>) -> FrameFuture<'a>
where
    R: AsyncBufRead + Unpin + Send,
{
    Box::pin(async move {
        let header = strip_crlf(&line)?;
        let (prefix, rest) = header
            .split_first()
            .ok_or_else(|| StoreError::protocol("empty frame header"))?;

        match prefix {
            b'+' => Ok(Frame::Simple(String::from_utf8_lossy(rest).into_owned())),
            b'-' => Ok(Frame::Error(String::from_utf8_lossy(rest).into_owned())),
            b':' => Ok(Frame::Integer(parse_int(rest)?)),
            b'$' => {
                let len = parse_int(rest)?;
                if len == -1 {
                    return Ok(Frame::Bulk(None));
                }
                if !(0..=MAX_BULK_LEN).contains(&len) {
                    return Err(StoreError::protocol(format!("invalid bulk length {}", len)));
                }
                let mut data = vec![0u8; len as usize + 2];
                reader.read_exact(&mut data).await?;
                if !data.ends_with(b"\r\n") {
                    return Err(StoreError::protocol("bulk string missing terminator"));
                }
                data.truncate(len as usize);
                Ok(Frame::Bulk(Some(data)))
            }
            b'*' => {
                let count = parse_int(rest)?;
                if count == -1 {
                    return Ok(Frame::Array(None));
                }
                if count < 0 {
                    return Err(StoreError::protocol(format!("invalid array length {}", count)));
                }
                let mut items = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    let mut line = Vec::new();
                    if reader.read_until(b'\n', &mut line).await? == 0 {
                        return Err(StoreError::protocol("connection closed inside array"));
                    }
                    items.push(read_body(reader, line).await?);
                }
                Ok(Frame::Array(Some(items)))
            }
            other => Err(StoreError::protocol(format!(
                "unknown frame prefix {:?}",
                *other as char
            ))),
        }
    })
}

fn strip_crlf(line: &[u8]) -> Result<&[u8]> {
    line.strip_suffix(b"\r\n")
        .ok_or_else(|| StoreError::protocol("frame header not terminated by CRLF"))
}

fn parse_int(digits: &[u8]) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            StoreError::protocol(format!(
                "invalid integer {:?}",
                String::from_utf8_lossy(digits)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn decode(bytes: &[u8]) -> Result<Option<Frame>> {
        let mut reader = BufReader::new(bytes);
        read_frame(&mut reader).await
    }

    #[test]
    fn command_encodes_as_bulk_array() {
        let mut buf = Vec::new();
        Command::rpush("greetings", "hello").to_frame().encode(&mut buf);
        assert_eq!(
            buf,
            b"*3\r\n$5\r\nRPUSH\r\n$9\r\ngreetings\r\n$5\r\nhello\r\n".to_vec()
        );
    }

    #[test]
    fn lrange_renders_negative_stop() {
        let cmd = Command::lrange("k", 0, -1);
        assert_eq!(cmd.name(), "LRANGE");
        assert_eq!(cmd.args()[2], b"-1".to_vec());
    }

    #[tokio::test]
    async fn decodes_scalar_frames() {
        assert_eq!(
            decode(b"+PONG\r\n").await.unwrap(),
            Some(Frame::Simple("PONG".into()))
        );
        assert_eq!(
            decode(b"-ERR wrong type\r\n").await.unwrap(),
            Some(Frame::Error("ERR wrong type".into()))
        );
        assert_eq!(decode(b":42\r\n").await.unwrap(), Some(Frame::Integer(42)));
        assert_eq!(decode(b"$-1\r\n").await.unwrap(), Some(Frame::Bulk(None)));
    }

    #[tokio::test]
    async fn decodes_nested_array() {
        let frame = decode(b"*2\r\n$5\r\nhello\r\n*1\r\n:1\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            frame,
            Frame::Array(Some(vec![
                Frame::bulk("hello"),
                Frame::Array(Some(vec![Frame::Integer(1)])),
            ]))
        );
    }

    #[tokio::test]
    async fn bulk_may_contain_crlf() {
        let frame = decode(b"$4\r\na\r\nb\r\n").await.unwrap().unwrap();
        assert_eq!(frame, Frame::bulk("a\r\nb"));
    }

    #[tokio::test]
    async fn clean_eof_is_none() {
        assert_eq!(decode(b"").await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_input_is_protocol_error() {
        assert!(matches!(
            decode(b"?what\r\n").await,
            Err(StoreError::Protocol { .. })
        ));
        assert!(matches!(
            decode(b":12\n").await,
            Err(StoreError::Protocol { .. })
        ));
        assert!(matches!(
            decode(b"*2\r\n:1\r\n").await,
            Err(StoreError::Protocol { .. })
        ));
    }
}
