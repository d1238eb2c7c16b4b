//! One-Shot TCP Transport
//!
//! Each exchange opens a fresh connection, writes one JSON message, half-closes
//! the write side and (for requests that expect a reply) reads one JSON message
//! back. Reads stop at end-of-stream or after `max_message_size` bytes, so an
//! oversized payload arrives truncated and fails to decode.

use super::types::{Request, Response};

use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cluster::config::DEFAULT_MAX_MESSAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound on bytes read for one message. Excess bytes are dropped.
    pub max_message_size: usize,
    /// Bound on a whole exchange (connect + send + receive). `None` waits forever.
    pub io_timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            io_timeout: None,
        }
    }
}

/// Failure on the initiating side of an exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect to {addr} failed: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("send to {addr} failed: {source}")]
    Send { addr: String, source: io::Error },

    #[error("receive from {addr} failed: {source}")]
    Receive { addr: String, source: io::Error },

    #[error("invalid response from {addr}: {source}")]
    Decode {
        addr: String,
        source: serde_json::Error,
    },

    #[error("exchange with {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
}

/// Failure while reading a request on the accepting side.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("connection closed before a request was sent")]
    Empty,

    #[error("failed to read request: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends `request` to `addr` and waits for the single response.
///
/// # Arguments
/// * `addr` - `host:port` of the receiving node.
/// * `request` - Written as one JSON message, followed by a half-close.
/// * `options` - Read limit and optional bound on the whole exchange.
///
/// # Returns
/// * `Ok(Response)` decoded from at most `max_message_size` bytes.
/// * `Err(TransportError)` naming the step that failed. Never panics.
pub async fn exchange(
    addr: &str,
    request: &Request,
    options: &TransportOptions,
) -> Result<Response, TransportError> {
    with_timeout(addr, options.io_timeout, async {
        let mut stream = connect(addr).await?;
        send(&mut stream, addr, request).await?;

        let bytes = read_bounded(&mut stream, options.max_message_size)
            .await
            .map_err(|source| TransportError::Receive {
                addr: addr.to_string(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| TransportError::Decode {
            addr: addr.to_string(),
            source,
        })
    })
    .await
}

/// Sends `request` to `addr` without reading any reply.
pub async fn notify(
    addr: &str,
    request: &Request,
    options: &TransportOptions,
) -> Result<(), TransportError> {
    with_timeout(addr, options.io_timeout, async {
        let mut stream = connect(addr).await?;
        send(&mut stream, addr, request).await
    })
    .await
}

/// Reads one request from an accepted connection.
pub async fn read_request<R>(reader: &mut R, max_message_size: usize) -> Result<Request, InboundError>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_bounded(reader, max_message_size).await?;
    if bytes.is_empty() {
        return Err(InboundError::Empty);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes the single response of an exchange and closes the write side.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(response).map_err(io::Error::other)?;
    writer.write_all(&payload).await?;
    writer.shutdown().await
}

async fn connect(addr: &str) -> Result<TcpStream, TransportError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        })
}

async fn send(stream: &mut TcpStream, addr: &str, request: &Request) -> Result<(), TransportError> {
    let to_send_error = |source: io::Error| TransportError::Send {
        addr: addr.to_string(),
        source,
    };

    let payload = serde_json::to_vec(request)
        .map_err(io::Error::other)
        .map_err(to_send_error)?;
    stream.write_all(&payload).await.map_err(to_send_error)?;
    stream.shutdown().await.map_err(to_send_error)
}

async fn read_bounded<R>(reader: &mut R, max_message_size: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(max_message_size as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(buf)
}

async fn with_timeout<T, F>(
    addr: &str,
    timeout: Option<Duration>,
    exchange: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match timeout {
        None => exchange.await,
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| TransportError::Timeout {
                addr: addr.to_string(),
                timeout: limit,
            })?,
    }
}
