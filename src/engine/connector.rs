use socket2::SockRef;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpStream, lookup_host};
use tokio::time;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} has no address")]
    NoAddress(String),
    #[error("timed out connecting to {0}")]
    Timeout(String),
    #[error("connect to {addr} failed: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Opens a single TCP connection to `host:port`. One try only: no retry and
/// no backoff happen here. Name resolution and the handshake together are
/// bounded by `timeout`.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ConnectError> {
    match time::timeout(timeout, open(host, port)).await {
        Ok(result) => result,
        Err(_) => Err(ConnectError::Timeout(format!("{}:{}", host, port))),
    }
}

async fn open(host: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let addr = resolve(host, port).await?;
    trace!("Connecting to {}", addr);

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ConnectError::Io { addr, source })?;
    stream
        .set_nodelay(true)
        .map_err(|source| ConnectError::Io { addr, source })?;

    Ok(stream)
}

/// First address the resolver returns for `host`.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ConnectError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|source| ConnectError::Resolve {
            host: host.to_string(),
            source,
        })?;
    addrs
        .next()
        .ok_or_else(|| ConnectError::NoAddress(host.to_string()))
}

/// Shuts down the send direction, leaving the receive side open.
pub fn half_close(stream: &TcpStream) -> io::Result<()> {
    SockRef::from(stream).shutdown(Shutdown::Write)
}

/// Releases the connection, surfacing any error still pending on the socket.
pub fn close(stream: TcpStream) -> io::Result<()> {
    let pending = SockRef::from(&stream).take_error()?;
    drop(stream);
    match pending {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
