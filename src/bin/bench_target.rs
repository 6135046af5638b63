//! Minimal local target for smoke runs: answers every connection with a
//! fixed-size body and closes.
//!
//! Usage: bench_target [PORT] [BODY_BYTES]

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("bench_target=info")
        .init();

    let mut args = std::env::args().skip(1);
    let port: u16 = args.next().and_then(|p| p.parse().ok()).unwrap_or(3000);
    let body_len: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(100);

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Target listening on port {}, {} byte responses", port, body_len);

    let body = vec![b'x'; body_len];
    let response = format!(
        "HTTP/1.0 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body_len
    );
    let response: std::sync::Arc<[u8]> = [response.as_bytes(), &body[..]].concat().into();

    loop {
        let (socket, addr) = listener.accept().await?;
        let response = response.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, &response).await {
                debug!("Error handling client {}: {}", addr, e);
            }
        });
    }
}

/// Reads until the end of the request head (or EOF for half-closed HTTP/0.9
/// clients), then writes the canned response.
async fn handle_client(mut socket: TcpStream, response: &[u8]) -> Result<()> {
    let mut buf = vec![0u8; 1024];
    let mut seen = Vec::new();

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        seen.extend_from_slice(&buf[..n]);
        if seen.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    socket.write_all(response).await?;
    socket.shutdown().await?;
    Ok(())
}
