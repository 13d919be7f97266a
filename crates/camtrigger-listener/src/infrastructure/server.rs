//! TCP accept loop and per-connection draining.
//!
//! Connection lifecycle:
//!
//! ```text
//! Listening ──accept──► Accepted ──spawn──► Draining ──EOF / error / idle──► Closed
//! ```
//!
//! Each accepted connection gets its own Tokio task, so a peer that stays
//! silent only ties up its own task until the idle bound elapses.  The accept
//! loop itself never awaits a connection's I/O.
//!
//! Shutdown is cooperative: `serve` polls the shared `running` flag every
//! 200 ms.  Connections still draining at that point are left to finish on
//! their own tasks.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::config::ListenerConfig;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// The listening socket could not be created.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address is in use, not local, or needs privileges.
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Why draining a connection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// The peer closed its side (read returned 0).
    PeerClosed,
    /// No bytes arrived within the idle bound.
    IdleTimeout,
    /// The read failed (reset, aborted, ...).
    ReadError,
}

/// Summary of one drained connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub bytes_discarded: u64,
    pub end: DrainEnd,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds a TCP listener on `addr`.
///
/// # Errors
///
/// Returns [`ListenerError::Bind`] if the port is already in use or the
/// process may not bind it.
pub async fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })
}

/// Runs the accept loop on `listener` until `running` is set to `false`.
pub async fn serve(
    listener: TcpListener,
    config: Arc<ListenerConfig>,
    running: Arc<AtomicBool>,
) {
    match listener.local_addr() {
        Ok(addr) => info!("listening on {addr}"),
        Err(e) => warn!("listening on an unknown address: {e}"),
    }

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("accepted connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. EMFILE); keep accepting.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection in the last poll window.
            }
        }
    }
}

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns [`ListenerError::Bind`] when the address cannot be bound.
pub async fn run_listener(
    config: ListenerConfig,
    running: Arc<AtomicBool>,
) -> Result<(), ListenerError> {
    let listener = bind_listener(config.bind_addr).await?;
    serve(listener, Arc::new(config), running).await;
    Ok(())
}

/// Reads from `stream` into a discard buffer until the peer closes, a read
/// fails, or nothing arrives for `idle_timeout`.
///
/// Never writes to the stream.
pub async fn drain_connection<S>(
    stream: &mut S,
    idle_timeout: Duration,
    buffer_size: usize,
) -> DrainReport
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut bytes_discarded = 0u64;

    let end = loop {
        match timeout(idle_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break DrainEnd::PeerClosed,
            Ok(Ok(n)) => bytes_discarded += n as u64,
            Ok(Err(e)) => {
                debug!("read error while draining: {e}");
                break DrainEnd::ReadError;
            }
            Err(_) => break DrainEnd::IdleTimeout,
        }
    };

    DrainReport {
        bytes_discarded,
        end,
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ListenerConfig>,
) {
    let report = drain_connection(&mut stream, config.idle_timeout, config.read_buffer_size).await;

    match report.end {
        DrainEnd::PeerClosed => debug!(
            "connection from {peer_addr} closed by peer after {} byte(s)",
            report.bytes_discarded
        ),
        DrainEnd::IdleTimeout => debug!(
            "connection from {peer_addr} idle for {:?}; closing after {} byte(s)",
            config.idle_timeout, report.bytes_discarded
        ),
        DrainEnd::ReadError => debug!(
            "connection from {peer_addr} failed after {} byte(s)",
            report.bytes_discarded
        ),
    }
    // Dropping the stream closes the socket.
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_drain_counts_bytes_until_peer_closes() {
        // Arrange
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"HELO camera\r\n").await.unwrap();
        drop(client);

        // Act
        let report = drain_connection(&mut server, Duration::from_secs(1), 4).await;

        // Assert
        assert_eq!(report.end, DrainEnd::PeerClosed);
        assert_eq!(report.bytes_discarded, 13);
    }

    #[tokio::test]
    async fn test_drain_stops_after_idle_timeout() {
        let (_client, mut server) = tokio::io::duplex(64);

        let report = drain_connection(&mut server, Duration::from_millis(50), 1024).await;

        assert_eq!(report.end, DrainEnd::IdleTimeout);
        assert_eq!(report.bytes_discarded, 0);
    }

    #[tokio::test]
    async fn test_idle_bound_resets_on_each_read() {
        // Arrange: send in three bursts, each within the idle bound
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for _ in 0..3 {
                client.write_all(b"abcd").await.unwrap();
                tokio::time::sleep(Duration::from_millis(60)).await;
            }
        });

        // Act
        let report = drain_connection(&mut server, Duration::from_millis(150), 1024).await;
        writer.await.unwrap();

        // Assert: all bursts counted; the writer's drop ends the drain
        assert_eq!(report.bytes_discarded, 12);
        assert_eq!(report.end, DrainEnd::PeerClosed);
    }

    #[tokio::test]
    async fn test_bind_listener_reports_address_in_use() {
        // Arrange: occupy a port
        let first = bind_listener("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = first.local_addr().unwrap();

        // Act
        let result = bind_listener(addr).await;

        // Assert
        assert!(matches!(result, Err(ListenerError::Bind { addr: a, .. }) if a == addr));
    }
}
