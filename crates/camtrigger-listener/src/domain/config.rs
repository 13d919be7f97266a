//! Listener configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// All runtime settings for the companion listener.
///
/// ```rust
/// use camtrigger_listener::domain::ListenerConfig;
///
/// let cfg = ListenerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 2525);
/// ```
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address and port to accept connections on.
    ///
    /// The port must be the one the correlator monitors.
    pub bind_addr: SocketAddr,

    /// A connection with no incoming bytes for this long is closed.
    pub idle_timeout: Duration,

    /// Size of the per-connection discard buffer.
    pub read_buffer_size: usize,
}

impl Default for ListenerConfig {
    /// | Field            | Default        |
    /// |------------------|----------------|
    /// | bind_addr        | `0.0.0.0:2525` |
    /// | idle_timeout     | 30 seconds     |
    /// | read_buffer_size | 1024 bytes     |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 2525)),
            idle_timeout: Duration::from_secs(30),
            read_buffer_size: 1024,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
