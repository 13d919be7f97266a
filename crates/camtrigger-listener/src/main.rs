//! camtrigger listener: entry point.
//!
//! Accepts TCP connections on the monitored port, reads and discards what
//! peers send, and closes each connection at EOF or after it goes idle.
//!
//! # Usage
//!
//! ```text
//! camtrigger-listener [OPTIONS]
//!
//! Options:
//!   --bind         <IP>    Address to listen on [default: 0.0.0.0]
//!   --port         <PORT>  TCP port [default: 2525]
//!   --idle-timeout <SECS>  Close connections idle this long [default: 30]
//! ```
//!
//! | Variable                  | Default   |
//! |---------------------------|-----------|
//! | `CAMTRIGGER_LISTEN_BIND`  | `0.0.0.0` |
//! | `CAMTRIGGER_LISTEN_PORT`  | `2525`    |
//! | `CAMTRIGGER_IDLE_TIMEOUT` | `30`      |

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use camtrigger_listener::domain::ListenerConfig;
use camtrigger_listener::infrastructure::run_listener;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Companion TCP listener for the camtrigger correlator.
#[derive(Debug, Parser)]
#[command(
    name = "camtrigger-listener",
    about = "Accepts and drains TCP connections on the monitored port",
    version
)]
struct Cli {
    /// IP address to bind to; `0.0.0.0` accepts on every interface.
    #[arg(long, default_value = "0.0.0.0", env = "CAMTRIGGER_LISTEN_BIND")]
    bind: String,

    /// TCP port to listen on.  Must match the correlator's monitored port.
    #[arg(long, default_value_t = 2525, env = "CAMTRIGGER_LISTEN_PORT")]
    port: u16,

    /// Seconds without incoming data before a connection is closed.  At least 1.
    #[arg(
        long,
        default_value_t = 30,
        env = "CAMTRIGGER_IDLE_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    idle_timeout: u64,
}

impl Cli {
    /// Converts the parsed arguments into a [`ListenerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or the idle timeout
    /// is zero.
    fn into_listener_config(self) -> anyhow::Result<ListenerConfig> {
        anyhow::ensure!(self.idle_timeout > 0, "idle timeout must be at least 1 second");

        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        Ok(ListenerConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            idle_timeout: Duration::from_secs(self.idle_timeout),
            ..ListenerConfig::default()
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_listener_config()?;

    info!(
        "camtrigger listener starting: bind={}, idle_timeout={:?}",
        config.bind_addr, config.idle_timeout
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let bind_addr = config.bind_addr;
    run_listener(config, running)
        .await
        .with_context(|| format!("listener on {bind_addr} could not start"))?;

    info!("camtrigger listener stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
