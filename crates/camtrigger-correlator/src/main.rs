//! camtrigger correlator: entry point.
//!
//! Watches one TCP port for connection attempts (SYN packets), matches the
//! sender's hardware address against the configured device registry, and
//! fires one hub actuation per match.
//!
//! # Usage
//!
//! ```text
//! camtrigger-correlator [OPTIONS]
//!
//! Options:
//!   --config    <PATH>  TOML configuration file [default: camtrigger.toml]
//!   --interface <NAME>  Override [capture].interface
//!   --port      <PORT>  Override [capture].port
//! ```
//!
//! | Variable               | Description                          |
//! |------------------------|--------------------------------------|
//! | `CAMTRIGGER_CONFIG`    | Path to the configuration file       |
//! | `CAMTRIGGER_INTERFACE` | Capture interface override           |
//! | `CAMTRIGGER_PORT`      | Monitored port override              |
//! | `RUST_LOG`             | Log filter; wins over `log_level`    |
//!
//! Live capture needs the privileges to open the interface (root or
//! `CAP_NET_RAW`).  A build with `--no-default-features` drops libpcap and
//! refuses to start capture.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camtrigger_correlator::application::correlate::TriggerCorrelator;
use camtrigger_correlator::infrastructure::actuation::http::HubActuator;
use camtrigger_correlator::infrastructure::capture::{CaptureError, CaptureItem};
use camtrigger_correlator::infrastructure::storage::config::{load_config, AppConfig, CaptureConfig};
use tokio::sync::mpsc;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Passive SYN watcher that triggers hub actuations for registered devices.
#[derive(Debug, Parser)]
#[command(
    name = "camtrigger-correlator",
    about = "Triggers a hub actuation when a registered device opens a TCP connection",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "camtrigger.toml", env = "CAMTRIGGER_CONFIG")]
    config: PathBuf,

    /// Capture interface; overrides `[capture].interface`.
    #[arg(long, env = "CAMTRIGGER_INTERFACE")]
    interface: Option<String>,

    /// Monitored TCP port; overrides `[capture].port`.
    #[arg(long, env = "CAMTRIGGER_PORT")]
    port: Option<u16>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded file.
    fn apply_overrides(&self, cfg: &mut AppConfig) {
        if let Some(interface) = &self.interface {
            cfg.capture.interface = interface.clone();
        }
        if let Some(port) = self.port {
            cfg.capture.port = port;
        }
    }
}

// ── Capture startup ───────────────────────────────────────────────────────────

#[cfg(feature = "live-capture")]
fn start_capture(
    config: &CaptureConfig,
    running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<CaptureItem>, CaptureError> {
    use camtrigger_correlator::infrastructure::capture::{live::PcapSource, spawn_capture_thread};

    let source = PcapSource::open(config)?;
    spawn_capture_thread(source, config.queue_capacity, running)
}

#[cfg(not(feature = "live-capture"))]
fn start_capture(
    config: &CaptureConfig,
    _running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<CaptureItem>, CaptureError> {
    Err(CaptureError::NotCompiled {
        interface: config.interface.clone(),
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    cli.apply_overrides(&mut cfg);

    // RUST_LOG wins; otherwise use the level from the config file.
    let fallback = cfg.service.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();

    let registry = Arc::new(cfg.registry().context("invalid [devices] configuration")?);
    if registry.is_empty() {
        warn!("device registry is empty; no event will ever trigger an actuation");
    }
    for profile in registry.iter() {
        info!(
            "registered device '{}' ({}) → target {}",
            profile.name, profile.hardware_id, profile.actuation_target_id
        );
    }

    let actuator = HubActuator::new(
        &cfg.actuation.base_url,
        cfg.actuation.access_token.clone(),
        cfg.actuation.command.clone(),
        cfg.actuation.timeout(),
    )
    .context("invalid [actuation] configuration")?;

    info!(
        "camtrigger correlator starting: interface={}, port={}",
        cfg.capture.interface, cfg.capture.port
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
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

    let events = start_capture(&cfg.capture, Arc::clone(&running))
        .context("failed to start packet capture")?;

    let mut correlator = TriggerCorrelator::new(registry, actuator);
    let stats = correlator
        .run(events, running)
        .await
        .context("packet capture stopped unexpectedly")?;

    info!(
        "camtrigger correlator stopped: observed={}, unmatched={}, actuated={}, failed={}",
        stats.observed, stats.unmatched, stats.actuated, stats.failed
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[actuation]
base_url = "http://hub.local/apps/api/9/devices"
access_token = "t"
"#;

    #[test]
    fn test_cli_default_config_path() {
        // Arrange: no arguments
        let cli = Cli::parse_from(["camtrigger-correlator"]);

        // Assert
        assert_eq!(cli.config, PathBuf::from("camtrigger.toml"));
        assert!(cli.interface.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_cli_config_override() {
        let cli = Cli::parse_from(["camtrigger-correlator", "--config", "/etc/camtrigger.toml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/camtrigger.toml"));
    }

    #[test]
    fn test_overrides_replace_capture_settings() {
        // Arrange
        let cli = Cli::parse_from([
            "camtrigger-correlator",
            "--interface",
            "eth1",
            "--port",
            "2600",
        ]);
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();

        // Act
        cli.apply_overrides(&mut cfg);

        // Assert
        assert_eq!(cfg.capture.interface, "eth1");
        assert_eq!(cfg.capture.port, 2600);
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let cli = Cli::parse_from(["camtrigger-correlator"]);
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();

        cli.apply_overrides(&mut cfg);

        assert_eq!(cfg.capture.interface, "any");
        assert_eq!(cfg.capture.port, 2525);
    }

    #[cfg(not(feature = "live-capture"))]
    #[test]
    fn test_start_capture_without_feature_reports_not_compiled() {
        let result = start_capture(&CaptureConfig::default(), Arc::new(AtomicBool::new(true)));
        assert!(matches!(result, Err(CaptureError::NotCompiled { .. })));
    }
}
