//! Packet capture infrastructure.
//!
//! libpcap reads are blocking calls, so the capture facility runs on a
//! dedicated OS thread (`camtrigger-capture`) rather than inside the Tokio
//! runtime.  Each observed SYN is pushed into a bounded channel that the
//! correlator consumes one event at a time.
//!
//! ```text
//! ┌───────────────────────┐  bounded mpsc   ┌──────────────────────────┐
//! │ capture thread        │ ──────────────► │ TriggerCorrelator::run   │
//! │ PacketSource::observe │  Result<Event>  │ match → actuate (async)  │
//! └───────────────────────┘                 └──────────────────────────┘
//! ```
//!
//! When the channel is full the capture thread blocks, which throttles
//! observation instead of dropping or reordering events.
//!
//! # Testability
//!
//! The [`PacketSource`] trait lets tests drive the pipeline with
//! [`mock::ScriptedSource`] instead of a live interface.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use camtrigger_core::CapturedEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub mod mock;

#[cfg(feature = "live-capture")]
pub mod live;

/// The capture facility cannot be opened or died mid-run.
///
/// Every variant is fatal for the correlator.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The interface could not be opened or the filter could not be applied.
    #[error("capture unavailable on interface '{interface}': {reason}")]
    Unavailable { interface: String, reason: String },

    /// The interface uses a link layer the frame decoder does not support.
    #[error("interface '{interface}' has unsupported link type {dlt}")]
    UnsupportedLinkType { interface: String, dlt: i32 },

    /// A capture that was running stopped delivering packets.
    #[error("capture on interface '{interface}' failed: {reason}")]
    Lost { interface: String, reason: String },

    /// The binary was built without libpcap support.
    #[error("cannot capture on interface '{interface}': built without the `live-capture` feature")]
    NotCompiled { interface: String },
}

/// What the capture thread hands to the correlator.
pub type CaptureItem = Result<CapturedEvent, CaptureError>;

/// A blocking source of connection-initiation events.
pub trait PacketSource: Send {
    /// Name of the interface (or script) being observed, for log messages.
    fn describe(&self) -> String;

    /// Blocks until one SYN to the monitored port is seen (`Ok(Some)`) or the
    /// source's idle bound elapses (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when the facility fails; callers treat this as
    /// fatal.
    fn observe_next(&mut self) -> Result<Option<CapturedEvent>, CaptureError>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn observe_next(&mut self) -> Result<Option<CapturedEvent>, CaptureError> {
        (**self).observe_next()
    }
}

/// Moves `source` onto a dedicated thread and returns the receiving end of
/// its event channel.
///
/// The thread exits when `running` is cleared, when the receiver is dropped,
/// or after forwarding a [`CaptureError`] (the last item it ever sends).
///
/// # Errors
///
/// Returns [`CaptureError::Unavailable`] if the OS refuses to spawn the thread.
pub fn spawn_capture_thread<S>(
    mut source: S,
    queue_capacity: usize,
    running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<CaptureItem>, CaptureError>
where
    S: PacketSource + 'static,
{
    let interface = source.describe();
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));

    std::thread::Builder::new()
        .name("camtrigger-capture".to_string())
        .spawn(move || {
            let name = source.describe();
            info!("capture loop started on {name}");

            while running.load(Ordering::Relaxed) {
                match source.observe_next() {
                    Ok(Some(event)) => {
                        debug!(
                            "SYN from {} ({:?}) to port {}",
                            event.hardware_field, event.source_ip, event.destination_port
                        );
                        if tx.blocking_send(Ok(event)).is_err() {
                            debug!("event receiver dropped; stopping capture loop");
                            break;
                        }
                    }
                    Ok(None) => {
                        // Idle bound elapsed; re-check the shutdown flag.
                    }
                    Err(e) => {
                        error!("{e}");
                        let _ = tx.blocking_send(Err(e));
                        break;
                    }
                }
            }

            info!("capture loop on {name} stopped");
        })
        .map_err(|e| CaptureError::Unavailable {
            interface,
            reason: format!("failed to spawn capture thread: {e}"),
        })?;

    Ok(rx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
