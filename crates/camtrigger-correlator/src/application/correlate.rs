//! TriggerCorrelator: observe → match → actuate.
//!
//! Every captured SYN goes through the same three steps:
//!
//! ```text
//! CapturedEvent ──► registry.match_event ──► none ──► ignored (no-op)
//!                                        └─► profile ──► actuator.actuate
//!                                                         ├─ Ok  → Actuated
//!                                                         └─ Err → Failed (logged, dropped)
//! ```
//!
//! # Ordering
//!
//! Events are processed strictly in the order the capture thread observed
//! them, and the actuation for event N completes (successfully or not) before
//! event N+1 is matched.  Actuation calls therefore never overlap.  A slow hub
//! delays matching of later events; the bounded queue in front of the
//! correlator absorbs short bursts while observation continues.
//!
//! # Failure policy
//!
//! - No registry match: silently ignored.
//! - Actuation failure: logged at `warn`, the event is dropped, no retry.
//! - Capture failure: returned to the caller, which stops the service.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use camtrigger_core::{CapturedEvent, DeviceRegistry};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::infrastructure::actuation::{ActuationError, Actuator};
use crate::infrastructure::capture::{CaptureError, CaptureItem};

/// How often the run loop re-checks the shutdown flag while idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// What happened to one captured event.
#[derive(Debug)]
pub enum EventOutcome {
    /// No registered device matched the event.
    Unmatched,
    /// The matched device's target was actuated.
    Actuated { device: String, target: String },
    /// The actuation call failed; the event is dropped.
    Failed {
        device: String,
        target: String,
        error: ActuationError,
    },
}

/// Running totals, logged when the correlator stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    pub observed: u64,
    pub unmatched: u64,
    pub actuated: u64,
    pub failed: u64,
}

/// Converts captured events into at most one actuation each.
pub struct TriggerCorrelator<A> {
    registry: Arc<DeviceRegistry>,
    actuator: A,
    stats: CorrelatorStats,
}

impl<A: Actuator> TriggerCorrelator<A> {
    pub fn new(registry: Arc<DeviceRegistry>, actuator: A) -> Self {
        Self {
            registry,
            actuator,
            stats: CorrelatorStats::default(),
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    /// Matches one event and, on a hit, issues exactly one actuation.
    pub async fn process(&mut self, event: &CapturedEvent) -> EventOutcome {
        self.stats.observed += 1;

        let registry = Arc::clone(&self.registry);
        let Some(profile) = registry.match_event(event) else {
            self.stats.unmatched += 1;
            debug!("no registered device for {}", event.hardware_field);
            return EventOutcome::Unmatched;
        };

        let device = profile.name.clone();
        let target = profile.actuation_target_id.clone();

        match self.actuator.actuate(profile).await {
            Ok(()) => {
                self.stats.actuated += 1;
                info!("device '{device}' triggered; actuated target {target}");
                EventOutcome::Actuated { device, target }
            }
            Err(error) => {
                self.stats.failed += 1;
                warn!("device '{device}' triggered but actuation failed: {error}");
                EventOutcome::Failed {
                    device,
                    target,
                    error,
                }
            }
        }
    }

    /// Consumes events until the channel closes or `running` is cleared.
    ///
    /// # Errors
    ///
    /// Returns the [`CaptureError`] forwarded by the capture thread; the
    /// caller should treat it as fatal.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<CaptureItem>,
        running: Arc<AtomicBool>,
    ) -> Result<CorrelatorStats, CaptureError> {
        info!(
            "correlator started with {} registered device(s)",
            self.registry.len()
        );

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping correlator");
                break;
            }

            match timeout(SHUTDOWN_POLL, events.recv()).await {
                Ok(Some(Ok(event))) => {
                    self.process(&event).await;
                }
                Ok(Some(Err(e))) => return Err(e),
                Ok(None) => {
                    debug!("capture channel closed");
                    break;
                }
                Err(_) => {
                    // No event within the poll window; re-check the flag.
                }
            }
        }

        Ok(self.stats)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
