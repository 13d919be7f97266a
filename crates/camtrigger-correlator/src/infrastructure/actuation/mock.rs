//! Recording actuator for unit and integration testing.
//!
//! Records every target id it is asked to actuate, can be told to fail for
//! specific targets, and tracks how many calls were ever in flight at once so
//! tests can assert that actuations never overlap.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use camtrigger_core::DeviceProfile;

use super::{ActuationError, Actuator};

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A mock implementation of [`Actuator`] that records calls.
///
/// Cloning shares the recording, so a test can keep one handle while the
/// correlator owns another.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    shared: Arc<Shared>,
    delay: Option<Duration>,
}

impl RecordingActuator {
    /// Creates an actuator that succeeds immediately for every target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call take `delay` before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes calls for `target` fail with HTTP 503.
    pub fn fail_target(&self, target: impl Into<String>) {
        self.shared
            .failing
            .lock()
            .expect("lock poisoned")
            .insert(target.into());
    }

    /// Target ids actuated so far, in call order (failed calls included).
    pub fn calls(&self) -> Vec<String> {
        self.shared.calls.lock().expect("lock poisoned").clone()
    }

    /// The largest number of calls that were running concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn actuate(&self, profile: &DeviceProfile) -> Result<(), ActuationError> {
        let target = profile.actuation_target_id.clone();
        self.shared
            .calls
            .lock()
            .expect("lock poisoned")
            .push(target.clone());

        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fails = self
            .shared
            .failing
            .lock()
            .expect("lock poisoned")
            .contains(&target);
        if fails {
            return Err(ActuationError::Status {
                target,
                status: 503,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camtrigger_core::HardwareId;

    fn profile(target: &str) -> DeviceProfile {
        DeviceProfile::new("cam", HardwareId::new([1; 6]), target)
    }

    #[tokio::test]
    async fn test_recording_actuator_records_targets() {
        let actuator = RecordingActuator::new();

        actuator.actuate(&profile("101")).await.unwrap();
        actuator.actuate(&profile("102")).await.unwrap();

        assert_eq!(actuator.calls(), vec!["101", "102"]);
        assert_eq!(actuator.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_failing_target_returns_status_error_but_is_recorded() {
        let actuator = RecordingActuator::new();
        actuator.fail_target("101");

        let result = actuator.actuate(&profile("101")).await;

        assert!(matches!(
            result,
            Err(ActuationError::Status { status: 503, .. })
        ));
        assert_eq!(actuator.calls(), vec!["101"]);
    }

    #[test]
    fn test_clones_share_recording() {
        let actuator = RecordingActuator::new();
        let handle = actuator.clone();

        tokio_test::assert_ok!(tokio_test::block_on(actuator.actuate(&profile("5"))));

        assert_eq!(handle.calls(), vec!["5"]);
    }
}
