//! Scripted packet source for unit and integration testing.
//!
//! Plays back a fixed sequence of captured events, idle periods, and
//! failures without needing a network interface or libpcap.

use std::collections::VecDeque;
use std::time::Duration;

use camtrigger_core::CapturedEvent;

use super::{CaptureError, PacketSource};

/// How long an idle step (or an exhausted script) blocks.
const IDLE_STEP: Duration = Duration::from_millis(5);

enum Step {
    Event(CapturedEvent),
    Idle,
    Fail(String),
}

/// A [`PacketSource`] that replays a script.
///
/// Once the script is exhausted it behaves like a quiet interface: every call
/// blocks briefly and returns `Ok(None)`.
pub struct ScriptedSource {
    name: String,
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    /// Creates an empty script labelled `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: VecDeque::new(),
        }
    }

    /// Appends one observed event.
    pub fn then_event(mut self, event: CapturedEvent) -> Self {
        self.steps.push_back(Step::Event(event));
        self
    }

    /// Appends several observed events.
    pub fn then_events(mut self, events: impl IntoIterator<Item = CapturedEvent>) -> Self {
        self.steps.extend(events.into_iter().map(Step::Event));
        self
    }

    /// Appends one idle-timeout period.
    pub fn then_idle(mut self) -> Self {
        self.steps.push_back(Step::Idle);
        self
    }

    /// Appends a capture failure with the given reason.
    pub fn then_failure(mut self, reason: impl Into<String>) -> Self {
        self.steps.push_back(Step::Fail(reason.into()));
        self
    }

    /// Number of steps not yet played back.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl PacketSource for ScriptedSource {
    fn describe(&self) -> String {
        format!("scripted source '{}'", self.name)
    }

    fn observe_next(&mut self) -> Result<Option<CapturedEvent>, CaptureError> {
        match self.steps.pop_front() {
            Some(Step::Event(event)) => Ok(Some(event)),
            Some(Step::Fail(reason)) => Err(CaptureError::Lost {
                interface: self.name.clone(),
                reason,
            }),
            Some(Step::Idle) | None => {
                std::thread::sleep(IDLE_STEP);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_source_plays_steps_in_order() {
        // Arrange
        let mut source = ScriptedSource::new("eth9")
            .then_event(CapturedEvent::with_hardware_field("a", 1))
            .then_idle()
            .then_failure("boom");

        // Act / Assert
        assert_eq!(source.remaining(), 3);
        assert_eq!(
            source.observe_next().unwrap().unwrap().hardware_field,
            "a"
        );
        assert!(source.observe_next().unwrap().is_none());
        assert!(matches!(
            source.observe_next(),
            Err(CaptureError::Lost { ref reason, .. }) if reason == "boom"
        ));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_exhausted_script_reports_idle() {
        let mut source = ScriptedSource::new("eth9");
        assert!(source.observe_next().unwrap().is_none());
        assert!(source.observe_next().unwrap().is_none());
    }

    #[test]
    fn test_describe_includes_name() {
        assert!(ScriptedSource::new("eth9").describe().contains("eth9"));
    }
}
