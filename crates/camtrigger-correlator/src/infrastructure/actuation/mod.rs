//! Actuation infrastructure: signalling the automation hub.
//!
//! An actuation is a single, fire-and-forget request.  There is
//! no retry, backoff, or queueing at this layer: a retried request could
//! trigger a downstream device twice.  A failure is reported to the caller,
//! which logs it and drops the event.
//!
//! # Testability
//!
//! The [`Actuator`] trait lets the correlator be tested against
//! [`mock::RecordingActuator`] instead of a real hub.

use std::time::Duration;

use async_trait::async_trait;
use camtrigger_core::DeviceProfile;
use thiserror::Error;

pub mod http;
pub mod mock;

/// A single actuation call did not succeed.
///
/// Never fatal: the correlator logs it and continues with the next event.
#[derive(Debug, Error)]
pub enum ActuationError {
    /// The endpoint did not answer within the configured bound.
    #[error("actuation of target {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    /// The request could not be sent or the connection failed.
    #[error("actuation of target {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("actuation endpoint returned HTTP {status} for target {target}")]
    Status { target: String, status: u16 },

    /// The configured endpoint URL cannot be used.
    #[error("invalid actuation endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Issues one actuation call for a matched device.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Signals the hub that `profile` triggered.
    ///
    /// # Errors
    ///
    /// Returns [`ActuationError`] when the call fails or times out.
    async fn actuate(&self, profile: &DeviceProfile) -> Result<(), ActuationError>;
}
