//! HTTP actuator for a Hubitat-style Maker API.
//!
//! Each actuation is one GET request:
//!
//! ```text
//! {base_url}/{target_id}/{command}?access_token={token}
//! e.g. http://hub.local/apps/api/9/devices/101/on?access_token=abcd
//! ```
//!
//! The response body is ignored; only the status code matters.  The access
//! token is part of the query string, so request URLs are never logged.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use camtrigger_core::DeviceProfile;
use reqwest::{Client, Url};
use tracing::debug;

use super::{ActuationError, Actuator};

/// Calls the hub's device command endpoint over HTTP(S).
#[derive(Clone)]
pub struct HubActuator {
    client: Client,
    base_url: Url,
    access_token: String,
    command: String,
    timeout: Duration,
}

// Hand-written so the access token never reaches a log line.
impl fmt::Debug for HubActuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubActuator")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"<redacted>")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HubActuator {
    /// Creates an actuator for the endpoint rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ActuationError::InvalidEndpoint`] if `base_url` is not an
    /// absolute `http://` or `https://` URL or `command` is empty, and
    /// [`ActuationError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        access_token: impl Into<String>,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ActuationError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ActuationError::InvalidEndpoint(format!(
                "URL must start with http:// or https://, got: '{trimmed}'"
            )));
        }
        let base_url = Url::parse(trimmed)
            .map_err(|e| ActuationError::InvalidEndpoint(format!("'{trimmed}': {e}")))?;

        let command = command.into();
        if command.trim().is_empty() {
            return Err(ActuationError::InvalidEndpoint(
                "device command must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ActuationError::Transport {
                target: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
            command,
            timeout,
        })
    }

    /// Builds the request URL for `target`.
    ///
    /// The target id and command are pushed as path segments, so characters
    /// such as `/` or `?` in an opaque id are percent-encoded.
    pub fn request_url(&self, target: &str) -> Result<Url, ActuationError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ActuationError::InvalidEndpoint(format!("'{}' cannot be a base URL", self.base_url))
            })?;
            segments.pop_if_empty().push(target).push(&self.command);
        }
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }
}

#[async_trait]
impl Actuator for HubActuator {
    async fn actuate(&self, profile: &DeviceProfile) -> Result<(), ActuationError> {
        let target = profile.actuation_target_id.as_str();
        let url = self.request_url(target)?;

        debug!(
            "GET {}/{target}/{} for device '{}'",
            self.base_url, self.command, profile.name
        );

        let response = self.client.get(url).send().await.map_err(|source| {
            if source.is_timeout() {
                ActuationError::Timeout {
                    target: target.to_string(),
                    timeout: self.timeout,
                }
            } else {
                ActuationError::Transport {
                    target: target.to_string(),
                    source: source.without_url(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActuationError::Status {
                target: target.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actuator(base: &str) -> HubActuator {
        HubActuator::new(base, "s3cret", "on", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_url_appends_target_command_and_token() {
        // Arrange
        let hub = actuator("http://hub.local/apps/api/9/devices");

        // Act
        let url = hub.request_url("101").unwrap();

        // Assert
        assert_eq!(
            url.as_str(),
            "http://hub.local/apps/api/9/devices/101/on?access_token=s3cret"
        );
    }

    #[test]
    fn test_trailing_slash_on_base_url_is_ignored() {
        let hub = actuator("http://hub.local/apps/api/9/devices/");
        let url = hub.request_url("7").unwrap();
        assert_eq!(url.path(), "/apps/api/9/devices/7/on");
    }

    #[test]
    fn test_opaque_target_is_percent_encoded() {
        let hub = actuator("https://hub.local/devices");
        let url = hub.request_url("a/b c").unwrap();
        assert_eq!(url.path(), "/devices/a%2Fb%20c/on");
    }

    #[test]
    fn test_debug_output_redacts_access_token() {
        // Arrange
        let hub = HubActuator::new(
            "http://hub.local/d",
            "s3cret-token",
            "on",
            Duration::from_secs(1),
        )
        .unwrap();

        // Act
        let rendered = format!("{hub:?}");

        // Assert
        assert!(!rendered.contains("s3cret-token"), "token leaked: {rendered}");
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("hub.local"));
    }

    #[test]
    fn test_base_url_without_scheme_is_rejected() {
        let result = HubActuator::new("hub.local/devices", "t", "on", Duration::from_secs(1));
        assert!(matches!(result, Err(ActuationError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let result = HubActuator::new("http://hub.local", "t", " ", Duration::from_secs(1));
        assert!(matches!(result, Err(ActuationError::InvalidEndpoint(_))));
    }
}
