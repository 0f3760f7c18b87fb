//! Typed, validated pipeline configuration: retry tuning,
//! the user-agent string, and default headers applied to every request.
//!
//! Deliberately in-memory only — no file or environment loading. A
//! generated client wires this up from whatever configuration story its own
//! host application already has; this crate's job stops at validating the
//! values it's handed.

use crate::error::Error;
use crate::policy::builtin::retry::RetryConfig;
use crate::policy::PipelineOptions;
use std::collections::HashMap;
use std::time::Duration;

/// Builder for [`PipelineOptions`] with validation the raw struct doesn't
/// enforce on its own.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub retry: RetryConfig,
    pub default_headers: HashMap<String, String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            retry: RetryConfig::default(),
            default_headers: HashMap::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Validates the configured values and produces the runtime
    /// [`PipelineOptions`].
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if `retry.max_attempts` is zero or
    /// `retry.backoff_multiplier` is not greater than `1.0`.
    pub fn build(self) -> Result<PipelineOptions, Error> {
        if self.retry.max_attempts == 0 {
            return Err(Error::bad_description("retry.max_attempts must be at least 1"));
        }
        if self.retry.backoff_multiplier <= 1.0 {
            return Err(Error::bad_description("retry.backoff_multiplier must be greater than 1.0"));
        }
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
        Ok(PipelineOptions {
            user_agent,
            retry: self.retry,
            default_headers: self.default_headers,
        })
    }

    /// The [`TransportTimeouts`](crate::transport::reqwest_transport::TransportTimeouts)
    /// implied by this configuration.
    #[must_use]
    pub fn transport_timeouts(&self) -> crate::transport::reqwest_transport::TransportTimeouts {
        crate::transport::reqwest_transport::TransportTimeouts {
            connect: self.connect_timeout,
            request: self.request_timeout,
        }
    }
}
