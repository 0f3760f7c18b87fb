//! Retry policy: exponential backoff with jitter, honoring a
//! `Retry-After` response header, reusing the same remainder of the pipeline
//! across attempts via [`Next::retry_token`].

use crate::constants::HEADER_RETRY_AFTER;
use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Parses a `Retry-After` header value, supporting both the delay-in-seconds
/// and HTTP-date forms (RFC 7231). Returns `None` for a value in the past.
#[must_use]
pub fn parse_retry_after_value(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}

#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_retry_delay(config: &RetryConfig, attempt: usize) -> Duration {
    let base_delay = config.initial_delay_ms as f64;
    let attempt_i32 = i32::try_from(attempt.min(30)).unwrap_or(30);
    let delay_ms =
        (base_delay * config.backoff_multiplier.powi(attempt_i32)).min(config.max_delay_ms as f64);

    let final_delay_ms = if config.jitter {
        delay_ms * fastrand::f64().mul_add(0.25, 1.0)
    } else {
        delay_ms
    } as u64;

    Duration::from_millis(final_delay_ms)
}

#[must_use]
pub fn calculate_retry_delay_with_header(
    config: &RetryConfig,
    attempt: usize,
    retry_after: Option<Duration>,
) -> Duration {
    let calculated = calculate_retry_delay(config, attempt);
    retry_after.map_or(calculated, |server_delay| {
        calculated
            .max(server_delay)
            .min(Duration::from_millis(config.max_delay_ms))
    })
}

/// Retries the remainder of the pipeline on a retryable error, per
/// spec.md §4.5. Re-authentication retries triggered by
/// [`crate::policy::builtin::credentials::CredentialsPolicy`] do not count
/// against this budget since they happen further down the chain, inside a
/// single `next.run` call.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

fn retry_after_from(response: &HttpResponse) -> Option<Duration> {
    response
        .headers
        .get(HEADER_RETRY_AFTER)
        .and_then(parse_retry_after_value)
}

#[async_trait]
impl Policy for RetryPolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        let mut attempt = 0usize;
        loop {
            let token = next.retry_token();
            match token.run(ctx).await {
                Ok(response) => {
                    let is_last = attempt + 1 >= self.config.max_attempts;
                    if !is_retryable_status(response.status) || is_last {
                        return Ok(response);
                    }
                    let retry_after = retry_after_from(&response);
                    let delay = calculate_retry_delay_with_header(&self.config, attempt, retry_after);
                    crate::logging::log_retry(
                        u32::try_from(attempt).unwrap_or(u32::MAX),
                        Some(response.status),
                        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retriable status",
                    );
                    response.drain().await;
                    sleep(delay).await;
                    attempt += 1;
                    ctx.retry_attempts += 1;
                }
                Err(err) => {
                    let is_last = attempt + 1 >= self.config.max_attempts;
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if is_last {
                        let attempts = u32::try_from(attempt + 1).unwrap_or(u32::MAX);
                        return Err(Error::retry_limit_exceeded(attempts, err.to_string()));
                    }
                    let retry_after = err.response().and_then(|r| retry_after_from(r));
                    let delay = calculate_retry_delay_with_header(&self.config, attempt, retry_after);
                    crate::logging::log_retry(
                        u32::try_from(attempt).unwrap_or(u32::MAX),
                        None,
                        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transport failure",
                    );
                    sleep(delay).await;
                    attempt += 1;
                    ctx.retry_attempts += 1;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "RetryPolicy"
    }
}

#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    crate::constants::is_retryable_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_without_jitter() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(calculate_retry_delay(&config, 0).as_millis(), 100);
        assert_eq!(calculate_retry_delay(&config, 1).as_millis(), 200);
        assert_eq!(calculate_retry_delay(&config, 2).as_millis(), 400);
        assert_eq!(calculate_retry_delay(&config, 10).as_millis(), 1000);
    }

    #[test]
    fn retry_after_header_overrides_when_larger() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        let delay = calculate_retry_delay_with_header(&config, 0, Some(Duration::from_secs(3)));
        assert_eq!(delay.as_secs(), 3);
    }

    #[test]
    fn retry_after_header_is_capped_at_max_delay() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        let delay = calculate_retry_delay_with_header(&config, 0, Some(Duration::from_secs(60)));
        assert_eq!(delay.as_millis(), 5000);
    }

    #[test]
    fn parses_seconds_and_http_date() {
        assert_eq!(parse_retry_after_value("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after_value("not-a-date"), None);
    }
}
