//! Request and response logging with automatic secret redaction, operating
//! on this crate's own [`HttpHeaders`]/[`HttpRequest`]/[`HttpResponse`]
//! rather than `reqwest::header::HeaderMap`.
//!
//! Secret sourcing is a [`crate::policy::builtin::credentials::CredentialProvider`]
//! concern now, not a logging concern, so [`SecretContext`] simply takes the
//! already-resolved values the caller wants redacted wherever they appear.

use crate::http::{HttpHeaders, HttpRequest, HttpResponse};
use tracing::{debug, info, trace};

/// Resolved secret values that should be redacted wherever they appear in a
/// logged header value or body, in addition to the static header/query
/// allowlists below.
#[derive(Debug, Default, Clone)]
pub struct SecretContext {
    secrets: Vec<String>,
}

impl SecretContext {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(secrets: Vec<String>) -> Self {
        Self {
            secrets: secrets.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    #[must_use]
    pub fn is_secret(&self, value: &str) -> bool {
        !value.is_empty() && self.secrets.iter().any(|s| s == value)
    }

    #[must_use]
    pub fn redact_secrets_in_text(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            if secret.len() >= MIN_SECRET_LENGTH_FOR_BODY_REDACTION {
                out = out.replace(secret.as_str(), "[REDACTED]");
            }
        }
        out
    }
}

/// Shorter values are more likely to collide with legitimate body content,
/// so body-text redaction only fires on secrets at least this long.
const MIN_SECRET_LENGTH_FOR_BODY_REDACTION: usize = 8;

/// The single source of truth for which header names are always redacted,
/// regardless of whether a [`SecretContext`] was supplied.
#[must_use]
pub fn should_redact_header(header_name: &str) -> bool {
    let lower = header_name.to_lowercase();
    matches!(
        lower.as_str(),
        "authorization"
            | "proxy-authorization"
            | "x-api-key"
            | "x-api-token"
            | "api-key"
            | "api_key"
            | "x-access-token"
            | "x-auth-token"
            | "x-secret-token"
            | "token"
            | "secret"
            | "password"
            | "x-webhook-secret"
            | "cookie"
            | "set-cookie"
            | "x-csrf-token"
            | "x-xsrf-token"
            | "x-amz-security-token"
            | "private-token"
    )
}

fn should_redact_query_param(param_name: &str) -> bool {
    let lower = param_name.to_lowercase();
    matches!(
        lower.as_str(),
        "api_key"
            | "apikey"
            | "api-key"
            | "key"
            | "token"
            | "access_token"
            | "accesstoken"
            | "auth_token"
            | "authtoken"
            | "bearer_token"
            | "refresh_token"
            | "secret"
            | "api_secret"
            | "client_secret"
            | "password"
            | "passwd"
            | "pwd"
            | "signature"
            | "sig"
            | "session_id"
            | "sessionid"
            | "auth"
            | "authorization"
            | "credentials"
    )
}

/// Redacts sensitive query parameter values from a URL before it's logged.
#[must_use]
pub fn redact_url_query_params(url: &str) -> String {
    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };
    let base_url = &url[..query_start];
    let query_string = &url[query_start + 1..];
    let (query_part, fragment) = query_string
        .find('#')
        .map_or((query_string, None), |frag_start| {
            (&query_string[..frag_start], Some(&query_string[frag_start..]))
        });

    let redacted_params: Vec<String> = query_part
        .split('&')
        .map(|param| {
            param.find('=').map_or_else(
                || param.to_string(),
                |eq_pos| {
                    let name = &param[..eq_pos];
                    if should_redact_query_param(name) {
                        format!("{name}=[REDACTED]")
                    } else {
                        param.to_string()
                    }
                },
            )
        })
        .collect();

    let mut result = format!("{base_url}?{}", redacted_params.join("&"));
    if let Some(frag) = fragment {
        result.push_str(frag);
    }
    result
}

fn redact_header_value(header_name: &str, value: &str, secret_ctx: Option<&SecretContext>) -> String {
    if should_redact_header(header_name) || secret_ctx.is_some_and(|ctx| ctx.is_secret(value)) {
        return "[REDACTED]".to_string();
    }
    value.to_string()
}

fn log_headers(label: &str, headers: &HttpHeaders, secret_ctx: Option<&SecretContext>) {
    if headers.is_empty() {
        return;
    }
    debug!(target: "runtime::pipeline", "{label}:");
    for (name, value) in headers.iter() {
        let display_value = redact_header_value(name, value, secret_ctx);
        debug!(target: "runtime::pipeline", "  {name}: {display_value}");
    }
}

/// Logs an outgoing request at `info` (method/URL) and `debug` (headers),
/// redacting secrets from both.
pub fn log_request(request: &HttpRequest, secret_ctx: Option<&SecretContext>) {
    info!(
        target: "runtime::pipeline",
        "-> {} {}",
        request.verb,
        redact_url_query_params(&request.url)
    );
    log_headers("Request headers", &request.headers, secret_ctx);
}

/// Logs a response's status line, duration, and headers. The body is
/// intentionally not logged here: it may be large or yet-unread, and
/// reading it would violate the at-most-once consumption rule.
pub fn log_response(response: &HttpResponse, duration_ms: u128, secret_ctx: Option<&SecretContext>) {
    info!(
        target: "runtime::pipeline",
        "<- {} ({duration_ms}ms)",
        response.status
    );
    log_headers("Response headers", &response.headers, secret_ctx);
}

/// Logs a retry attempt at `trace`, the level reserved for diagnostics a
/// caller doesn't usually want but might need to grep for.
pub fn log_retry(attempt: u32, status: Option<u16>, delay_ms: u64, reason: &str) {
    trace!(
        target: "runtime::pipeline",
        "retry {attempt}: {reason} (status={status:?}, delay={delay_ms}ms)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_known_sensitive_headers() {
        assert_eq!(redact_header_value("Authorization", "Bearer xyz", None), "[REDACTED]");
        assert_eq!(redact_header_value("X-Debug", "on", None), "on");
    }

    #[test]
    fn redacts_dynamic_secrets_in_headers() {
        let ctx = SecretContext::new(vec!["super-secret-value".to_string()]);
        assert_eq!(redact_header_value("X-Custom", "super-secret-value", Some(&ctx)), "[REDACTED]");
    }

    #[test]
    fn redacts_sensitive_query_params() {
        let url = "https://host/path?api_key=abc123&page=2";
        assert_eq!(redact_url_query_params(url), "https://host/path?api_key=[REDACTED]&page=2");
    }

    #[test]
    fn leaves_urls_without_query_untouched() {
        assert_eq!(redact_url_query_params("https://host/path"), "https://host/path");
    }

    #[test]
    fn short_values_are_not_redacted_from_body_text() {
        let ctx = SecretContext::new(vec!["ab".to_string()]);
        assert_eq!(ctx.redact_secrets_in_text("ab is short"), "ab is short");
    }

    #[test]
    fn long_secret_values_are_redacted_from_body_text() {
        let ctx = SecretContext::new(vec!["sk_live_abcdef1234".to_string()]);
        assert_eq!(
            ctx.redact_secrets_in_text("key=sk_live_abcdef1234 end"),
            "key=[REDACTED] end"
        );
    }
}
