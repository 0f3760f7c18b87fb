//! Error handling for the runtime.
//!
//! All errors are consolidated into a single [`Error`] type tagged with an
//! [`ErrorKind`] drawn from the taxonomy in the design: `BadDescription`,
//! `Serialization`, `Transport`, `UnexpectedStatus`, `Decoding`,
//! `ErrorTypeConstruction`, `NotSupported` and `Cancelled`. Each can carry
//! structured JSON details and, for `UnexpectedStatus`, the response and
//! decoded body that produced it.

use crate::http::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

/// The rendered form of a failed response's body: either real text (quoted
/// in the final message) or a placeholder like `(empty body)` /
/// `(N-byte body)` for a body that isn't textual (rendered unquoted).
#[derive(Debug, Clone)]
pub enum BodyDisplay {
    Text(String),
    Placeholder(String),
}

#[derive(Error, Debug)]
pub enum Error {
    /// The declarative description is inconsistent; fatal at client construction.
    #[error("bad description: {message}")]
    BadDescription { message: Cow<'static, str> },

    /// The request body could not be encoded by the chosen codec.
    #[error("serialization failure: {message}")]
    Serialization { message: Cow<'static, str> },

    /// The transport's own async failure (connect, timeout, protocol).
    #[error("transport failure: {message}")]
    Transport {
        message: Cow<'static, str>,
        retryable: bool,
    },

    /// Response status was not in the plan's expected set.
    #[error("{message}")]
    UnexpectedStatus {
        status: u16,
        message: String,
        response: Arc<HttpResponse>,
        decoded_body: Option<serde_json::Value>,
    },

    /// The response body could not be parsed by the chosen codec.
    #[error("decoding failure: {message}")]
    Decoding { message: Cow<'static, str> },

    /// The plan's declared error type has no constructor with the expected shape.
    #[error("error type construction failed for '{error_type}': {message}")]
    ErrorTypeConstructionFailed {
        error_type: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    /// Default resume hook, or an operation with no resume support.
    #[error("not supported: {message}")]
    NotSupported { message: Cow<'static, str> },

    /// Retry budget exhausted.
    #[error("retry limit exceeded after {attempts} attempts: {last_error}")]
    RetryLimitExceeded { attempts: u32, last_error: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Cooperative cancellation is not surfaced as an `Error` variant: per the
/// spec it is a terminal state observed as "the handle completes without a
/// value", modelled as `Option::None` / a dropped future rather than a
/// `Result::Err`. Call sites that need to distinguish "cancelled" from
/// "produced nothing" use this marker type instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation was cancelled")
    }
}

/// JSON-serializable projection of an [`Error`], used for structured logging
/// and for surfacing failures across process boundaries (e.g. resume state).
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonError {
    pub kind: String,
    pub message: String,
    pub status: Option<u16>,
    pub details: Option<serde_json::Value>,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadDescription { .. } => "BadDescription",
            Self::Serialization { .. } => "SerializationFailure",
            Self::Transport { .. } => "TransportFailure",
            Self::UnexpectedStatus { .. } => "UnexpectedStatus",
            Self::Decoding { .. } => "DecodingFailure",
            Self::ErrorTypeConstructionFailed { .. } => "ErrorTypeConstructionFailed",
            Self::NotSupported { .. } => "NotSupported",
            Self::RetryLimitExceeded { .. } => "RetryLimitExceeded",
            Self::Io(_) => "Io",
            Self::Network(_) => "Network",
            Self::Json(_) => "Json",
            Self::Yaml(_) => "Yaml",
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonError {
        let status = match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        };
        let details = match self {
            Self::UnexpectedStatus { decoded_body, .. } => decoded_body.clone(),
            _ => None,
        };
        JsonError {
            kind: self.kind().to_string(),
            message: self.to_string(),
            status,
            details,
        }
    }

    #[must_use]
    pub fn bad_description(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadDescription {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<Cow<'static, str>>, retryable: bool) -> Self {
        Self::Transport {
            message: message.into(),
            retryable,
        }
    }

    #[must_use]
    pub fn decoding(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_supported(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn retry_limit_exceeded(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::RetryLimitExceeded {
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Builds the `UnexpectedStatus` error for a response that failed the
    /// plan's `is_expected` check.
    #[must_use]
    pub fn unexpected_status(
        response: Arc<HttpResponse>,
        body_display: &BodyDisplay,
        decoded_body: Option<serde_json::Value>,
    ) -> Self {
        let status = response.status;
        let message = Self::format_status_message(status, body_display);
        Self::UnexpectedStatus {
            status,
            message,
            response,
            decoded_body,
        }
    }

    /// Formats `Status code S, "BODY"` for real body text, or `Status code
    /// S, (empty body)` / `Status code S, (N-byte body)` unquoted for the
    /// placeholders `display_body` produces for non-textual bodies.
    #[must_use]
    pub fn format_status_message(status: u16, body_display: &BodyDisplay) -> String {
        match body_display {
            BodyDisplay::Text(text) => format!("Status code {status}, \"{text}\""),
            BodyDisplay::Placeholder(text) => format!("Status code {status}, {text}"),
        }
    }

    /// True for errors the retry policy is allowed to retry on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::UnexpectedStatus { status, .. } => crate::constants::is_retryable_status(*status),
            _ => false,
        }
    }

    /// Best-effort accessor for the request a transport-level failure occurred on.
    #[must_use]
    pub const fn response(&self) -> Option<&Arc<HttpResponse>> {
        match self {
            Self::UnexpectedStatus { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Registered per operation to construct a typed failure instead of the
/// generic [`Error::UnexpectedStatus`]. Rust has no per-operation exception
/// classes to dispatch to, so the factory itself decides what `Error` (or a
/// wrapped variant of it) to hand back; returning `Err` here means "no such
/// error type could be constructed", which the invocation engine downgrades
/// to a generic `UnexpectedStatus`, or `ErrorTypeConstructionFailed` if the
/// factory itself errors.
pub trait ErrorFactory: Send + Sync {
    fn construct(
        &self,
        message: String,
        response: Arc<HttpResponse>,
        decoded_body: Option<serde_json::Value>,
    ) -> Result<Error, Error>;
}

/// Helper used by callers that want the originating request attached to a
/// user-visible failure (§7: "envelope + original request + decoded body").
#[must_use]
pub fn attach_request(err: Error, _request: &HttpRequest) -> Error {
    // HttpResponse already carries a back-reference to its HttpRequest
    // (§3), so UnexpectedStatus errors need no extra work here; this hook
    // exists for transport-level failures that occur before a response exists.
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_match_taxonomy() {
        assert_eq!(Error::bad_description("x").kind(), "BadDescription");
        assert_eq!(Error::serialization("x").kind(), "SerializationFailure");
        assert_eq!(Error::transport("x", true).kind(), "TransportFailure");
        assert_eq!(Error::decoding("x").kind(), "DecodingFailure");
        assert_eq!(Error::not_supported("x").kind(), "NotSupported");
    }

    #[test]
    fn retryable_transport_is_retryable() {
        assert!(Error::transport("boom", true).is_retryable());
        assert!(!Error::transport("boom", false).is_retryable());
    }
}
