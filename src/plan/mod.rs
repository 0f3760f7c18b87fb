//! The per-operation immutable plan: verb,
//! URL template and substitution rules, parameter bindings, accepted status
//! codes, and the shape the response should be reshaped into.

pub mod parser;
pub mod registry;

pub use registry::MethodPlanRegistry;

use crate::http::Verb;
use crate::url::EncodingPolicy;
use std::collections::BTreeSet;

/// One argument's role in building the request.
#[derive(Debug, Clone)]
pub enum ParamBinding {
    /// Substitutes a `{name}` path placeholder.
    Path { placeholder: String, encoding: EncodingPolicy },
    /// Sets/overrides a query key.
    Query { key: String, encoding: EncodingPolicy },
    /// Sets a single header, or expands a mapping argument into many headers
    /// sharing `prefix`.
    Header { name: HeaderBindingName },
    /// The single request body argument.
    Body { wire_type: BodyWireType },
    /// Overrides a host-template placeholder.
    HostParam { placeholder: String },
    /// Contributes an entry to the per-call `PolicyContext`.
    Context { key: String },
}

#[derive(Debug, Clone)]
pub enum HeaderBindingName {
    Fixed(String),
    ExpandMapping { prefix: String },
}

/// The declared wire representation of a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyWireType {
    Json,
    Text,
    Bytes,
    Base64Url,
    Stream,
}

/// What an invocation should reshape the decoded response into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Void,
    StreamOfChunks,
    Bytes,
    /// Only valid for `HEAD`: `200 <= status < 300`.
    Boolean,
    /// Status + headers + typed body.
    Envelope,
    /// The deserialized body handle, as-is.
    Typed,
}

/// Descriptor for the error type an operation should construct on an
/// unexpected status. Rust has
/// no per-operation exception classes to target, so this names the
/// identifier used for `ErrorTypeConstructionFailed` diagnostics; an actual
/// typed error is produced by an optional registered
/// [`crate::error::ErrorFactory`].
#[derive(Debug, Clone)]
pub struct ErrorDescriptor {
    pub error_type: String,
    pub error_body_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodPlan {
    pub operation_id: String,
    pub verb: Verb,
    /// `scheme://host/path` with `{name}` placeholders remaining.
    pub url_template: String,
    pub bindings: Vec<ParamBinding>,
    pub expected_status: BTreeSet<u16>,
    pub error: ErrorDescriptor,
    pub return_shape: ReturnShape,
    pub response_wire_type: Option<BodyWireType>,
    pub request_content_type: Option<String>,
}

impl MethodPlan {
    /// Success iff `status` is in the plan's expected set or `extra_allowed`
    /// — except 1xx, which is never success unless the plan's own expected
    /// set explicitly opts in (extras don't count for this).
    #[must_use]
    pub fn is_expected(&self, status: u16, extra_allowed: &[u16]) -> bool {
        if (100..200).contains(&status) {
            return self.expected_status.contains(&status);
        }
        self.expected_status.contains(&status) || extra_allowed.contains(&status)
    }

    #[must_use]
    pub fn fully_qualified_name(&self) -> &str {
        &self.operation_id
    }

    /// Every `{name}` placeholder that should appear in `url_template`,
    /// derived from the Path bindings.
    #[must_use]
    pub fn path_placeholder_names(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter_map(|b| match b {
                ParamBinding::Path { placeholder, .. } => Some(placeholder.as_str()),
                _ => None,
            })
            .collect()
    }
}
