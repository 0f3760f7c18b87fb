//! Serializable resume state for long-running operations: captures just
//! enough of an in-flight call (its URL, headers and caller-supplied state)
//! that a later process can pick the polling loop back up.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to resume one polling operation, serialized with
/// `serde_json` so it can cross a process boundary (a queue message, a
/// database row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescription {
    pub operation_name: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub state: serde_json::Value,
}

/// Hook invoked by a long-running operation to produce (and later consume)
/// an [`OperationDescription`]. The default implementation declines: most
/// operations have no resumable state, and that's the expected case rather
/// than an error condition callers must special-case.
#[async_trait::async_trait]
pub trait ResumeHook: Send + Sync {
    /// Builds the description for the in-flight call described by `ctx`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] if this operation has no resumable state.
    async fn describe(&self, _ctx: &crate::policy::PolicyContext) -> Result<OperationDescription, Error> {
        Err(Error::not_supported("this operation does not support resume"))
    }

    /// Resumes polling from a previously captured description, returning
    /// the final decoded body once the operation completes.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] by default, or whatever the
    /// resumed poll loop itself fails with.
    async fn resume(&self, _description: &OperationDescription) -> Result<Option<serde_json::Value>, Error> {
        Err(Error::not_supported("this operation does not support resume"))
    }
}

/// A no-op hook for clients with no long-running operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotSupportedResumeHook;

impl ResumeHook for NotSupportedResumeHook {}

/// Demonstration hook for the common "poll a status URL until it's
/// terminal" shape: `describe` snapshots the poll URL and headers;
/// `resume` re-issues GETs against it through the supplied pipeline until
/// the status field reaches a terminal value.
pub struct PollingResumeHook<C: crate::codec::Codec> {
    pipeline: std::sync::Arc<crate::policy::Pipeline>,
    codec: std::sync::Arc<C>,
    poll_interval: std::time::Duration,
    terminal_statuses: Vec<String>,
}

impl<C: crate::codec::Codec> PollingResumeHook<C> {
    #[must_use]
    pub fn new(pipeline: std::sync::Arc<crate::policy::Pipeline>, codec: std::sync::Arc<C>) -> Self {
        Self {
            pipeline,
            codec,
            poll_interval: std::time::Duration::from_secs(1),
            terminal_statuses: vec![
                "Succeeded".to_string(),
                "Failed".to_string(),
                "Canceled".to_string(),
            ],
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn is_terminal(&self, body: &serde_json::Value) -> bool {
        body.get("status")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|status| self.terminal_statuses.iter().any(|s| s == status))
    }
}

#[async_trait::async_trait]
impl<C: crate::codec::Codec> ResumeHook for PollingResumeHook<C> {
    async fn describe(&self, ctx: &crate::policy::PolicyContext) -> Result<OperationDescription, Error> {
        let headers = ctx
            .request
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(OperationDescription {
            operation_name: "poll".to_string(),
            url: ctx.request.url.clone(),
            headers,
            state: serde_json::Value::Null,
        })
    }

    async fn resume(&self, description: &OperationDescription) -> Result<Option<serde_json::Value>, Error> {
        let decoder = crate::decoder::ResponseDecoder::new();
        loop {
            let mut request = crate::http::HttpRequest::new(crate::http::Verb::Get, &description.url);
            for (name, value) in &description.headers {
                request.headers.set(name, value);
            }
            let mut ctx = crate::policy::PolicyContext::new(request, self.pipeline.options().clone());
            let response = self.pipeline.send(&mut ctx).await?;
            let body = decoder
                .body(
                    &response,
                    &placeholder_poll_plan(),
                    self.codec.as_ref(),
                )
                .await?;
            if let Some(body) = &body {
                if self.is_terminal(body) {
                    return Ok(Some(body.clone()));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// A minimal plan used only to drive [`crate::decoder::ResponseDecoder`]'s
/// content-type-based decoding; polling responses have no registered
/// operation of their own.
fn placeholder_poll_plan() -> crate::plan::MethodPlan {
    crate::plan::MethodPlan {
        operation_id: "$poll".to_string(),
        verb: crate::http::Verb::Get,
        url_template: String::new(),
        bindings: vec![],
        expected_status: std::collections::BTreeSet::from([200]),
        error: crate::plan::ErrorDescriptor { error_type: "PollError".to_string(), error_body_type: None },
        return_shape: crate::plan::ReturnShape::Typed,
        response_wire_type: None,
        request_content_type: None,
    }
}
