//! The pipeline executor: a composable chain of policies wrapping a
//! terminal transport.

pub mod builtin;

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-call mutable scratchpad: the request
/// under construction, caller-supplied key/value data, and a handle to the
/// options shared read-only across the whole pipeline.
pub struct PolicyContext {
    pub request: HttpRequest,
    values: HashMap<String, serde_json::Value>,
    pub options: Arc<PipelineOptions>,
    /// Number of attempts already charged against the retry budget; not
    /// incremented by authentication-refresh retries.
    pub(crate) retry_attempts: u32,
}

impl PolicyContext {
    #[must_use]
    pub fn new(request: HttpRequest, options: Arc<PipelineOptions>) -> Self {
        Self {
            request,
            values: HashMap::new(),
            options,
            retry_attempts: 0,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }
}

/// Pipeline-wide configuration, immutable for the pipeline's lifetime
///.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub user_agent: String,
    pub retry: crate::policy::builtin::retry::RetryConfig,
    /// Applied to every request that doesn't already set the same header
    /// (`set_if_absent` semantics, same precedence as [`UserAgentPolicy`](crate::policy::builtin::UserAgentPolicy)),
    /// by [`crate::invocation::InvocationEngine`] before dispatch.
    pub default_headers: std::collections::HashMap<String, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            retry: crate::policy::builtin::retry::RetryConfig::default(),
            default_headers: std::collections::HashMap::new(),
        }
    }
}

/// A unit of pipeline middleware. Implementations see the mutable context
/// and a single-use handle to the remainder of the chain.
#[async_trait]
pub trait Policy: Send + Sync {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error>;

    /// A short name used in tracing spans; defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A single-use handle to the remainder of the pipeline. `run` takes `self`
/// by value, so a policy cannot invoke it twice on the same handle.
///
/// Built-in policies that need to retry (re-entering "from index 0") do so
/// through [`Next::retry_token`], a crate-private escape hatch; third-party
/// policies implementing [`Policy`] only ever see the public, single-use
/// `run`.
pub struct Next<'a> {
    policies: &'a [Arc<dyn Policy>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &mut PolicyContext) -> Result<HttpResponse, Error> {
        match self.policies.split_first() {
            Some((policy, rest)) => {
                let next = Next {
                    policies: rest,
                    transport: self.transport,
                };
                let span = tracing::debug_span!("policy", name = policy.name());
                let _enter = span.enter();
                policy.process(ctx, next).await
            }
            None => {
                // Snapshot before moving the request into the transport so a
                // RetryPolicy/CredentialsPolicy further out can resend on
                // either success or failure; lost for stream bodies, which a
                // retry could never replay anyway.
                let snapshot = ctx.request.snapshot();
                let placeholder = HttpRequest::new(crate::http::Verb::Get, String::new());
                let request = std::mem::replace(&mut ctx.request, placeholder);
                let result = self.transport.send(request).await;
                ctx.request = snapshot;
                result
            }
        }
    }

    /// Builds a fresh head spanning the same remainder, for policies that
    /// implement a retry loop. Not part of the public `Policy` contract.
    #[must_use]
    pub(crate) fn retry_token(&self) -> Self {
        Self {
            policies: self.policies,
            transport: self.transport,
        }
    }
}

/// The ordered composition of policies terminated by the transport
///. Immutable and freely shared once built.
pub struct Pipeline {
    policies: Vec<Arc<dyn Policy>>,
    transport: Arc<dyn Transport>,
    pub options: Arc<PipelineOptions>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        policies: Vec<Arc<dyn Policy>>,
        transport: Arc<dyn Transport>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            policies,
            transport,
            options: Arc::new(options),
        }
    }

    /// Drives the chain for one call. Creates a fresh "next" handle whose
    /// state starts at index 0.
    ///
    /// # Errors
    /// Propagates whatever the innermost policy or the transport returns.
    pub async fn send(&self, ctx: &mut PolicyContext) -> Result<HttpResponse, Error> {
        let next = Next {
            policies: &self.policies,
            transport: self.transport.as_ref(),
        };
        next.run(ctx).await
    }

    #[must_use]
    pub fn options(&self) -> &Arc<PipelineOptions> {
        &self.options
    }

    /// Cooperative cancellation: races [`Self::send`] against
    /// `token` being cancelled. A drop of the returned future, or
    /// cancellation of `token`, propagates inward through every pending
    /// `.await` (sleeps, the transport call, the body stream) since the
    /// losing branch of [`tokio::select!`] is simply dropped.
    ///
    /// Returns `Ok(None)` for "cancelled" rather than an error: cancellation
    /// is a terminal state observed as the handle completing without a
    /// value, not a failure.
    ///
    /// # Errors
    /// Propagates whatever [`Self::send`] would return, if it wins the race.
    pub async fn send_cancellable(
        &self,
        ctx: &mut PolicyContext,
        token: &tokio_util::sync::CancellationToken,
    ) -> Result<Option<HttpResponse>, Error> {
        tokio::select! {
            biased;
            () = token.cancelled() => Ok(None),
            result = self.send(ctx) => result.map(Some),
        }
    }
}
