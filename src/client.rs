//! Public API surface: construct a pipeline from an ordered
//! list of policies and a transport, build a client proxy from a parsed
//! interface description, invoke an operation by name, and register
//! per-operation exception types.

use crate::builder::CallArgs;
use crate::codec::{Codec, DefaultCodec};
use crate::error::{Error, ErrorFactory};
use crate::invocation::{InvocationEngine, InvocationOptions, InvocationResult};
use crate::plan::MethodPlanRegistry;
use crate::policy::builtin::{
    CookiePolicy, CredentialProvider, CredentialsPolicy, DecodingPolicy, NoopCredentialProvider,
    RequestIdPolicy, RetryPolicy, UserAgentPolicy,
};
use crate::policy::{Pipeline, PipelineOptions, Policy};
use crate::transport::Transport;
use std::sync::Arc;

/// Assembles an ordered policy chain around a terminal transport.
///
/// [`PipelineBuilder::new`] starts empty; [`PipelineBuilder::with_defaults`]
/// installs the built-in chain in the order this crate recommends (outer to
/// inner): user-agent, request-id, retry, cookies, credentials, decoding,
/// then the transport. Retry wraps credentials/cookies so a retried attempt
/// re-signs and re-sends rather than replaying a stale signature; decoding
/// sits innermost so it attaches its handles to the rawest possible
/// response before any outer policy observes it.
pub struct PipelineBuilder {
    policies: Vec<Arc<dyn Policy>>,
    options: PipelineOptions,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
            options: PipelineOptions::default(),
        }
    }

    /// Installs the standard built-in chain: user-agent, request-id, retry,
    /// cookies, credentials, decoding.
    #[must_use]
    pub fn with_defaults(self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.with_policy(Arc::new(UserAgentPolicy))
            .with_policy(Arc::new(RequestIdPolicy))
            .with_policy(Arc::new(RetryPolicy::new(self_retry_config())))
            .with_policy(Arc::new(CookiePolicy::new()))
            .with_policy(Arc::new(CredentialsPolicy::new(credentials)))
            .with_policy(Arc::new(DecodingPolicy::new(Arc::new(
                crate::decoder::ResponseDecoder::new(),
            ))))
    }

    /// [`Self::with_defaults`] with an unauthenticated [`NoopCredentialProvider`].
    #[must_use]
    pub fn with_default_unauthenticated(self) -> Self {
        self.with_defaults(Arc::new(NoopCredentialProvider))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policies.push(policy);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(self, transport: Arc<dyn Transport>) -> Pipeline {
        Pipeline::new(self.policies, transport, self.options)
    }
}

fn self_retry_config() -> crate::policy::builtin::RetryConfig {
    crate::policy::builtin::RetryConfig::default()
}

/// A generated-client proxy over a parsed [`MethodPlanRegistry`]. Cheap to clone: every field is an `Arc`.
pub struct ApiClient<C: Codec = DefaultCodec> {
    registry: Arc<MethodPlanRegistry>,
    engine: InvocationEngine<C>,
}

impl<C: Codec> ApiClient<C> {
    #[must_use]
    pub fn new(registry: Arc<MethodPlanRegistry>, pipeline: Arc<Pipeline>, codec: Arc<C>) -> Self {
        Self {
            registry: Arc::clone(&registry),
            engine: InvocationEngine::new(registry, pipeline, codec),
        }
    }

    /// Parses `description` into a [`MethodPlanRegistry`] and builds a
    /// client around it in one step.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] per [`MethodPlanRegistry::parse`].
    pub fn from_description(description: &str, pipeline: Arc<Pipeline>, codec: Arc<C>) -> Result<Self, Error> {
        let registry = Arc::new(MethodPlanRegistry::parse(description)?);
        Ok(Self::new(registry, pipeline, codec))
    }

    /// Registers a typed error constructor for `operation_id`.
    pub fn register_error_type(&mut self, operation_id: impl Into<String>, factory: Arc<dyn ErrorFactory>) {
        self.engine.register_error_type(operation_id, factory);
    }

    /// Invokes `operation_id` with `args`, accepting only the plan's
    /// declared status codes as success.
    ///
    /// # Errors
    /// See [`InvocationEngine::invoke`].
    pub async fn invoke(&self, operation_id: &str, args: CallArgs) -> Result<InvocationResult, Error> {
        self.engine.invoke(operation_id, args, &InvocationOptions::default()).await
    }

    /// Invokes `operation_id` with `args`, additionally accepting
    /// `options.extra_allowed_status` as success.
    ///
    /// # Errors
    /// See [`InvocationEngine::invoke`].
    pub async fn invoke_with_options(
        &self,
        operation_id: &str,
        args: CallArgs,
        options: &InvocationOptions,
    ) -> Result<InvocationResult, Error> {
        self.engine.invoke(operation_id, args, options).await
    }

    #[must_use]
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.registry.operation_ids()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<MethodPlanRegistry> {
        &self.registry
    }
}
