//! The central call algorithm: plan lookup, request build, pipeline
//! dispatch, status validation and response reshaping.

use crate::builder::{CallArgs, RequestBuilder};
use crate::codec::Codec;
use crate::decoder::ResponseDecoder;
use crate::error::{BodyDisplay, Error, ErrorFactory};
use crate::http::BodyStream;
use crate::plan::{MethodPlan, MethodPlanRegistry, ReturnShape};
use crate::policy::{Pipeline, PolicyContext};
use std::collections::HashMap;
use std::sync::Arc;

/// What an invocation hands back to the caller, shaped per the plan's
/// [`ReturnShape`]. Not `Clone`: the `Stream` variant transfers ownership of
/// the response body to the caller, per §4.7's "yield the raw body stream".
pub enum InvocationResult {
    Void,
    /// Transfers ownership of the body stream to the caller, per the
    /// `StreamOfChunks` return shape.
    Stream { status: u16, body: BodyStream },
    Bytes(bytes::Bytes),
    Boolean(bool),
    Envelope {
        status: u16,
        headers: serde_json::Value,
        body: Option<serde_json::Value>,
    },
    Typed(Option<serde_json::Value>),
}

impl std::fmt::Debug for InvocationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "Void"),
            Self::Stream { status, .. } => f.debug_struct("Stream").field("status", status).finish_non_exhaustive(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Envelope { status, headers, body } => f
                .debug_struct("Envelope")
                .field("status", status)
                .field("headers", headers)
                .field("body", body)
                .finish(),
            Self::Typed(body) => f.debug_tuple("Typed").field(body).finish(),
        }
    }
}

/// Extra status codes an individual call accepts beyond the plan's declared
/// set.
#[derive(Default, Clone)]
pub struct InvocationOptions {
    pub extra_allowed_status: Vec<u16>,
}

/// Ties together the registry, pipeline and codec needed to run one call
/// end to end. Cheap to clone: every field is an `Arc`.
pub struct InvocationEngine<C: Codec> {
    registry: Arc<MethodPlanRegistry>,
    pipeline: Arc<Pipeline>,
    codec: Arc<C>,
    decoder: ResponseDecoder,
    error_factories: HashMap<String, Arc<dyn ErrorFactory>>,
}

impl<C: Codec> InvocationEngine<C> {
    #[must_use]
    pub fn new(registry: Arc<MethodPlanRegistry>, pipeline: Arc<Pipeline>, codec: Arc<C>) -> Self {
        Self {
            registry,
            pipeline,
            codec,
            decoder: ResponseDecoder::new(),
            error_factories: HashMap::new(),
        }
    }

    /// Registers a typed error constructor for `operation_id`.
    pub fn register_error_type(&mut self, operation_id: impl Into<String>, factory: Arc<dyn ErrorFactory>) {
        self.error_factories.insert(operation_id.into(), factory);
    }

    /// Runs the full call algorithm for `operation_id`:
    ///
    /// 1. Look up the plan.
    /// 2. Build the request and collect Context bindings.
    /// 3. Submit it through the pipeline.
    /// 4. Validate the response status against the plan's expected set.
    /// 5. On an unexpected status, construct a typed error via a registered
    ///    factory, falling back to a generic [`Error::UnexpectedStatus`].
    /// 6. Reshape the (decoded) response per the plan's `ReturnShape`.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if no plan is registered for
    /// `operation_id`, or whatever the pipeline / decoder / status
    /// validation produce.
    pub async fn invoke(
        &self,
        operation_id: &str,
        mut args: CallArgs,
        options: &InvocationOptions,
    ) -> Result<InvocationResult, Error> {
        let plan = self
            .registry
            .get(operation_id)
            .ok_or_else(|| Error::bad_description(format!("no registered operation '{operation_id}'")))?;

        let (mut request, context_entries) =
            RequestBuilder::new(self.codec.as_ref()).build(&plan, &mut args)?;
        for (name, value) in &self.pipeline.options().default_headers {
            request.headers.set_if_absent(name, value);
        }

        let mut ctx = PolicyContext::new(request, self.pipeline.options().clone());
        ctx.set("caller-method", plan.fully_qualified_name());
        for (key, value) in context_entries {
            ctx.set(key, value);
        }

        let response = Arc::new(self.pipeline.send(&mut ctx).await?);

        if !plan.is_expected(response.status, &options.extra_allowed_status) {
            return Err(self.build_failure(&plan, operation_id, response).await);
        }

        self.decoder.attach_headers(&response);
        self.reshape(&plan, response).await
    }

    async fn build_failure(&self, plan: &MethodPlan, operation_id: &str, response: Arc<crate::http::HttpResponse>) -> Error {
        let decoded_body = self.decoder.body(&response, plan, self.codec.as_ref()).await.unwrap_or(None);
        let body_display = display_body(&response, &decoded_body).await;
        let message = Error::format_status_message(response.status, &body_display);

        if let Some(factory) = self.error_factories.get(operation_id) {
            match factory.construct(message, Arc::clone(&response), decoded_body.clone()) {
                Ok(typed) => return typed,
                Err(_) => {
                    return Error::ErrorTypeConstructionFailed {
                        error_type: plan.error.error_type.clone().into(),
                        message: format!("factory for '{}' failed to construct its declared error type", plan.error.error_type).into(),
                    };
                }
            }
        }

        Error::unexpected_status(response, &body_display, decoded_body)
    }

    /// Step 6: reshape the validated, decoded response. Takes `response` by
    /// value since `StreamOfChunks` transfers ownership of the body stream
    /// to the caller.
    async fn reshape(&self, plan: &MethodPlan, response: Arc<crate::http::HttpResponse>) -> Result<InvocationResult, Error> {
        match plan.return_shape {
            ReturnShape::Void => {
                response.drain().await;
                Ok(InvocationResult::Void)
            }
            ReturnShape::StreamOfChunks => {
                let status = response.status;
                let body = match Arc::try_unwrap(response) {
                    Ok(response) => response.into_stream(),
                    // Still shared (e.g. a caller holding another handle on
                    // the same response); fall back to buffering so the
                    // caller still gets the body rather than losing it.
                    Err(shared) => {
                        let bytes = shared.bytes().await?;
                        Box::pin(futures_util::stream::once(async move { Ok(bytes) }))
                    }
                };
                Ok(InvocationResult::Stream { status, body })
            }
            ReturnShape::Bytes => {
                let bytes = response.bytes().await?;
                let bytes = if plan.response_wire_type == Some(crate::plan::BodyWireType::Base64Url) {
                    let decoded = base64::Engine::decode(
                        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                        &bytes,
                    )
                    .map_err(|e| Error::decoding(format!("invalid base64url body: {e}")))?;
                    bytes::Bytes::from(decoded)
                } else {
                    bytes
                };
                Ok(InvocationResult::Bytes(bytes))
            }
            ReturnShape::Boolean => {
                response.drain().await;
                Ok(InvocationResult::Boolean((200..300).contains(&response.status)))
            }
            ReturnShape::Envelope => {
                let headers = self.decoder.headers(&response);
                let body = self.decoder.body(&response, plan, self.codec.as_ref()).await?;
                Ok(InvocationResult::Envelope { status: response.status, headers, body })
            }
            ReturnShape::Typed => {
                let body = self.decoder.body(&response, plan, self.codec.as_ref()).await?;
                Ok(InvocationResult::Typed(body))
            }
        }
    }
}

/// Formats the body for an `UnexpectedStatus` message: the decoded JSON if
/// available, or a placeholder (`(empty body)` / `(N-byte body)`) for a body
/// that isn't textual JSON. Placeholders are rendered unquoted by
/// [`Error::format_status_message`]; real body text is quoted.
async fn display_body(response: &crate::http::HttpResponse, decoded: &Option<serde_json::Value>) -> BodyDisplay {
    if let Some(value) = decoded {
        return BodyDisplay::Text(value.to_string());
    }
    match response.bytes().await {
        Ok(bytes) if bytes.is_empty() => BodyDisplay::Placeholder("(empty body)".to_string()),
        Ok(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => BodyDisplay::Text(text.to_string()),
            Err(_) => BodyDisplay::Placeholder(format!("({}-byte body)", bytes.len())),
        },
        Err(_) => BodyDisplay::Placeholder("(empty body)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ArgValue;
    use crate::codec::DefaultCodec;
    use crate::http::{HttpHeaders, HttpRequest, HttpResponse, Verb};
    use crate::plan::{BodyWireType, ErrorDescriptor, ParamBinding};
    use crate::policy::PipelineOptions;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    struct ScriptedTransport {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
            let mut headers = HttpHeaders::new();
            headers.set("Content-Type", "application/json");
            Ok(HttpResponse::from_bytes(
                self.status,
                headers,
                bytes::Bytes::from_static(self.body.as_bytes()),
                Arc::new(request.snapshot()),
            ))
        }
    }

    fn registry_with(plan: MethodPlan) -> Arc<MethodPlanRegistry> {
        Arc::new(MethodPlanRegistry::from_plans(vec![plan]))
    }

    fn get_item_plan() -> MethodPlan {
        MethodPlan {
            operation_id: "getItem".to_string(),
            verb: Verb::Get,
            url_template: "https://host/items/{id}".to_string(),
            bindings: vec![ParamBinding::Path {
                placeholder: "id".to_string(),
                encoding: crate::url::EncodingPolicy::Encoded,
            }],
            expected_status: BTreeSet::from([200]),
            error: ErrorDescriptor { error_type: "GetItemError".to_string(), error_body_type: None },
            return_shape: ReturnShape::Typed,
            response_wire_type: Some(BodyWireType::Json),
            request_content_type: None,
        }
    }

    fn engine_for(status: u16, body: &'static str, plan: MethodPlan) -> InvocationEngine<DefaultCodec> {
        let registry = registry_with(plan);
        let pipeline = Arc::new(Pipeline::new(
            vec![],
            Arc::new(ScriptedTransport { status, body }),
            PipelineOptions::default(),
        ));
        InvocationEngine::new(registry, pipeline, Arc::new(DefaultCodec))
    }

    #[tokio::test]
    async fn success_decodes_typed_body() {
        let engine = engine_for(200, r#"{"id":"abc"}"#, get_item_plan());
        let args = CallArgs::new().with("id", ArgValue::Text("abc".to_string()));
        let result = engine
            .invoke("getItem", args, &InvocationOptions::default())
            .await
            .unwrap();
        let InvocationResult::Typed(Some(value)) = result else {
            panic!("expected a typed body")
        };
        assert_eq!(value, serde_json::json!({"id": "abc"}));
    }

    #[tokio::test]
    async fn unexpected_status_surfaces_decoded_body_in_message() {
        let engine = engine_for(404, r#"{"error":"not found"}"#, get_item_plan());
        let args = CallArgs::new().with("id", ArgValue::Text("missing".to_string()));
        let err = engine
            .invoke("getItem", args, &InvocationOptions::default())
            .await
            .unwrap_err();
        let Error::UnexpectedStatus { status, message, .. } = err else {
            panic!("expected UnexpectedStatus")
        };
        assert_eq!(status, 404);
        assert!(message.contains("not found"));
    }

    #[tokio::test]
    async fn unexpected_status_renders_empty_body_placeholder_unquoted() {
        let engine = engine_for(404, "", get_item_plan());
        let args = CallArgs::new().with("id", ArgValue::Text("missing".to_string()));
        let err = engine
            .invoke("getItem", args, &InvocationOptions::default())
            .await
            .unwrap_err();
        let Error::UnexpectedStatus { status, message, .. } = err else {
            panic!("expected UnexpectedStatus")
        };
        assert_eq!(status, 404);
        assert_eq!(message, "Status code 404, (empty body)");
    }

    #[tokio::test]
    async fn per_call_extra_allowed_status_accepts_otherwise_unexpected_code() {
        let engine = engine_for(202, r#"{"id":"abc"}"#, get_item_plan());
        let args = CallArgs::new().with("id", ArgValue::Text("abc".to_string()));
        let options = InvocationOptions { extra_allowed_status: vec![202] };
        let result = engine.invoke("getItem", args, &options).await.unwrap();
        assert!(matches!(result, InvocationResult::Typed(_)));
    }

    #[tokio::test]
    async fn head_return_shape_is_boolean_success() {
        let mut plan = get_item_plan();
        plan.verb = Verb::Head;
        plan.return_shape = ReturnShape::Boolean;
        let engine = engine_for(200, "", plan);
        let args = CallArgs::new().with("id", ArgValue::Text("abc".to_string()));
        let result = engine
            .invoke("getItem", args, &InvocationOptions::default())
            .await
            .unwrap();
        assert!(matches!(result, InvocationResult::Boolean(true)));
    }

    #[tokio::test]
    async fn unregistered_operation_is_bad_description() {
        let engine = engine_for(200, "{}", get_item_plan());
        let err = engine
            .invoke("noSuchOperation", CallArgs::new(), &InvocationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "BadDescription");
    }
}
