//! Builds a concrete [`HttpRequest`] from a [`MethodPlan`] and call-site
//! arguments, implementing the algorithm
//! step for step.

use crate::codec::{encoding_from_content_type, Codec, Encoding};
use crate::constants::{CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET_STREAM};
use crate::error::Error;
use crate::http::request::BodyStream;
use crate::http::{HttpRequest, RequestBody};
use crate::plan::{BodyWireType, HeaderBindingName, MethodPlan, ParamBinding};
use crate::url::{EncodingPolicy, UrlBuilder};
use std::collections::HashMap;

/// One call-site argument. Rust has no runtime reflection over the plan's
/// declared bindings, so the caller supplies a value per binding, keyed by
/// [`binding_key`].
pub enum ArgValue {
    Null,
    Text(String),
    Bytes(bytes::Bytes),
    Json(serde_json::Value),
    Stream(BodyStream),
    /// A mapping argument, for a Header binding declared as "expand from
    /// mapping".
    Headers(indexmap::IndexMap<String, String>),
}

impl ArgValue {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Json(serde_json::Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The full set of arguments for one call, keyed by [`binding_key`].
#[derive(Default)]
pub struct CallArgs {
    values: HashMap<String, ArgValue>,
}

impl CallArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: ArgValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    /// Removes and returns an argument by value. Used for stream bodies,
    /// which can only be moved once onto the request.
    pub fn take(&mut self, key: &str) -> Option<ArgValue> {
        self.values.remove(key)
    }
}

/// The stable key a caller uses to supply the argument for one binding.
/// Path/Query/Header bindings key by their own name; `Body` uses a fixed
/// sentinel since a plan carries at most one; `HostParam` is namespaced to
/// avoid colliding with a `Path` binding of the same placeholder name.
#[must_use]
pub fn binding_key(binding: &ParamBinding) -> String {
    match binding {
        ParamBinding::Path { placeholder, .. } => placeholder.clone(),
        ParamBinding::Query { key, .. } => key.clone(),
        ParamBinding::Header { name: HeaderBindingName::Fixed(name) } => name.clone(),
        ParamBinding::Header { name: HeaderBindingName::ExpandMapping { prefix } } => prefix.clone(),
        ParamBinding::Body { .. } => "$body".to_string(),
        ParamBinding::HostParam { placeholder } => format!("$host:{placeholder}"),
        ParamBinding::Context { key } => key.clone(),
    }
}

pub struct RequestBuilder<'a, C: Codec> {
    codec: &'a C,
}

impl<'a, C: Codec> RequestBuilder<'a, C> {
    #[must_use]
    pub const fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    /// Builds the request, returning it alongside the Context bindings'
    /// contributions.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if a path placeholder is left
    /// unresolved, or [`Error::Serialization`] if the body can't be encoded.
    pub fn build(
        &self,
        plan: &MethodPlan,
        args: &mut CallArgs,
    ) -> Result<(HttpRequest, Vec<(String, serde_json::Value)>), Error> {
        let mut url_builder = self.resolve_url(plan, args)?;

        for binding in &plan.bindings {
            if let ParamBinding::Query { key, encoding } = binding {
                let value = args.get(key).and_then(ArgValue::as_text).unwrap_or_default();
                url_builder.set_query(key, value, *encoding);
            }
        }

        let url = url_builder.build()?;
        let mut request = HttpRequest::new(plan.verb, url);

        self.resolve_body(plan, args, &mut request)?;
        self.apply_headers(plan, args, &mut request);

        let request = request.finalize()?;
        let context_entries = self.collect_context(plan, args);
        Ok((request, context_entries))
    }

    /// Step 1: evaluate the Path binding(s). A value that parses as an
    /// absolute URL is adopted verbatim, skipping host/scheme resolution
    /// (the paging-link case); otherwise the plan's
    /// URL template is substituted from host-parameter overrides and every
    /// Path binding's argument.
    fn resolve_url(&self, plan: &MethodPlan, args: &CallArgs) -> Result<UrlBuilder, Error> {
        for binding in &plan.bindings {
            if let ParamBinding::Path { placeholder, .. } = binding {
                if let Some(value) = args.get(placeholder).and_then(ArgValue::as_text) {
                    if crate::url::is_absolute(value) {
                        return UrlBuilder::from_absolute(value);
                    }
                }
            }
        }

        let mut url_builder = UrlBuilder::from_template(&plan.url_template)?;

        for binding in &plan.bindings {
            if let ParamBinding::HostParam { placeholder } = binding {
                let key = binding_key(binding);
                if let Some(value) = args.get(&key).and_then(ArgValue::as_text) {
                    if value.contains("://") {
                        if let Ok(parsed) = url::Url::parse(value) {
                            url_builder = url_builder.with_scheme(parsed.scheme());
                            if let Some(host) = parsed.host_str() {
                                url_builder = url_builder.with_host(host);
                            }
                            continue;
                        }
                    }
                    url_builder = url_builder.with_host(value);
                }
                let _ = placeholder;
            }
        }

        for binding in &plan.bindings {
            if let ParamBinding::Path { placeholder, encoding } = binding {
                let value = args.get(placeholder).and_then(ArgValue::as_text).unwrap_or_default();
                url_builder.substitute_path(placeholder, value, *encoding);
            }
        }

        Ok(url_builder)
    }

    /// Steps 3-4: resolve the body, inferring and setting `Content-Type`
    /// (or `Content-Length: 0` when there is none).
    fn resolve_body(&self, plan: &MethodPlan, args: &mut CallArgs, request: &mut HttpRequest) -> Result<(), Error> {
        let Some(ParamBinding::Body { wire_type }) = plan.bindings.iter().find(|b| matches!(b, ParamBinding::Body { .. })) else {
            request.headers.set(crate::constants::HEADER_CONTENT_LENGTH, "0");
            return Ok(());
        };
        let wire_type = *wire_type;

        if args.get("$body").is_none_or(ArgValue::is_null) {
            request.headers.set(crate::constants::HEADER_CONTENT_LENGTH, "0");
            return Ok(());
        }

        let content_type = plan
            .request_content_type
            .clone()
            .unwrap_or_else(|| match wire_type {
                BodyWireType::Bytes | BodyWireType::Text => CONTENT_TYPE_OCTET_STREAM.to_string(),
                _ => CONTENT_TYPE_JSON.to_string(),
            });
        request.headers.set(crate::constants::HEADER_CONTENT_TYPE, &content_type);

        if matches!(wire_type, BodyWireType::Stream) {
            return match args.take("$body") {
                Some(ArgValue::Stream(stream)) => {
                    request.body = RequestBody::Stream(stream);
                    Ok(())
                }
                _ => Err(Error::bad_description(
                    "Body binding declared as a stream but the argument is not a stream",
                )),
            };
        }

        let arg = args.get("$body").expect("checked non-null above");

        if crate::constants::is_json_content_type(&content_type) {
            let value = match arg {
                ArgValue::Json(v) => v.clone(),
                ArgValue::Text(s) => serde_json::Value::String(s.clone()),
                _ => return Err(Error::serialization(format!(
                    "body argument is not JSON-serializable for Content-Type '{content_type}'"
                ))),
            };
            let bytes = self.codec.serialize(&value, Encoding::Json)?;
            request.body = RequestBody::Bytes(bytes.into());
            return Ok(());
        }

        match arg {
            ArgValue::Bytes(b) => {
                request.body = RequestBody::Bytes(b.clone());
                Ok(())
            }
            ArgValue::Text(s) if !s.is_empty() => {
                request.body = RequestBody::Text(s.clone());
                Ok(())
            }
            _ => {
                let encoding = encoding_from_content_type(&content_type)?;
                let value = match arg {
                    ArgValue::Json(v) => v.clone(),
                    ArgValue::Text(s) => serde_json::Value::String(s.clone()),
                    _ => return Err(Error::serialization("body argument cannot be encoded")),
                };
                let bytes = self.codec.serialize(&value, encoding)?;
                request.body = RequestBody::Bytes(bytes.into());
                Ok(())
            }
        }
    }

    /// Step 5: header bindings apply last, overriding any inferred header
    /// including `Content-Type`.
    fn apply_headers(&self, plan: &MethodPlan, args: &CallArgs, request: &mut HttpRequest) {
        for binding in &plan.bindings {
            match binding {
                ParamBinding::Header { name: HeaderBindingName::Fixed(name) } => {
                    if let Some(value) = args.get(name).and_then(ArgValue::as_text) {
                        request.headers.set(name, value);
                    }
                }
                ParamBinding::Header { name: HeaderBindingName::ExpandMapping { prefix } } => {
                    if let Some(ArgValue::Headers(map)) = args.get(prefix) {
                        for (key, value) in map {
                            request.headers.set(format!("{prefix}{key}"), value);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_context(&self, plan: &MethodPlan, args: &CallArgs) -> Vec<(String, serde_json::Value)> {
        plan.bindings
            .iter()
            .filter_map(|binding| match binding {
                ParamBinding::Context { key } => {
                    let value = match args.get(key) {
                        Some(ArgValue::Json(v)) => v.clone(),
                        Some(ArgValue::Text(s)) => serde_json::Value::String(s.clone()),
                        _ => return None,
                    };
                    Some((key.clone(), value))
                }
                _ => None,
            })
            .collect()
    }
}
