//! Lazily produces the deserialized headers/body as callers observe them
//!.
//!
//! Decoding is memoized on the response's own [`tokio::sync::OnceCell`]
//! side-channels, so multiple observers of the same [`HttpResponse`] share
//! one materialization, matching the determinism requirement in §4.6.
//! Header decoding needs no plan or codec, so [`DecodingPolicy`](crate::policy::builtin::decoding::DecodingPolicy)
//! attaches it eagerly inside the pipeline; body decoding needs the plan's
//! declared wire type and a [`Codec`], so it happens later, once the
//! invocation engine has resolved both.

use crate::codec::{encoding_from_content_type, Codec};
use crate::error::Error;
use crate::http::HttpResponse;
use crate::plan::MethodPlan;

/// Stateless helper around [`HttpResponse`]'s decoder side-channels. One
/// instance is shared process-wide by [`DecodingPolicy`](crate::policy::builtin::decoding::DecodingPolicy).
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the header model and caches it on `response`, if not already
    /// cached. Synchronous: header mapping never needs I/O.
    pub fn attach_headers(&self, response: &HttpResponse) {
        if response.deserialized_headers.get().is_some() {
            return;
        }
        let value = header_model(&response.headers);
        let _ = response.deserialized_headers.set(value);
    }

    /// Returns the cached header model, computing and caching it first if
    /// [`Self::attach_headers`] hasn't run yet.
    #[must_use]
    pub fn headers(&self, response: &HttpResponse) -> serde_json::Value {
        if let Some(value) = response.deserialized_headers.get() {
            return value.clone();
        }
        let value = header_model(&response.headers);
        let _ = response.deserialized_headers.set(value.clone());
        value
    }

    /// Materializes and parses the body via the codec chosen by
    /// `Content-Type` (or the plan's declared response wire type), memoized
    /// across callers. An empty body, or one already consumed directly by
    /// the caller, maps to an empty handle.
    ///
    /// # Errors
    /// Returns [`Error::Decoding`] if the body is non-empty but cannot be
    /// parsed as the plan's declared response wire type.
    pub async fn body<C: Codec>(
        &self,
        response: &HttpResponse,
        plan: &MethodPlan,
        codec: &C,
    ) -> Result<Option<serde_json::Value>, Error> {
        if let Some(cached) = response.deserialized_body.get() {
            return Ok(cached.clone());
        }
        let decoded = decode_body(response, plan, codec).await?;
        let _ = response.deserialized_body.set(decoded.clone());
        Ok(decoded)
    }
}

async fn decode_body<C: Codec>(
    response: &HttpResponse,
    plan: &MethodPlan,
    codec: &C,
) -> Result<Option<serde_json::Value>, Error> {
    let Ok(bytes) = response.bytes().await else {
        return Ok(None);
    };
    if bytes.is_empty() {
        return Ok(None);
    }
    if let Some(crate::plan::BodyWireType::Base64Url) = plan.response_wire_type {
        return Ok(Some(serde_json::Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        )));
    }
    let content_type = response
        .headers
        .get(crate::constants::HEADER_CONTENT_TYPE)
        .unwrap_or(crate::constants::CONTENT_TYPE_JSON);
    let Ok(encoding) = encoding_from_content_type(content_type) else {
        return Ok(None);
    };
    let value: serde_json::Value = codec.deserialize(&bytes, encoding)?;
    Ok(Some(value))
}

fn header_model(headers: &crate::http::HttpHeaders) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        map.entry(name.to_string())
            .and_modify(|existing| promote_to_array(existing, value))
            .or_insert_with(|| serde_json::Value::String(value.to_string()));
    }
    serde_json::Value::Object(map)
}

fn promote_to_array(existing: &mut serde_json::Value, value: &str) {
    match existing {
        serde_json::Value::Array(items) => items.push(serde_json::Value::String(value.to_string())),
        serde_json::Value::String(first) => {
            *existing = serde_json::Value::Array(vec![
                serde_json::Value::String(std::mem::take(first)),
                serde_json::Value::String(value.to_string()),
            ]);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DefaultCodec;
    use crate::http::{HttpHeaders, HttpRequest, Verb};
    use crate::plan::{ErrorDescriptor, ReturnShape};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn plan() -> MethodPlan {
        MethodPlan {
            operation_id: "op".to_string(),
            verb: Verb::Get,
            url_template: "https://host/items".to_string(),
            bindings: vec![],
            expected_status: BTreeSet::from([200]),
            error: ErrorDescriptor { error_type: "OpError".to_string(), error_body_type: None },
            return_shape: ReturnShape::Typed,
            response_wire_type: None,
            request_content_type: None,
        }
    }

    #[test]
    fn attach_headers_is_idempotent_and_synchronous() {
        let mut headers = HttpHeaders::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("Set-Cookie", "b=2");
        let response = HttpResponse::from_bytes(
            200,
            headers,
            bytes::Bytes::new(),
            Arc::new(HttpRequest::new(Verb::Get, "https://host/items")),
        );
        let decoder = ResponseDecoder::new();
        decoder.attach_headers(&response);
        decoder.attach_headers(&response);
        let value = decoder.headers(&response);
        assert_eq!(value["Set-Cookie"], serde_json::json!(["a=1", "b=2"]));
    }

    #[tokio::test]
    async fn decodes_json_body_once_and_memoizes() {
        let mut headers = HttpHeaders::new();
        headers.set("Content-Type", "application/json");
        let response = HttpResponse::from_bytes(
            200,
            headers,
            bytes::Bytes::from_static(br#"{"id":"abc"}"#),
            Arc::new(HttpRequest::new(Verb::Get, "https://host/items")),
        );
        let plan = plan();
        let codec = DefaultCodec;
        let decoder = ResponseDecoder::new();
        let first = decoder.body(&response, &plan, &codec).await.unwrap();
        let second = decoder.body(&response, &plan, &codec).await.unwrap();
        assert_eq!(first, Some(serde_json::json!({"id": "abc"})));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_body_decodes_to_none() {
        let response = HttpResponse::from_bytes(
            204,
            HttpHeaders::new(),
            bytes::Bytes::new(),
            Arc::new(HttpRequest::new(Verb::Get, "https://host/items")),
        );
        let plan = plan();
        let codec = DefaultCodec;
        let decoder = ResponseDecoder::new();
        assert_eq!(decoder.body(&response, &plan, &codec).await.unwrap(), None);
    }

    #[tokio::test]
    async fn base64url_response_wire_type_decodes_as_a_string() {
        let mut plan = plan();
        plan.response_wire_type = Some(crate::plan::BodyWireType::Base64Url);
        let response = HttpResponse::from_bytes(
            200,
            HttpHeaders::new(),
            bytes::Bytes::from_static(b"YWJj"),
            Arc::new(HttpRequest::new(Verb::Get, "https://host/items")),
        );
        let codec = DefaultCodec;
        let decoder = ResponseDecoder::new();
        let value = decoder.body(&response, &plan, &codec).await.unwrap();
        assert_eq!(value, Some(serde_json::Value::String("YWJj".to_string())));
    }
}
