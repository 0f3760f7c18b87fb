//! A [`reqwest`]-backed [`Transport`]: translates this crate's
//! own request/response value types at the one seam where they have to meet
//! a concrete HTTP stack.

use crate::error::Error;
use crate::http::headers::HttpHeaders;
use crate::http::request::{BodyChunk, BodyStream, RequestBody};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Timeouts applied to every request issued through this transport, split
/// between connect and overall-request budgets.
#[derive(Debug, Clone)]
pub struct TransportTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` fails to build.
    pub fn new(timeouts: &TransportTimeouts) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}"), false))?;
        Ok(Self { client })
    }

    /// Wraps an already-configured client, e.g. one sharing a connection
    /// pool with other transports in the same process.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(&TransportTimeouts::default()).expect("default reqwest client builds")
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let back_reference = Arc::new(request.snapshot());
        crate::logging::log_request(&back_reference, None);
        let started = std::time::Instant::now();

        let mut builder = self
            .client
            .request(request.verb.reqwest_method(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let mut headers = HttpHeaders::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }

        let body_stream: BodyStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| -> BodyChunk { chunk.map_err(map_reqwest_error) }),
        );

        let response = HttpResponse::new(status, headers, body_stream, back_reference);
        crate::logging::log_response(&response, started.elapsed().as_millis(), None);
        Ok(response)
    }
}

/// Classifies a `reqwest::Error` into our transport-failure taxonomy
///, deciding
/// retryability the same way the teacher's resilience layer did.
fn map_reqwest_error(err: reqwest::Error) -> Error {
    let retryable = err.is_connect() || err.is_timeout();
    Error::transport(err.to_string(), retryable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_are_sane() {
        let timeouts = TransportTimeouts::default();
        assert!(timeouts.connect < timeouts.request);
    }
}
