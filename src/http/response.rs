//! `HttpResponse` value type.
//!
//! The body is a lazy chunk stream that can be consumed at most once unless
//! wrapped by [`HttpResponse::buffered`]. The two decoder side-channels
//! (`deserialized_headers` / `deserialized_body`) are [`OnceCell`]s so that
//! multiple observers share one materialization.

use crate::error::Error;
use crate::http::headers::HttpHeaders;
use crate::http::request::{BodyChunk, BodyStream};
use crate::http::HttpRequest;
use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::OnceCell;

/// Body storage: either not yet taken (`Some`), already taken by a direct
/// consumer (`None`), or eagerly buffered into memory.
enum BodyState {
    Lazy(BodyStream),
    Buffered(Bytes),
    Taken,
}

pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub request: std::sync::Arc<HttpRequest>,
    body: Mutex<BodyState>,
    pub(crate) deserialized_headers: OnceCell<serde_json::Value>,
    pub(crate) deserialized_body: OnceCell<Option<serde_json::Value>>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    #[must_use]
    pub fn new(
        status: u16,
        headers: HttpHeaders,
        body: BodyStream,
        request: std::sync::Arc<HttpRequest>,
    ) -> Self {
        Self {
            status,
            headers,
            request,
            body: Mutex::new(BodyState::Lazy(body)),
            deserialized_headers: OnceCell::new(),
            deserialized_body: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_bytes(
        status: u16,
        headers: HttpHeaders,
        bytes: Bytes,
        request: std::sync::Arc<HttpRequest>,
    ) -> Self {
        Self {
            status,
            headers,
            request,
            body: Mutex::new(BodyState::Buffered(bytes)),
            deserialized_headers: OnceCell::new(),
            deserialized_body: OnceCell::new(),
        }
    }

    /// Consumes the body stream, returning its bytes. Fails if the body was
    /// already taken by a prior call, unless the response was produced via
    /// [`Self::buffered`].
    ///
    /// # Errors
    /// Returns an error if the body was already consumed, or if reading fails.
    pub async fn bytes(&self) -> Result<Bytes, Error> {
        let state = {
            let mut guard = self.body.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::replace(&mut *guard, BodyState::Taken)
        };
        match state {
            BodyState::Buffered(bytes) => {
                // Buffered responses are replayable: put the bytes back.
                *self.body.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    BodyState::Buffered(bytes.clone());
                Ok(bytes)
            }
            BodyState::Lazy(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
            BodyState::Taken => Err(Error::decoding("response body already consumed")),
        }
    }

    /// Materializes the body as text, decoding the charset named in
    /// `Content-Type` if present (UTF-8 otherwise).
    ///
    /// # Errors
    /// Returns an error if the body was already consumed or is not valid text
    /// in the declared (or default) charset.
    pub async fn text(&self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        let content_type = self.headers.get(crate::constants::HEADER_CONTENT_TYPE);
        let charset = content_type.and_then(crate::constants::charset);
        match charset {
            None | Some("utf-8") | Some("UTF-8") => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::decoding(format!("response body is not valid UTF-8: {e}"))),
            Some(other) => Err(Error::decoding(format!(
                "unsupported response charset '{other}'"
            ))),
        }
    }

    /// Discards the body without materializing it (used when the return
    /// shape is `Void` or the status check fails closed without a caller
    /// ever wanting the bytes).
    pub async fn drain(&self) {
        let _ = self.bytes().await;
    }

    /// Eagerly drains the body into memory and re-exposes it as a replayable
    /// stream.
    ///
    /// # Errors
    /// Returns an error if the underlying stream fails while draining.
    pub async fn buffer(&self) -> Result<(), Error> {
        let bytes = self.bytes().await?;
        *self.body.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            BodyState::Buffered(bytes);
        Ok(())
    }

    /// Returns a fresh stream over the body, which must be unread (or
    /// buffered). Consumes the lazy stream if it hasn't been read yet.
    #[must_use]
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = BodyChunk> + Send>> {
        let state = std::mem::replace(
            &mut *self
                .body
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            BodyState::Taken,
        );
        match state {
            BodyState::Lazy(stream) => stream,
            BodyState::Buffered(bytes) => Box::pin(futures_util::stream::once(async move {
                Ok(bytes)
            })),
            BodyState::Taken => Box::pin(futures_util::stream::empty()),
        }
    }
}
