//! `HttpRequest` value type.

use crate::http::headers::HttpHeaders;
use bytes::Bytes;
use std::fmt;
use std::pin::Pin;

use futures_core::Stream;

pub type BodyChunk = Result<Bytes, crate::error::Error>;
pub type BodyStream = Pin<Box<dyn Stream<Item = BodyChunk> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Verb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    #[must_use]
    pub fn reqwest_method(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The request body as it stands before dispatch. `Stream` bodies are opaque
/// to everything but the transport: the builder never inspects their bytes.
pub enum RequestBody {
    None,
    Bytes(Bytes),
    Text(String),
    Stream(BodyStream),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "RequestBody::None"),
            Self::Bytes(b) => write!(f, "RequestBody::Bytes({} bytes)", b.len()),
            Self::Text(t) => write!(f, "RequestBody::Text({} chars)", t.chars().count()),
            Self::Stream(_) => write!(f, "RequestBody::Stream(..)"),
        }
    }
}

impl RequestBody {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// One HTTP exchange's outgoing half. Mutable until dispatch; policies clone
/// the parts they need to retry rather than mutate a shared instance.
#[derive(Debug)]
pub struct HttpRequest {
    pub verb: Verb,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: RequestBody,
}

impl HttpRequest {
    #[must_use]
    pub fn new(verb: Verb, url: impl Into<String>) -> Self {
        Self {
            verb,
            url: url.into(),
            headers: HttpHeaders::new(),
            body: RequestBody::None,
        }
    }

    /// Called once the Request Builder is done assembling the request
    ///. Enforces the header invariant from §3.
    ///
    /// # Errors
    /// Returns an error if `Content-Length` and `Transfer-Encoding` are both set.
    pub fn finalize(self) -> Result<Self, crate::error::Error> {
        self.headers.check_length_encoding_exclusive()?;
        Ok(self)
    }

    /// Best-effort clone for retry: stream bodies cannot be cloned, so a
    /// request carrying one can only be retried by a policy that captured
    /// the original arguments and rebuilds the request from scratch.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        let body = match &self.body {
            RequestBody::None => RequestBody::None,
            RequestBody::Bytes(b) => RequestBody::Bytes(b.clone()),
            RequestBody::Text(t) => RequestBody::Text(t.clone()),
            RequestBody::Stream(_) => return None,
        };
        Some(Self {
            verb: self.verb,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
        })
    }

    /// An infallible clone for attaching as a response's back-reference
    ///: stream bodies are dropped since the original bytes
    /// already went out over the wire and cannot be replayed for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.try_clone().unwrap_or_else(|| Self {
            verb: self.verb,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: RequestBody::None,
        })
    }
}
