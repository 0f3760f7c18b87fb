//! The transport interface consumed by the pipeline: never throws
//! synchronously, and its async failure modes are `ConnectionFailed |
//! Timeout | ProtocolError`, all surfaced here as [`crate::error::Error::Transport`].

pub mod reqwest_transport;

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;

pub use reqwest_transport::ReqwestTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Takes the request by value so a lazy stream body can be moved onto
    /// the wire without the transport needing to clone it.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}
