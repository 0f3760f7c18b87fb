//! Wraps the response with the deserialized-headers/body lazy handles so
//! downstream observers can read typed data without re-reading the wire
//!.

use crate::decoder::ResponseDecoder;
use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;
use std::sync::Arc;

pub struct DecodingPolicy {
    decoder: Arc<ResponseDecoder>,
}

impl DecodingPolicy {
    #[must_use]
    pub const fn new(decoder: Arc<ResponseDecoder>) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl Policy for DecodingPolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        let response = next.run(ctx).await?;
        self.decoder.attach_headers(&response);
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "DecodingPolicy"
    }
}
