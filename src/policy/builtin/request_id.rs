//! Sets `x-ms-client-request-id` to a freshly generated v4 UUID unless the
//! caller already set one.

use crate::constants::HEADER_REQUEST_ID;
use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;

pub struct RequestIdPolicy;

#[async_trait]
impl Policy for RequestIdPolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        ctx.request
            .headers
            .set_if_absent(HEADER_REQUEST_ID, generate_request_id());
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "RequestIdPolicy"
    }
}

/// A v4 UUID built from `fastrand`, avoiding a dedicated uuid dependency for
/// what's otherwise sixteen random bytes with two fixed nibbles.
#[must_use]
fn generate_request_id() -> String {
    let mut bytes = [0u8; 16];
    for b in &mut bytes {
        *b = fastrand::u8(..);
    }
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_v4_markers() {
        let id = generate_request_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert!(parts[2].starts_with('4'));
        assert!(matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
