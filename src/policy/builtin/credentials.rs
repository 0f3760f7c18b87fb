//! Signs outgoing requests via an injected credential provider, and recognizes the one specific re-authentication
//! signal the spec calls out: a 401 response whose error code is
//! `AuthenticationFailed` and whose message announces an expired or missing
//! access token. That one retry is refreshed-and-resent without charging the
//! [`crate::policy::builtin::retry::RetryPolicy`] budget.

use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Consumed by [`CredentialsPolicy`]. Implementations own their own token
/// caching; `sign` and `refresh` are both fallible async operations.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Attaches whatever the scheme requires (typically an `Authorization`
    /// header) to `request`.
    ///
    /// # Errors
    /// Returns an error if a credential cannot be obtained or applied.
    async fn sign(&self, request: &mut crate::http::HttpRequest) -> Result<(), Error>;

    /// Forces the next `sign` call to use a freshly obtained credential.
    ///
    /// # Errors
    /// Returns an error if the refresh itself fails.
    async fn refresh(&self) -> Result<(), Error>;
}

/// The default provider for clients with no authentication scheme: signs
/// nothing, refreshes trivially.
pub struct NoopCredentialProvider;

#[async_trait]
impl CredentialProvider for NoopCredentialProvider {
    async fn sign(&self, _request: &mut crate::http::HttpRequest) -> Result<(), Error> {
        Ok(())
    }

    async fn refresh(&self) -> Result<(), Error> {
        Ok(())
    }
}

pub struct CredentialsPolicy {
    provider: Arc<dyn CredentialProvider>,
}

impl CredentialsPolicy {
    #[must_use]
    pub const fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }
}

const EXPIRY_PREFIXES: [&str; 2] = [
    "The access token expiry",
    "The access token is missing or invalid",
];

/// Checks whether a 401 response matches the specific re-authentication
/// signal the spec defines. Buffers the body first so that, whichever way
/// this resolves, the body is still readable downstream (status validation,
/// decoding) instead of being left consumed.
async fn is_token_expired(response: &HttpResponse) -> bool {
    if response.status != 401 {
        return false;
    }
    if response.buffer().await.is_err() {
        return false;
    }
    let Ok(bytes) = response.bytes().await else {
        return false;
    };
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return false;
    };
    let code = body
        .pointer("/error/code")
        .or_else(|| body.pointer("/code"))
        .and_then(serde_json::Value::as_str);
    let message = body
        .pointer("/error/message")
        .or_else(|| body.pointer("/message"))
        .and_then(serde_json::Value::as_str);
    code == Some("AuthenticationFailed")
        && message.is_some_and(|m| EXPIRY_PREFIXES.iter().any(|prefix| m.starts_with(prefix)))
}

#[async_trait]
impl Policy for CredentialsPolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        self.provider.sign(&mut ctx.request).await?;
        let response = next.retry_token().run(ctx).await?;

        if is_token_expired(&response).await {
            self.provider.refresh().await?;
            self.provider.sign(&mut ctx.request).await?;
            return next.run(ctx).await;
        }

        Ok(response)
    }

    fn name(&self) -> &'static str {
        "CredentialsPolicy"
    }
}
