//! Built-in policies: retry, credentials, cookies, user-agent,
//! request-id, and response decoding.

pub mod cookies;
pub mod credentials;
pub mod decoding;
pub mod request_id;
pub mod retry;
pub mod user_agent;

pub use cookies::CookiePolicy;
pub use credentials::{CredentialProvider, CredentialsPolicy, NoopCredentialProvider};
pub use decoding::DecodingPolicy;
pub use request_id::RequestIdPolicy;
pub use retry::{RetryConfig, RetryPolicy};
pub use user_agent::UserAgentPolicy;
