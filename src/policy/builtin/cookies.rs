//! Per-pipeline cookie jar: the sole policy-owned shared
//! mutable state, so it lives behind a lock rather than inside `PolicyContext`.

use crate::constants::{HEADER_COOKIE, HEADER_SET_COOKIE};
use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// A name/value jar, scoped to one host. Attribute handling (`Domain`,
/// `Path`, `Expires`) is deliberately out of scope: this mirrors the
/// teacher's "keep the smallest thing that satisfies the invariant" style
/// rather than reimplementing a full cookie specification.
#[derive(Default)]
struct Jar {
    by_host: HashMap<String, HashMap<String, String>>,
}

impl Jar {
    fn cookie_header(&self, host: &str) -> Option<String> {
        let cookies = self.by_host.get(host)?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn harvest(&mut self, host: &str, set_cookie_values: &[String]) {
        if set_cookie_values.is_empty() {
            return;
        }
        let entry = self.by_host.entry(host.to_string()).or_default();
        for raw in set_cookie_values {
            if let Some((name, value)) = raw.split(';').next().and_then(|pair| pair.split_once('=')) {
                entry.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }
}

pub struct CookiePolicy {
    jar: Mutex<Jar>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl CookiePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jar: Mutex::new(Jar::default()),
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string))
}

#[async_trait]
impl Policy for CookiePolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        let Some(host) = host_of(&ctx.request.url) else {
            return next.run(ctx).await;
        };

        {
            let jar = self.jar.lock().await;
            if let Some(header) = jar.cookie_header(&host) {
                ctx.request.headers.set(HEADER_COOKIE, header);
            }
        }

        let response = next.run(ctx).await?;
        let set_cookie_values = response.headers.get_all(HEADER_SET_COOKIE);
        if !set_cookie_values.is_empty() {
            let mut jar = self.jar.lock().await;
            jar.harvest(&host, set_cookie_values);
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "CookiePolicy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harvests_and_replays_cookies() {
        let mut jar = Jar::default();
        jar.harvest("example.test", &["session=abc; Path=/".to_string()]);
        assert_eq!(jar.cookie_header("example.test"), Some("session=abc".to_string()));
        assert_eq!(jar.cookie_header("other.test"), None);
    }

    #[test]
    fn later_values_override_same_name() {
        let mut jar = Jar::default();
        jar.harvest("example.test", &["a=1".to_string()]);
        jar.harvest("example.test", &["a=2".to_string()]);
        assert_eq!(jar.cookie_header("example.test"), Some("a=2".to_string()));
    }
}
