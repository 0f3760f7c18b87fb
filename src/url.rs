//! Assembles request URLs from scheme/host/path/query fragments with
//! percent-encoding rules.

use crate::error::Error;

/// How a placeholder's substituted value should be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingPolicy {
    /// Percent-encode reserved characters (the normal case for a path
    /// segment or query value).
    Encoded,
    /// Insert the value verbatim — used for the paging-link case where a
    /// whole absolute URL is substituted in place of a path placeholder.
    Raw,
}

/// Returns `true` if `value` parses as an absolute URL (has a scheme). Used
/// for the paging-link override, where a Path binding's argument can be a
/// whole next-page URL rather than a plain segment value.
#[must_use]
pub fn is_absolute(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| !u.cannot_be_a_base() || u.scheme() != "")
}

/// A URL under construction: scheme, host, path template, and an ordered
/// list of query parameters appended as they're declared.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    scheme: String,
    host: String,
    path: String,
    query: Vec<(String, String, EncodingPolicy)>,
}

impl UrlBuilder {
    #[must_use]
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Parses `template` into scheme/host/path, for the common case where a
    /// `MethodPlan`'s URL template is a full `scheme://host/path` string.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if `template` has no scheme.
    pub fn from_template(template: &str) -> Result<Self, Error> {
        let parsed = url::Url::parse(template)
            .map_err(|e| Error::bad_description(format!("invalid URL template '{template}': {e}")))?;
        Ok(Self::new(
            parsed.scheme(),
            parsed.host_str().unwrap_or_default(),
            parsed.path(),
        ))
    }

    /// Parses an already-absolute URL `value` into scheme/host/path/query,
    /// for the paging-link case. The existing query string is preserved so
    /// subsequent Query bindings can still append to or override it.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if `value` is not a valid absolute URL.
    pub fn from_absolute(value: &str) -> Result<Self, Error> {
        let parsed = url::Url::parse(value)
            .map_err(|e| Error::bad_description(format!("invalid absolute URL '{value}': {e}")))?;
        let query = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned(), EncodingPolicy::Encoded))
            .collect();
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: parsed.host_str().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
            query,
        })
    }

    /// Overrides the host (and optionally scheme), per a Host-parameter
    /// binding.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Substitutes every `{name}` placeholder in the path with `value`,
    /// applying `policy`. Unreferenced placeholders are left as errors at
    /// `build()` time, not here, since one call may need several substitutions.
    pub fn substitute_path(&mut self, name: &str, value: &str, policy: EncodingPolicy) {
        let encoded = match policy {
            EncodingPolicy::Encoded => encode_path_segment(value),
            EncodingPolicy::Raw => value.to_string(),
        };
        self.path = self.path.replace(&format!("{{{name}}}"), &encoded);
    }

    /// Appends (or overrides) a query parameter. Declaration order is
    /// preserved.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>, policy: EncodingPolicy) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.query.iter_mut().find(|(k, _, _)| *k == key) {
            existing.1 = value;
            existing.2 = policy;
        } else {
            self.query.push((key, value, policy));
        }
    }

    /// Finds every `{name}` placeholder remaining in the path template.
    #[must_use]
    pub fn remaining_placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            names.push(rest[open + 1..open + close].to_string());
            rest = &rest[open + close + 1..];
        }
        names
    }

    /// Builds the final URL string.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if a path placeholder was never substituted.
    pub fn build(&self) -> Result<String, Error> {
        if let Some(missing) = self.remaining_placeholders().into_iter().next() {
            return Err(Error::bad_description(format!(
                "unresolved path placeholder '{{{missing}}}'"
            )));
        }
        let mut out = format!("{}://{}{}", self.scheme, self.host, self.path);
        if !self.query.is_empty() {
            out.push('?');
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v, policy)| {
                    let key = encode_query_component(k);
                    let value = match policy {
                        EncodingPolicy::Encoded => encode_query_component(v),
                        EncodingPolicy::Raw => v.clone(),
                    };
                    format!("{key}={value}")
                })
                .collect();
            out.push_str(&pairs.join("&"));
        }
        Ok(out)
    }
}

/// Percent-encodes a path segment, preserving `/` so multi-segment values
/// (e.g. a captured sub-path) still read naturally.
fn encode_path_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '-' | '_' | '.' | '~' => c.to_string(),
            c if c.is_ascii_alphanumeric() => c.to_string(),
            c => urlencoding::encode(&c.to_string()).into_owned(),
        })
        .collect()
}

fn encode_query_component(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_simple_path() {
        let mut b = UrlBuilder::new("https", "host", "/items/{id}");
        b.substitute_path("id", "abc", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://host/items/abc");
    }

    #[test]
    fn build_fails_on_unresolved_placeholder() {
        let b = UrlBuilder::new("https", "host", "/items/{id}");
        assert!(b.build().is_err());
    }

    #[test]
    fn query_params_are_appended_in_declaration_order() {
        let mut b = UrlBuilder::new("https", "host", "/items");
        b.set_query("b", "2", EncodingPolicy::Encoded);
        b.set_query("a", "1", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://host/items?b=2&a=1");
    }

    #[test]
    fn query_params_override_by_key() {
        let mut b = UrlBuilder::new("https", "host", "/items");
        b.set_query("page", "1", EncodingPolicy::Encoded);
        b.set_query("page", "2", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://host/items?page=2");
    }

    #[test]
    fn path_segment_encoding_preserves_slashes() {
        let mut b = UrlBuilder::new("https", "host", "/items/{path}");
        b.substitute_path("path", "a/b c", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://host/items/a/b%20c");
    }

    #[test]
    fn detects_absolute_urls_for_paging_links() {
        assert!(is_absolute("https://other/host/page2?x=1"));
        assert!(!is_absolute("/relative/path"));
    }

    #[test]
    fn from_absolute_preserves_existing_query_and_allows_additions() {
        let mut b = UrlBuilder::from_absolute("https://other/host/page2?x=1").unwrap();
        assert_eq!(b.build().unwrap(), "https://other/host/page2?x=1");
        b.set_query("y", "2", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://other/host/page2?x=1&y=2");
    }

    #[test]
    fn raw_policy_skips_encoding() {
        let mut b = UrlBuilder::new("https", "host", "/search/{q}");
        b.substitute_path("q", "a+b", EncodingPolicy::Raw);
        assert_eq!(b.build().unwrap(), "https://host/search/a+b");
    }

    #[test]
    fn raw_query_value_is_not_percent_encoded() {
        let mut b = UrlBuilder::new("https", "host", "/items");
        b.set_query("filter", "a+b=c", EncodingPolicy::Raw);
        assert_eq!(b.build().unwrap(), "https://host/items?filter=a+b=c");
    }

    #[test]
    fn encoded_query_value_is_percent_encoded() {
        let mut b = UrlBuilder::new("https", "host", "/items");
        b.set_query("filter", "a+b=c", EncodingPolicy::Encoded);
        assert_eq!(b.build().unwrap(), "https://host/items?filter=a%2Bb%3Dc");
    }
}
