//! Centralized string constants used across the runtime.
//!
//! Keeping these in one place avoids typo-divergence between the policies,
//! the request builder and the response decoder, which all need to agree on
//! header names and content-type identifiers.

// HTTP Headers
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const HEADER_USER_AGENT: &str = "User-Agent";
pub const HEADER_COOKIE: &str = "Cookie";
pub const HEADER_SET_COOKIE: &str = "Set-Cookie";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";
pub const HEADER_REQUEST_ID: &str = "x-ms-client-request-id";

// Lowercase header names, used when redacting secrets from logs.
pub const HEADER_AUTHORIZATION_LC: &str = "authorization";
pub const HEADER_COOKIE_LC: &str = "cookie";

// Content Types
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

pub const CONTENT_TYPE_IDENTIFIER_JSON: &str = "json";

/// Check if a content type identifies JSON, ignoring any `;charset=...` suffix.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .eq_ignore_ascii_case(CONTENT_TYPE_JSON)
}

/// Extracts the media type portion of a `Content-Type` header value, dropping
/// any parameters (`;charset=utf-8`, `;boundary=...`).
#[must_use]
pub fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or(content_type).trim()
}

/// Extracts the `charset` parameter from a `Content-Type` header value, if present.
#[must_use]
pub fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let param = param.trim();
        param.strip_prefix("charset=").map(|v| v.trim_matches('"'))
    })
}

/// Retryable status codes: 408, 429, and 5xx except 501 (Not Implemented)
/// and 505 (HTTP Version Not Supported).
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    match status {
        408 | 429 => true,
        500..=599 => !matches!(status, 501 | 505),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_ignores_charset() {
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(!is_json_content_type("application/xml"));
    }

    #[test]
    fn media_type_strips_parameters() {
        assert_eq!(media_type("text/plain; charset=iso-8859-1"), "text/plain");
        assert_eq!(media_type("application/json"), "application/json");
    }

    #[test]
    fn charset_extraction() {
        assert_eq!(charset("text/plain; charset=iso-8859-1"), Some("iso-8859-1"));
        assert_eq!(charset("text/plain"), None);
    }
}
