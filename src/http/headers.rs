//! Case-insensitive, order-preserving header multimap.
//!
//! Keyed by lowercase name for lookup; the original casing of the first
//! insertion is preserved for iteration, matching how most HTTP servers
//! expect (and echo) header names.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    entries: IndexMap<String, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// Casing of the name as first set/appended.
    name: String,
    values: Vec<String>,
}

impl HttpHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all existing values for `name` with a single value
    /// (last-write-wins).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        self.entries.insert(
            key,
            Entry {
                name,
                values: vec![value.into()],
            },
        );
    }

    /// Adds a value without clearing any existing values for `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        self.entries
            .entry(key)
            .or_insert_with(|| Entry {
                name,
                values: Vec::new(),
            })
            .values
            .push(value.into());
    }

    /// Sets `name` to `value` only if it isn't already present.
    pub fn set_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.set(name, value);
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the first value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .and_then(|e| e.values.first())
            .map(String::as_str)
    }

    /// Returns all values for `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map_or(&[], |e| e.values.as_slice())
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|e| e.values)
    }

    /// Iterates `(name, value)` pairs in insertion order, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .flat_map(|e| e.values.iter().map(move |v| (e.name.as_str(), v.as_str())))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(|e| e.values.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enforces the `Content-Length` / `Transfer-Encoding` mutual exclusion
    /// invariant. Called by [`crate::http::HttpRequest::finalize`].
    ///
    /// # Errors
    /// Returns an error if both headers are present after the request is built.
    pub fn check_length_encoding_exclusive(&self) -> Result<(), crate::error::Error> {
        if self.contains(crate::constants::HEADER_CONTENT_LENGTH)
            && self.contains(crate::constants::HEADER_TRANSFER_ENCODING)
        {
            return Err(crate::error::Error::bad_description(
                "Content-Length and Transfer-Encoding are mutually exclusive",
            ));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a HttpHeaders {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_case_insensitive_last_write_wins() {
        let mut h = HttpHeaders::new();
        h.set("X-Debug", "first");
        h.set("x-debug", "second");
        assert_eq!(h.get("X-DEBUG"), Some("second"));
        assert_eq!(h.get_all("x-debug").len(), 1);
    }

    #[test]
    fn append_preserves_prior_values() {
        let mut h = HttpHeaders::new();
        h.append("Set-Cookie", "a=1");
        h.append("set-cookie", "b=2");
        assert_eq!(h.get_all("Set-Cookie"), &["a=1".to_string(), "b=2".to_string()]);
    }

    #[test]
    fn set_if_absent_does_not_override() {
        let mut h = HttpHeaders::new();
        h.set("User-Agent", "custom/1.0");
        h.set_if_absent("User-Agent", "default/1.0");
        assert_eq!(h.get("User-Agent"), Some("custom/1.0"));
    }

    #[test]
    fn content_length_and_transfer_encoding_conflict() {
        let mut h = HttpHeaders::new();
        h.set("Content-Length", "0");
        h.set("Transfer-Encoding", "chunked");
        assert!(h.check_length_encoding_exclusive().is_err());
    }

    #[test]
    fn preserves_first_insertion_casing() {
        let mut h = HttpHeaders::new();
        h.set("X-Request-Id", "abc");
        let (name, _) = h.iter().next().unwrap();
        assert_eq!(name, "X-Request-Id");
    }
}
