//! Response header names and the header collection used by instructions and sinks.

use std::collections::BTreeMap;

use derive_more::Display;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const CONNECTION: &str = "Connection";

/// Header collection: canonical header name to its ordered values.
pub type Headers = BTreeMap<HeaderName, Vec<String>>;

/// A case-insensitive HTTP header name stored in canonical form.
///
/// The first letter and every letter following a `-` are upper-cased, all
/// others lower-cased, so `content-length` and `CONTENT-LENGTH` both become
/// `Content-Length`. Names containing characters outside the token set are
/// kept verbatim.
#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeaderName(String);

impl HeaderName {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(canonicalize(name.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` names the same header, ignoring case.
    #[must_use]
    pub fn is(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl From<&str> for HeaderName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HeaderName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for HeaderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn canonicalize(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}

/// Returns the first value stored under `name`, if any.
#[must_use]
pub fn first_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .get(&HeaderName::new(name))
        .and_then(|values| values.first())
        .map(String::as_str)
}

/// Replaces every value stored under `name` with the single `value`.
pub fn set_value(headers: &mut Headers, name: &str, value: impl Into<String>) {
    headers.insert(HeaderName::new(name), vec![value.into()]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_canonicalized() {
        assert_eq!(HeaderName::new("content-length").as_str(), "Content-Length");
        assert_eq!(HeaderName::new("CONTENT-TYPE").as_str(), "Content-Type");
        assert_eq!(HeaderName::new("x-request-id").as_str(), "X-Request-Id");
        assert_eq!(HeaderName::new("foo").as_str(), "Foo");
    }

    #[test]
    fn test_non_token_names_are_kept_verbatim() {
        assert_eq!(HeaderName::new("bad name").as_str(), "bad name");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut headers = Headers::new();
        set_value(&mut headers, "content-length", "12");

        assert_eq!(first_value(&headers, CONTENT_LENGTH), Some("12"));
        assert_eq!(first_value(&headers, "CONTENT-LENGTH"), Some("12"));
        assert!(headers.contains_key(&HeaderName::new(CONTENT_LENGTH)));
    }

    #[test]
    fn test_set_value_replaces_existing_values() {
        let mut headers = Headers::new();
        headers.insert(HeaderName::new("Foo"), vec!["a".into(), "b".into()]);
        set_value(&mut headers, "foo", "c");

        assert_eq!(headers.get(&HeaderName::new("Foo")), Some(&vec!["c".to_string()]));
    }

    #[test]
    fn test_is_compares_case_insensitively() {
        assert!(HeaderName::new("Connection").is("connection"));
        assert!(!HeaderName::new("Connection").is("keep-alive"));
    }
}
