//! Scripted response descriptors.

use core::time::Duration;

use crate::headers::{HeaderName, Headers};

/// An `Instruction` tells the handler how to serve one HTTP response.
///
/// Timing is expressed as three independent waits: before the status line and
/// headers are committed, between the headers and the first body byte, and
/// the minimum time spent trickling the body out one byte at a time.
///
/// # Examples
///
/// ```rust
/// use core::time::Duration;
/// use foundation_scripted_http::Instruction;
///
/// let slow_trickle = Instruction::new(200)
///     .header("Content-Type", "text/plain")
///     .body_service_time(Duration::from_millis(50))
///     .body("hello");
///
/// assert_eq!(slow_trickle.body.as_deref(), Some(&b"hello"[..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// How long to pause before committing status and headers.
    pub header_delay: Duration,
    /// Headers replacing any same-named response headers.
    ///
    /// When `Content-Length` is absent and `body` is `Some`, the body length
    /// is supplied automatically.
    pub headers: Headers,
    /// Status code committed with the headers.
    pub status_code: u16,
    /// How long to pause after the headers before the first body byte.
    pub body_delay: Duration,
    /// Minimum time taken to transmit the whole body.
    pub body_service_time: Duration,
    /// Response body. `None` sends no body and no `Content-Length`; an empty
    /// body still gets `Content-Length: 0`.
    pub body: Option<Vec<u8>>,
}

impl Instruction {
    /// Creates an instruction answering immediately with `status_code` and no body.
    #[must_use]
    pub fn new(status_code: u16) -> Self {
        Self {
            header_delay: Duration::ZERO,
            headers: Headers::new(),
            status_code,
            body_delay: Duration::ZERO,
            body_service_time: Duration::ZERO,
            body: None,
        }
    }

    #[must_use]
    pub fn header_delay(mut self, delay: Duration) -> Self {
        self.header_delay = delay;
        self
    }

    #[must_use]
    pub fn body_delay(mut self, delay: Duration) -> Self {
        self.body_delay = delay;
        self
    }

    #[must_use]
    pub fn body_service_time(mut self, service_time: Duration) -> Self {
        self.body_service_time = service_time;
        self
    }

    /// Appends `value` to the values of header `name`.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .entry(HeaderName::new(name))
            .or_default()
            .push(value.into());
        self
    }

    /// Sets every value of header `name`, dropping values added earlier.
    #[must_use]
    pub fn header_values<I, V>(mut self, name: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.headers.insert(
            HeaderName::new(name),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Removes the body so the response carries none at all.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instruction_has_no_body_and_no_delays() {
        let inst = Instruction::new(204);
        assert_eq!(inst.status_code, 204);
        assert!(inst.body.is_none());
        assert!(inst.headers.is_empty());
        assert_eq!(inst.header_delay, Duration::ZERO);
        assert_eq!(inst.body_delay, Duration::ZERO);
        assert_eq!(inst.body_service_time, Duration::ZERO);
    }

    #[test]
    fn test_header_appends_values_in_order() {
        let inst = Instruction::new(200)
            .header("set-cookie", "a=1")
            .header("Set-Cookie", "b=2");

        assert_eq!(
            inst.headers.get(&HeaderName::new("Set-Cookie")),
            Some(&vec!["a=1".to_string(), "b=2".to_string()])
        );
    }

    #[test]
    fn test_header_values_replaces_previous_values() {
        let inst = Instruction::new(200)
            .header("Foo", "old")
            .header_values("foo", ["x", "y"]);

        assert_eq!(
            inst.headers.get(&HeaderName::new("Foo")),
            Some(&vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_empty_body_is_distinct_from_no_body() {
        let empty = Instruction::new(500).body(Vec::new());
        assert_eq!(empty.body, Some(Vec::new()));
        assert_eq!(empty.without_body().body, None);
    }
}
