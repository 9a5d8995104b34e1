//! Minimal HTTP/1.x request head reading.
//!
//! The scripted server never looks at what was requested, so only enough of
//! the request is parsed to frame it on the connection: the request line,
//! the headers, and the length of any body that has to be skipped.

use std::io::{self, BufRead, Read};

use crate::errors::RequestHeadError;
use crate::headers::{
    first_value, HeaderName, Headers, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Headers,
}

impl RequestHead {
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }

    /// True for HTTP/1.1 and later, which understand chunked responses.
    #[must_use]
    pub fn accepts_chunked(&self) -> bool {
        self.version != "HTTP/1.0"
    }

    /// True when the client asked for the connection to end after this request.
    #[must_use]
    pub fn wants_close(&self) -> bool {
        let connection = first_value(&self.headers, CONNECTION).unwrap_or_default();
        let has_token = |token: &str| {
            connection
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        };

        if self.accepts_chunked() {
            has_token("close")
        } else {
            !has_token("keep-alive")
        }
    }

    /// Declared body length, or `None` when the request has no sized body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestHeadError::InvalidContentLength`] when the header is
    /// present but not a non-negative integer.
    pub fn content_length(&self) -> Result<Option<u64>, RequestHeadError> {
        match first_value(&self.headers, CONTENT_LENGTH) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| RequestHeadError::InvalidContentLength(value.to_string())),
        }
    }

    #[must_use]
    pub fn has_transfer_encoding(&self) -> bool {
        self.headers
            .contains_key(&HeaderName::new(TRANSFER_ENCODING))
    }
}

/// Reads one request head from `reader`, consuming at most `max_bytes`.
///
/// Blank lines ahead of the request line are skipped. End of stream, or a
/// read timeout, before any byte of a request arrives is reported as
/// [`RequestHeadError::ConnectionClosed`].
///
/// # Errors
///
/// Returns the matching [`RequestHeadError`] for malformed or oversized heads
/// and for transport failures.
pub fn read_request_head<R: BufRead>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<RequestHead, RequestHeadError> {
    let mut budget = max_bytes;

    let request_line = loop {
        match read_line(reader, &mut budget, max_bytes) {
            Ok(Some(line)) if line.is_empty() => continue,
            Ok(Some(line)) => break line,
            Ok(None) => return Err(RequestHeadError::ConnectionClosed),
            Err(RequestHeadError::ReadFailed(err)) if is_idle_timeout(&err) => {
                return Err(RequestHeadError::ConnectionClosed)
            }
            Err(err) => return Err(err),
        }
    };

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RequestHeadError::InvalidRequestLine(request_line));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(RequestHeadError::InvalidRequestLine(request_line));
    }

    let mut headers = Headers::new();
    loop {
        let Some(line) = read_line(reader, &mut budget, max_bytes)? else {
            return Err(RequestHeadError::ReadFailed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside request head",
            )));
        };
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(RequestHeadError::InvalidHeaderLine(line));
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(RequestHeadError::InvalidHeaderLine(line));
        }

        headers
            .entry(HeaderName::new(name))
            .or_default()
            .push(value.trim().to_string());
    }

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers,
    })
}

/// Skips a sized request body so the next request can be read.
///
/// # Errors
///
/// Returns an error if the body is cut short or cannot be read.
pub fn discard_body<R: Read>(reader: &mut R, length: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.take(length), &mut io::sink())?;
    if skipped < length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside request body",
        ));
    }
    Ok(())
}

fn is_idle_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn read_line<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
    max_bytes: usize,
) -> Result<Option<String>, RequestHeadError> {
    let limit = u64::try_from(*budget).unwrap_or(u64::MAX);
    let mut line = Vec::new();
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if read == 0 {
        if *budget == 0 {
            return Err(RequestHeadError::HeadTooLarge(max_bytes));
        }
        return Ok(None);
    }
    *budget = budget.saturating_sub(read);

    if line.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(RequestHeadError::HeadTooLarge(max_bytes));
        }
        return Err(RequestHeadError::ReadFailed(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside request head",
        )));
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line)
        .map(Some)
        .map_err(|err| {
            RequestHeadError::InvalidHeaderLine(
                String::from_utf8_lossy(err.as_bytes()).into_owned(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(raw: &str) -> Result<RequestHead, RequestHeadError> {
        read_request_head(&mut Cursor::new(raw.as_bytes().to_vec()), 1024)
    }

    #[test]
    fn test_parses_request_line_and_headers() {
        let head = parse(
            "GET /path?q=1 HTTP/1.1\r\nHost: localhost\r\nX-Multi: a\r\nx-multi: b\r\n\r\n",
        )
        .expect("should parse");

        assert_eq!(head.method, "GET");
        assert_eq!(head.target, "/path?q=1");
        assert_eq!(head.version, "HTTP/1.1");
        assert_eq!(first_value(&head.headers, "host"), Some("localhost"));
        assert_eq!(
            head.headers.get(&HeaderName::new("X-Multi")),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_accepts_bare_line_feeds_and_leading_blank_lines() {
        let head = parse("\r\n\nPOST / HTTP/1.0\nContent-Length: 3\n\n").expect("should parse");
        assert_eq!(head.method, "POST");
        assert_eq!(head.content_length().unwrap(), Some(3));
    }

    #[test]
    fn test_empty_stream_is_closed_connection() {
        assert!(matches!(parse(""), Err(RequestHeadError::ConnectionClosed)));
    }

    #[test]
    fn test_truncated_head_is_read_failure() {
        assert!(matches!(
            parse("GET / HTTP/1.1\r\nHost: x\r\n"),
            Err(RequestHeadError::ReadFailed(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_request_line() {
        assert!(matches!(
            parse("GET /\r\n\r\n"),
            Err(RequestHeadError::InvalidRequestLine(_))
        ));
        assert!(matches!(
            parse("GET / SPDY/3\r\n\r\n"),
            Err(RequestHeadError::InvalidRequestLine(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_header_line() {
        assert!(matches!(
            parse("GET / HTTP/1.1\r\nnot a header\r\n\r\n"),
            Err(RequestHeadError::InvalidHeaderLine(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_head() {
        let raw = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(2048));
        assert!(matches!(parse(&raw), Err(RequestHeadError::HeadTooLarge(1024))));
    }

    #[test]
    fn test_connection_close_semantics() {
        let keep = parse("GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(!keep.wants_close());

        let close = parse("GET / HTTP/1.1\r\nConnection: Close\r\n\r\n").unwrap();
        assert!(close.wants_close());

        let old = parse("GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(old.wants_close());
        assert!(!old.accepts_chunked());

        let old_keep = parse("GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n").unwrap();
        assert!(!old_keep.wants_close());
    }

    #[test]
    fn test_invalid_content_length() {
        let head = parse("POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n").unwrap();
        assert!(matches!(
            head.content_length(),
            Err(RequestHeadError::InvalidContentLength(value)) if value == "lots"
        ));
    }

    #[test]
    fn test_discard_body_consumes_exact_length() {
        let mut reader = Cursor::new(b"abcGET".to_vec());
        discard_body(&mut reader, 3).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "GET");
    }

    #[test]
    fn test_discard_body_reports_short_body() {
        let mut reader = Cursor::new(b"ab".to_vec());
        assert!(discard_body(&mut reader, 3).is_err());
    }
}
