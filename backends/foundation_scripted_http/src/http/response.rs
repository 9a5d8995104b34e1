//! HTTP/1.1 response writing over a byte stream.

use std::io::{self, Write};

use crate::headers::{
    self, first_value, HeaderName, Headers, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING,
};
use crate::sink::ResponseSink;

use super::request::RequestHead;

/// How the body of a committed response is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Not committed yet.
    Pending,
    /// The status forbids a body (1xx, 204, 304).
    Bodiless,
    /// Exactly this many bytes follow the head.
    Length(u64),
    /// Each write is sent as one chunk.
    Chunked,
    /// Raw bytes delimited only by closing the connection.
    UntilClose,
}

/// [`ResponseSink`] rendering HTTP/1.1 onto a writer, usually a TCP stream.
///
/// Responses carrying a `Content-Length` are written raw; responses without
/// one are sent chunked (HTTP/1.1 clients) or delimited by closing the
/// connection. Writing past a declared `Content-Length` fails, and a
/// response that ends short of it cannot be followed by another on the same
/// connection.
pub struct TcpResponseSink<W: Write> {
    writer: W,
    headers: Headers,
    status: Option<u16>,
    framing: Framing,
    written: u64,
    head_request: bool,
    chunked_allowed: bool,
    close: bool,
    failed: bool,
}

impl<W: Write> TcpResponseSink<W> {
    pub fn new(writer: W, request: &RequestHead, close: bool) -> Self {
        Self {
            writer,
            headers: Headers::new(),
            status: None,
            framing: Framing::Pending,
            written: 0,
            head_request: request.is_head(),
            chunked_allowed: request.accepts_chunked(),
            close: close || request.wants_close(),
            failed: false,
        }
    }

    /// Completes the response.
    ///
    /// Commits `200` if nothing was written, terminates a chunked body and
    /// flushes. Returns true when the connection can carry another request.
    pub fn finish(mut self) -> bool {
        if self.failed {
            return false;
        }
        if self.status.is_none() && self.write_head(200).is_err() {
            return false;
        }

        let framed = match self.framing {
            Framing::Bodiless | Framing::Pending => true,
            Framing::Length(declared) => self.head_request || self.written == declared,
            Framing::Chunked => self.writer.write_all(b"0\r\n\r\n").is_ok(),
            Framing::UntilClose => false,
        };
        let flushed = self.writer.flush().is_ok();

        framed && flushed && !self.close
    }

    fn choose_framing(&mut self, status: u16) -> Framing {
        if status < 200 || status == 204 || status == 304 {
            return Framing::Bodiless;
        }

        // A response must not carry both a Transfer-Encoding and a length.
        let explicit_chunked = first_value(&self.headers, TRANSFER_ENCODING)
            .map(|value| value.trim().eq_ignore_ascii_case("chunked"));
        if let Some(chunked) = explicit_chunked {
            self.headers.remove(&HeaderName::new(CONTENT_LENGTH));
            if self.head_request {
                return Framing::Bodiless;
            }
            if chunked && self.chunked_allowed {
                return Framing::Chunked;
            }
            if chunked {
                self.headers.remove(&HeaderName::new(TRANSFER_ENCODING));
            }
            return Framing::UntilClose;
        }

        if let Some(value) = first_value(&self.headers, CONTENT_LENGTH) {
            return match value.trim().parse::<u64>() {
                Ok(length) => Framing::Length(length),
                Err(_) => Framing::UntilClose,
            };
        }

        if self.head_request {
            return Framing::Bodiless;
        }

        if self.chunked_allowed {
            headers::set_value(&mut self.headers, TRANSFER_ENCODING, "chunked");
            Framing::Chunked
        } else {
            Framing::UntilClose
        }
    }

    fn fail(&mut self, err: io::Error) -> io::Error {
        self.failed = true;
        err
    }

    fn render_head(&self, status: u16) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));

        for (name, values) in &self.headers {
            for value in values {
                let value = value.replace(['\r', '\n'], " ");
                head.push_str(&format!("{name}: {value}\r\n"));
            }
        }

        head.push_str("\r\n");
        head.into_bytes()
    }
}

impl<W: Write> ResponseSink for TcpResponseSink<W> {
    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_head(&mut self, status: u16) -> io::Result<()> {
        if self.status.is_some() {
            tracing::debug!("ignoring second status {status} for committed response");
            return Ok(());
        }

        self.status = Some(status);
        self.framing = self.choose_framing(status);
        if self.framing == Framing::UntilClose {
            self.close = true;
        }
        if self.close {
            headers::set_value(&mut self.headers, CONNECTION, "close");
        }

        let head = self.render_head(status);
        self.writer.write_all(&head).map_err(|err| self.fail(err))
    }

    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.write_head(200)?;
        }
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "response already failed",
            ));
        }
        if self.head_request {
            self.written += bytes.len() as u64;
            return Ok(());
        }

        let result = match self.framing {
            Framing::Pending | Framing::Bodiless => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "response status does not allow a body",
                ))
            }
            Framing::Length(declared) => {
                if self.written + bytes.len() as u64 > declared {
                    self.close = true;
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "wrote more than the declared Content-Length",
                    ));
                }
                self.writer.write_all(bytes)
            }
            Framing::Chunked => {
                if bytes.is_empty() {
                    return Ok(());
                }
                self.writer
                    .write_all(format!("{:x}\r\n", bytes.len()).as_bytes())
                    .and_then(|()| self.writer.write_all(bytes))
                    .and_then(|()| self.writer.write_all(b"\r\n"))
            }
            Framing::UntilClose => self.writer.write_all(bytes),
        };

        result.map_err(|err| self.fail(err))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.status.is_none() {
            self.write_head(200)?;
        }
        self.writer.flush().map_err(|err| self.fail(err))
    }
}

/// Standard reason phrase for `status`, empty when unknown.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Content Too Large",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Content",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}
