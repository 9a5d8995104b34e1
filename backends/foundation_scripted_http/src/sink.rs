//! The transport-facing side of a response.

use std::io;
use std::time::Instant;

use crate::headers::Headers;

/// Where a response is written.
///
/// Mirrors the usual HTTP server response writer: headers are collected
/// until [`ResponseSink::write_head`] commits them together with the status
/// code, after which body bytes may be written incrementally.
///
/// Paced streaming depends on [`ResponseSink::flush`] pushing partial output
/// to the peer immediately. A sink that cannot do that must say so through
/// [`ResponseSink::supports_flush`]; the emitter refuses to run against it.
pub trait ResponseSink {
    /// Headers to be sent when the status is committed.
    fn headers_mut(&mut self) -> &mut Headers;

    /// Commits the status code and the current headers.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the head could not be written.
    fn write_head(&mut self, status: u16) -> io::Result<()>;

    /// Writes body bytes, committing a `200` head first if none was.
    ///
    /// # Errors
    ///
    /// Returns an error once the peer is gone or the bytes are not allowed.
    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn supports_flush(&self) -> bool;

    /// Pushes everything written so far to the peer.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the peer is gone.
    fn flush(&mut self) -> io::Result<()>;
}

/// One observable action taken against a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Head(u16),
    Body(Vec<u8>),
    Flush,
}

/// In-memory [`ResponseSink`] recording everything written to it.
///
/// Useful for driving handlers without a network; each event carries the
/// instant it happened so pacing can be checked.
#[derive(Debug)]
pub struct MemorySink {
    headers: Headers,
    status: Option<u16>,
    body: Vec<u8>,
    events: Vec<(Instant, SinkEvent)>,
    can_flush: bool,
    writes_before_failure: Option<usize>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            status: None,
            body: Vec::new(),
            events: Vec::new(),
            can_flush: true,
            writes_before_failure: None,
        }
    }

    /// A sink without flush support.
    #[must_use]
    pub fn without_flush(mut self) -> Self {
        self.can_flush = false;
        self
    }

    /// Fails every body write after the first `writes` succeed, the way a
    /// socket does once the client disconnects.
    #[must_use]
    pub fn fail_after_writes(mut self, writes: usize) -> Self {
        self.writes_before_failure = Some(writes);
        self
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn events(&self) -> impl Iterator<Item = &SinkEvent> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events with the instant each was recorded.
    #[must_use]
    pub fn timed_events(&self) -> &[(Instant, SinkEvent)] {
        &self.events
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.events()
            .filter(|event| matches!(event, SinkEvent::Flush))
            .count()
    }

    #[must_use]
    pub fn body_write_count(&self) -> usize {
        self.events()
            .filter(|event| matches!(event, SinkEvent::Body(_)))
            .count()
    }

    fn record(&mut self, event: SinkEvent) {
        self.events.push((Instant::now(), event));
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for MemorySink {
    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_head(&mut self, status: u16) -> io::Result<()> {
        if self.status.is_some() {
            return Ok(());
        }
        self.status = Some(status);
        self.record(SinkEvent::Head(status));
        Ok(())
    }

    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "memory sink closed",
                ));
            }
            *remaining -= 1;
        }

        self.write_head(200)?;
        self.body.extend_from_slice(bytes);
        self.record(SinkEvent::Body(bytes.to_vec()));
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        self.can_flush
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.can_flush {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "memory sink cannot flush",
            ));
        }
        self.record(SinkEvent::Flush);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_write_commits_implicit_ok() {
        let mut sink = MemorySink::new();
        sink.write_body(b"x").unwrap();
        assert_eq!(sink.status(), Some(200));
        assert_eq!(
            sink.events().cloned().collect::<Vec<_>>(),
            vec![SinkEvent::Head(200), SinkEvent::Body(b"x".to_vec())]
        );
    }

    #[test]
    fn test_status_is_committed_once() {
        let mut sink = MemorySink::new();
        sink.write_head(404).unwrap();
        sink.write_head(500).unwrap();
        assert_eq!(sink.status(), Some(404));
    }

    #[test]
    fn test_fail_after_writes() {
        let mut sink = MemorySink::new().fail_after_writes(1);
        assert!(sink.write_body(b"a").is_ok());
        assert!(sink.write_body(b"b").is_err());
        assert_eq!(sink.body(), b"a");
    }

    #[test]
    fn test_without_flush() {
        let mut sink = MemorySink::new().without_flush();
        assert!(!sink.supports_flush());
        assert!(sink.flush().is_err());
    }
}
