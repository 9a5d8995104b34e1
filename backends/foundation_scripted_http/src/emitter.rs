//! Timed execution of one [`Instruction`] against one [`ResponseSink`].
//!
//! Emission runs through a fixed sequence of states:
//!
//! ```text
//! Init -> HeaderDelay -> HeadersSent -> BodyDelay -> Streaming -> Done
//! ```
//!
//! The body is written one byte at a time with a flush after each byte so a
//! client observes a steady trickle instead of a single burst. Each of the
//! first `len - 1` bytes is preceded by `body_service_time / len`; the wait
//! before the last byte is whatever remains of `body_service_time` measured
//! from the start of streaming. Late wakeups on earlier bytes are therefore
//! absorbed at the end and the body never takes less than its service time.
//!
//! A failed write or flush means the client went away: emission stops where
//! it is and nothing is reported as an error.

use core::time::Duration;
use std::io;

use crate::clock::Clock;
use crate::headers::{self, HeaderName, CONTENT_LENGTH};
use crate::instruction::Instruction;
use crate::sink::ResponseSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Init,
    HeaderDelay,
    HeadersSent,
    BodyDelay,
    Streaming,
    Done,
}

/// How an emission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Completed,
    /// The sink failed while leaving `state`; nothing further was written.
    Aborted(EmitterState),
}

pub struct ResponseEmitter<'a> {
    index: usize,
    instruction: &'a Instruction,
    clock: &'a dyn Clock,
    state: EmitterState,
}

impl<'a> ResponseEmitter<'a> {
    #[must_use]
    pub fn new(index: usize, instruction: &'a Instruction, clock: &'a dyn Clock) -> Self {
        Self {
            index,
            instruction,
            clock,
            state: EmitterState::Init,
        }
    }

    #[must_use]
    pub fn state(&self) -> EmitterState {
        self.state
    }

    /// Runs the instruction to completion against `sink`.
    ///
    /// # Panics
    ///
    /// Panics if `sink` does not support flushing. Paced output is
    /// meaningless without it and this is always a fixture wiring mistake.
    pub fn emit(mut self, sink: &mut dyn ResponseSink) -> EmitOutcome {
        assert!(
            sink.supports_flush(),
            "scripted responder: response sink does not support flush, cannot pace instruction {}",
            self.index
        );

        while self.state != EmitterState::Done {
            let from = self.state;
            match self.advance(sink) {
                Ok(next) => {
                    tracing::debug!("instruction {}: {:?} -> {:?}", self.index, from, next);
                    self.state = next;
                }
                Err(err) => {
                    tracing::info!(
                        "instruction {}: client gone during {:?}, stopping: {}",
                        self.index,
                        from,
                        err
                    );
                    return EmitOutcome::Aborted(from);
                }
            }
        }

        EmitOutcome::Completed
    }

    fn advance(&self, sink: &mut dyn ResponseSink) -> io::Result<EmitterState> {
        let inst = self.instruction;
        match self.state {
            EmitterState::Init => {
                self.clock.sleep(inst.header_delay);
                Ok(EmitterState::HeaderDelay)
            }
            EmitterState::HeaderDelay => {
                self.send_head(sink)?;
                Ok(EmitterState::HeadersSent)
            }
            EmitterState::HeadersSent => {
                self.clock.sleep(inst.body_delay);
                Ok(EmitterState::BodyDelay)
            }
            EmitterState::BodyDelay => match inst.body.as_deref() {
                Some(body) if !body.is_empty() => {
                    self.stream_body(body, sink)?;
                    Ok(EmitterState::Streaming)
                }
                _ => Ok(EmitterState::Done),
            },
            EmitterState::Streaming | EmitterState::Done => Ok(EmitterState::Done),
        }
    }

    fn send_head(&self, sink: &mut dyn ResponseSink) -> io::Result<()> {
        let inst = self.instruction;
        let response_headers = sink.headers_mut();

        for (name, values) in &inst.headers {
            response_headers.insert(name.clone(), values.clone());
        }

        if let Some(body) = &inst.body {
            if !response_headers.contains_key(&HeaderName::new(CONTENT_LENGTH)) {
                headers::set_value(response_headers, CONTENT_LENGTH, body.len().to_string());
            }
        }

        sink.write_head(inst.status_code)?;
        sink.flush()
    }

    fn stream_body(&self, body: &[u8], sink: &mut dyn ResponseSink) -> io::Result<()> {
        let service_time = self.instruction.body_service_time;
        let Some((last, leading)) = body.split_last() else {
            return Ok(());
        };

        let pause = per_byte_pause(service_time, body.len());
        let start = self.clock.now();

        for byte in leading {
            self.clock.sleep(pause);
            sink.write_body(std::slice::from_ref(byte))?;
            sink.flush()?;
        }

        let spent = self.clock.now().saturating_duration_since(start);
        self.clock.sleep(service_time.saturating_sub(spent));
        sink.write_body(std::slice::from_ref(last))
    }
}

/// Share of `service_time` allotted to each of `len` bytes.
fn per_byte_pause(service_time: Duration, len: usize) -> Duration {
    match u32::try_from(len) {
        Ok(0) => Duration::ZERO,
        Ok(n) => service_time / n,
        Err(_) => {
            let nanos = service_time.as_nanos() / len as u128;
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }
}
