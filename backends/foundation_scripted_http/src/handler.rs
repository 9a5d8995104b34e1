//! Scripted request handling: one instruction per request, in arrival order.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::emitter::{EmitOutcome, ResponseEmitter};
use crate::headers::{self, CONTENT_LENGTH};
use crate::script::Script;
use crate::sequencer::Sequencer;
use crate::sink::ResponseSink;

/// What a single call to [`ScriptedHandler::serve`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// The request was answered with the instruction at `index`.
    Instruction { index: usize, outcome: EmitOutcome },
    /// The script had no instruction left for request number `index`.
    Exhausted { index: usize },
}

/// Serves each incoming request with the next instruction of its script.
///
/// The n-th request (in the order requests reach the handler) is answered
/// with `script[n]`. Once the script is used up every further request gets
/// `400 Bad Request` with the body
/// `Out of instructions: N[<n>] >= len(Inst)[<len>]`.
///
/// Handlers are shared between connection threads; only the request counter
/// is shared state, so a slow instruction never delays other requests.
///
/// # Examples
///
/// ```rust
/// use foundation_scripted_http::{Instruction, MemorySink, ScriptedHandler, Script};
///
/// let handler = ScriptedHandler::new(Script::from([Instruction::new(200).body("hi")]));
///
/// let mut first = MemorySink::new();
/// handler.serve(&mut first);
/// assert_eq!(first.status(), Some(200));
/// assert_eq!(first.body(), b"hi");
///
/// let mut second = MemorySink::new();
/// handler.serve(&mut second);
/// assert_eq!(second.status(), Some(400));
/// ```
pub struct ScriptedHandler {
    script: Script,
    sequencer: Sequencer,
    clock: Arc<dyn Clock>,
}

impl ScriptedHandler {
    #[must_use]
    pub fn new(script: impl Into<Script>) -> Self {
        Self::with_clock(script, Arc::new(SystemClock))
    }

    /// Creates a handler pacing its responses with `clock`.
    #[must_use]
    pub fn with_clock(script: impl Into<Script>, clock: Arc<dyn Clock>) -> Self {
        Self {
            script: script.into(),
            sequencer: Sequencer::new(),
            clock,
        }
    }

    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Number of requests handled so far, including exhausted ones.
    #[must_use]
    pub fn served(&self) -> usize {
        self.sequencer.served()
    }

    /// Answers one request by writing to `sink`.
    ///
    /// Write failures are absorbed: they only cut the response short.
    ///
    /// # Panics
    ///
    /// Panics if an instruction is due and `sink` cannot flush.
    pub fn serve(&self, sink: &mut dyn ResponseSink) -> Served {
        let index = self.sequencer.next_index();

        let Some(instruction) = self.script.get(index) else {
            self.serve_exhausted(index, sink);
            return Served::Exhausted { index };
        };

        tracing::debug!(
            "serving instruction {} of {} with status {}",
            index,
            self.script.len(),
            instruction.status_code
        );
        let outcome = ResponseEmitter::new(index, instruction, self.clock.as_ref()).emit(sink);
        Served::Instruction { index, outcome }
    }

    fn serve_exhausted(&self, index: usize, sink: &mut dyn ResponseSink) {
        let body = exhausted_message(index, self.script.len());
        tracing::debug!("{}", body);

        headers::set_value(sink.headers_mut(), CONTENT_LENGTH, body.len().to_string());
        if sink.write_head(400).is_err() {
            return;
        }
        let _ = sink.write_body(body.as_bytes());
    }
}

impl core::fmt::Debug for ScriptedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedHandler")
            .field("script_len", &self.script.len())
            .field("served", &self.served())
            .finish_non_exhaustive()
    }
}

fn exhausted_message(index: usize, len: usize) -> String {
    format!("Out of instructions: N[{index}] >= len(Inst)[{len}]")
}
