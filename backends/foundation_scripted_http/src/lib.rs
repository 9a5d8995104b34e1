//! Deterministic, scriptable HTTP responder for testing HTTP clients.
//!
//! This crate provides:
//! - **Instructions**: status, headers, body and timing of one response
//! - **Scripted handler**: serves instructions strictly in request arrival order
//! - **Paced emission**: header delay, body delay and a byte-by-byte body
//!   trickle that never finishes before its service time
//! - **Scripted server**: a localhost HTTP/1.1 server hosting a handler
//!
//! # Examples
//!
//! ```rust
//! use core::time::Duration;
//! use foundation_scripted_http::{Instruction, ScriptedServer};
//!
//! let server = ScriptedServer::start([
//!     // slow to answer at all
//!     Instruction::new(200)
//!         .header_delay(Duration::from_millis(20))
//!         .body("hello"),
//!     // headers at once, then the body trickles out over 50ms
//!     Instruction::new(200)
//!         .body_service_time(Duration::from_millis(50))
//!         .body("slow body"),
//!     // promises more than it sends, so the client sees a truncated body
//!     Instruction::new(200)
//!         .header("Content-Length", "1000")
//!         .body("short"),
//! ])
//! .unwrap();
//!
//! // point the client under test at server.url("/")
//! # let _ = server.url("/");
//! ```
//!
//! A fourth request to this server is answered with `400 Bad Request` and
//! the body `Out of instructions: N[3] >= len(Inst)[3]`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod emitter;
pub mod errors;
pub mod handler;
pub mod headers;
pub mod http;
pub mod instruction;
pub mod script;
pub mod sequencer;
pub mod sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use emitter::{EmitOutcome, EmitterState, ResponseEmitter};
pub use errors::{RequestHeadError, ScriptError, ServerError};
pub use handler::{ScriptedHandler, Served};
pub use headers::{HeaderName, Headers};
pub use http::{ScriptedServer, ServerConfig};
pub use instruction::Instruction;
pub use script::Script;
pub use sequencer::Sequencer;
pub use sink::{MemorySink, ResponseSink, SinkEvent};
