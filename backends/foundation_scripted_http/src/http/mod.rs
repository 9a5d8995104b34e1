//! Scripted HTTP server.
//!
//! WHY: Handlers need a transport to be reachable by real HTTP clients.
//!
//! WHAT: `ScriptedServer` hosting a `ScriptedHandler` on localhost, plus the
//! HTTP/1.1 request head reader and response sink it is built from.
//!
//! HOW: Uses stdlib's `TcpListener` and one thread per connection with
//! hand-rendered HTTP/1.1 responses.

mod config;
mod request;
mod response;
mod server;

pub use config::ServerConfig;
pub use request::{discard_body, read_request_head, RequestHead};
pub use response::{reason_phrase, TcpResponseSink};
pub use server::ScriptedServer;
