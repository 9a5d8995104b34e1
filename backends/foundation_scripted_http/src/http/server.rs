//! Scripted HTTP server implementation.
//!
//! WHY: Client code needs a real socket to talk to when its behaviour under
//! slow headers, trickling bodies and dropped connections is under test.
//!
//! WHAT: `ScriptedServer` listens on localhost and answers every request with
//! the next instruction of its script.
//!
//! HOW: Uses stdlib's `TcpListener` with one thread per connection. Request
//! heads are parsed just enough to frame requests; responses are rendered by
//! `TcpResponseSink` so each flush reaches the client immediately.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::errors::{RequestHeadError, ServerError, ServerResult};
use crate::handler::ScriptedHandler;
use crate::script::Script;

use super::config::ServerConfig;
use super::request::{discard_body, read_request_head};
use super::response::TcpResponseSink;

/// Scripted HTTP server for integration testing.
///
/// # Purpose (WHY)
///
/// Lets a test decide, request by request, exactly what an HTTP client
/// receives and how slowly it receives it.
///
/// # What it does
///
/// Starts a local HTTP/1.1 server on a random port and serves the script's
/// instructions in the order requests arrive. Runs in background threads so
/// test execution is never blocked.
///
/// # Examples
///
/// ```rust
/// use core::time::Duration;
/// use foundation_scripted_http::{Instruction, ScriptedServer};
///
/// let server = ScriptedServer::start([
///     Instruction::new(200).header_delay(Duration::from_millis(5)).body("hello"),
///     Instruction::new(503),
/// ])
/// .unwrap();
///
/// assert!(server.url("/anything").starts_with("http://127.0.0.1:"));
/// assert_eq!(server.served(), 0);
///
/// // Server stops accepting connections when dropped
/// ```
pub struct ScriptedServer {
    addr: SocketAddr,
    base_url: String,
    handler: Arc<ScriptedHandler>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ScriptedServer {
    /// Starts a server for `script` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the listener cannot be set up.
    pub fn start(script: impl Into<Script>) -> ServerResult<Self> {
        Self::with_config(script, ServerConfig::default())
    }

    /// Starts a server for `script` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the listener cannot be set up.
    pub fn with_config(script: impl Into<Script>, config: ServerConfig) -> ServerResult<Self> {
        Self::with_handler(Arc::new(ScriptedHandler::new(script)), config)
    }

    /// Starts a server answering with an existing `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the listener cannot be set up.
    pub fn with_handler(handler: Arc<ScriptedHandler>, config: ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.get_bind_addr()).map_err(ServerError::BindFailed)?;
        let addr = listener
            .local_addr()
            .map_err(ServerError::AddressUnavailable)?;
        // Non-blocking so the accept loop can notice shutdown.
        listener
            .set_nonblocking(true)
            .map_err(ServerError::BindFailed)?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let handler_clone = Arc::clone(&handler);

        let handle = thread::Builder::new()
            .name(format!("scripted-http-{}", addr.port()))
            .spawn(move || accept_loop(&listener, &handler_clone, &running_clone, config))
            .map_err(ServerError::SpawnFailed)?;

        tracing::info!(
            "ScriptedServer listening on {addr} with {} instructions",
            handler.script().len()
        );

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            handler,
            running,
            handle: Some(handle),
        })
    }

    /// Get full URL for a path on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL without path (e.g., "<http://127.0.0.1:54321>").
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests answered so far, including ones past the end of the script.
    #[must_use]
    pub fn served(&self) -> usize {
        self.handler.served()
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<ScriptedHandler> {
        &self.handler
    }
}

impl core::fmt::Debug for ScriptedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedServer")
            .field("addr", &self.addr)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        // Signal the accept loop to stop; open connections finish on their own.
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(
    listener: &TcpListener,
    handler: &Arc<ScriptedHandler>,
    running: &AtomicBool,
    config: ServerConfig,
) {
    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::info!("Got a client connection: {peer:?}");
                let handler = Arc::clone(handler);
                let spawned = thread::Builder::new()
                    .name(format!("scripted-http-conn-{}", peer.port()))
                    .spawn(move || {
                        if let Err(err) = handle_connection(&stream, &handler, &config) {
                            tracing::error!("ScriptedServer connection error from {peer:?}: {err}");
                        }
                    });
                if let Err(err) = spawned {
                    tracing::error!("ScriptedServer could not spawn connection thread: {err}");
                }
            }
            Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                // No connection available, sleep briefly and check again
                thread::sleep(config.get_accept_poll());
            }
            Err(err) => {
                tracing::error!("ScriptedServer accept error: {err}");
                break;
            }
        }
    }
}

/// Serves requests on one connection until it can no longer be reused.
fn handle_connection(
    stream: &TcpStream,
    handler: &ScriptedHandler,
    config: &ServerConfig,
) -> Result<(), RequestHeadError> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(config.get_read_timeout()))?;

    let mut reader = BufReader::new(stream);

    let result = loop {
        let request = match read_request_head(&mut reader, config.get_max_head_bytes()) {
            Ok(request) => request,
            Err(RequestHeadError::ConnectionClosed) => break Ok(()),
            Err(err) => {
                reject(stream);
                break Err(err);
            }
        };

        tracing::info!(
            "Received request: {} {} {}",
            request.method,
            request.target,
            request.version
        );

        let content_length = match request.content_length() {
            Ok(length) => length,
            Err(err) => {
                reject(stream);
                break Err(err);
            }
        };
        if let Some(length) = content_length {
            if let Err(err) = discard_body(&mut reader, length) {
                break Err(err.into());
            }
        }
        // Bodies we cannot frame leave the connection unusable afterwards.
        let close = content_length.is_none() && request.has_transfer_encoding();

        let mut sink = TcpResponseSink::new(BufWriter::new(stream), &request, close);
        let served = handler.serve(&mut sink);
        tracing::debug!("Finished request: {served:?}");

        if !sink.finish() {
            break Ok(());
        }
    };

    let _ = stream.shutdown(Shutdown::Both);
    result
}

fn reject(mut stream: &TcpStream) {
    let _ = stream
        .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    let _ = stream.flush();
}
