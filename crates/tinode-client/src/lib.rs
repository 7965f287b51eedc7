//! Client
//!
//! Interactive session engine for the Tinode protocol. Turns operator command
//! lines into requests, multiplexes them onto one duplex stream, correlates
//! acknowledgements with their requests and renders server pushes while the
//! operator is typing.
//!
//! # Architecture
//!
//! The protocol state lives in a Sans-IO [`Session`]: it takes lines and
//! server messages and returns messages to send, queuing operator output in
//! an [`Outbox`]. The [`Engine`] owns the I/O: a `tokio::select!` loop over
//! the input queue (fed by a blocking reader thread), the output queue, the
//! [`Connection`] and an idle timer.
//!
//! # Components
//!
//! - [`CommandCompiler`]: line → typed request
//! - [`Completions`]: request id → one-shot success callback
//! - [`Session`]: id counter, defaults, registry, dispatch
//! - [`Engine`]: the cooperative session loop
//! - [`CookieStore`]: persisted login token
//! - [`Connection`]: channel-pair duplex stream
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`transport::connect`], a WebSocket implementation of the stream.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
mod completion;
pub mod config;
mod connection;
mod cookie;
mod defaults;
mod engine;
mod error;
pub mod mediator;
mod outbox;
pub mod render;
mod session;
mod vcard;

#[cfg(feature = "transport")]
pub mod transport;

pub use command::{AckAction, CommandCompiler, Compiled, Outgoing};
pub use completion::{Completion, Completions};
pub use config::{ClientConfig, EngineConfig};
pub use connection::{Connection, ServerEnd, TransportError};
pub use cookie::{CookieStore, DEFAULT_COOKIE_PATH};
pub use defaults::SessionDefaults;
pub use engine::Engine;
pub use error::{CompletionError, CookieError, EngineError};
pub use mediator::{InputReader, InputReceiver, spawn_input_reader};
pub use outbox::{Outbox, OutputReceiver};
pub use session::{Credentials, LineOutcome, PROTOCOL_VERSION, Session};
pub use vcard::{Photo, Vcard};
