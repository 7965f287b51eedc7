//! Tinode wire protocol
//!
//! Typed messages for the Tinode publish/subscribe protocol and their JSON
//! encoding. Each message on the wire is a JSON object with exactly one
//! top-level key naming its kind.
//!
//! # Components
//!
//! - [`ClientMessage`] / [`Request`]: everything the client sends
//! - [`ServerMessage`]: everything the server pushes back
//! - [`Blob`]: opaque JSON values embedded verbatim (content, descriptors,
//!   ctrl params)
//!
//! The crate does no I/O; transports hand it text frames.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blob;
pub mod client;
mod errors;
pub mod server;

pub use blob::Blob;
pub use client::{ClientMessage, Request};
pub use errors::{ProtocolError, Result};
pub use server::{Ctrl, Data, Info, Meta, Params, Pres, ServerMessage, is_success_code};
