//! Tinode command line client
//!
//! A thin shell over [`tinode_client`]: startup flags, logging, and the
//! wiring of stdin, the WebSocket transport and the session engine. All
//! protocol logic lives in the client crate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod logging;
pub mod runtime;

pub use args::{Args, LoginSource, StartupLogin};
pub use runtime::RuntimeError;
