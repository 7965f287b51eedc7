//! Process wiring.
//!
//! Connects the transport, starts the stdin reader thread and runs the
//! engine against the real terminal. Owns nothing protocol-related.

use std::io::{self, BufReader};

use thiserror::Error;
use tinode_client::{
    ClientConfig, CookieStore, Engine, EngineError, Outbox, Session, TransportError,
    spawn_input_reader, transport,
};
use tokio::sync::mpsc;

use crate::args::StartupLogin;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection could not be established.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session ended with a failure.
    #[error("session failed: {0}")]
    Engine(#[from] EngineError),
}

/// Connect and run one interactive session until the stream ends.
pub async fn run(config: ClientConfig, login: Option<StartupLogin>) -> Result<(), RuntimeError> {
    let connection = transport::connect(&config).await?;
    tracing::info!(host = %config.host, "connected");

    let (outbox, output) = Outbox::new();
    for line in greeting(&config, login.as_ref()) {
        outbox.println(line);
    }

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let reader = spawn_input_reader(BufReader::new(io::stdin()), input_tx)?;

    let session = Session::new(outbox, CookieStore::new(&config.cookie_path));
    let mut engine =
        Engine::new(session, connection, input_rx, output, io::stdout(), config.engine.clone());
    let result = engine.run(login.as_ref().map(|l| &l.credentials)).await;

    // Blocked in a read unless the operator typed exit.
    reader.finish(config.engine.input_grace).await;
    result?;
    Ok(())
}

/// Lines shown once the server is reachable.
fn greeting(config: &ClientConfig, login: Option<&StartupLogin>) -> Vec<String> {
    let mut lines = vec![format!("Server '{}'", config.host)];
    if let Some(login) = login {
        lines.push(format!("Logging in with {}", login.source));
    }
    lines
}
