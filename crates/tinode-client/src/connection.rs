//! Duplex message stream.
//!
//! The engine talks to the server through a [`Connection`]: a pair of tokio
//! channels carrying typed messages. Whatever sits on the other end (the
//! WebSocket bridge task, or a test acting as the server) holds the matching
//! [`ServerEnd`].
//!
//! Closing the outbound half is the clean-close signal: the far side sees
//! its receiver end and finishes the stream once it has flushed. Inbound
//! items are `Result`s so the far side can report a fatal failure in-band.

use thiserror::Error;
use tinode_proto::{ClientMessage, ServerMessage};
use tokio::{sync::mpsc, task::AbortHandle};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Outbound half already closed.
    #[error("connection closed")]
    Closed,
}

/// Client side of the stream.
#[derive(Debug)]
pub struct Connection {
    to_server: Option<mpsc::Sender<ClientMessage>>,
    from_server: mpsc::Receiver<Result<ServerMessage, TransportError>>,
    abort_handle: Option<AbortHandle>,
}

/// Far side of an in-memory [`Connection`].
#[derive(Debug)]
pub struct ServerEnd {
    /// Requests sent by the client. Yields `None` once the client closed.
    pub from_client: mpsc::Receiver<ClientMessage>,
    /// Messages (or a fatal error) for the client. Dropping it ends the
    /// client's inbound stream.
    pub to_client: mpsc::Sender<Result<ServerMessage, TransportError>>,
}

impl Connection {
    /// Create a connected in-memory pair with the given per-direction buffer.
    pub fn pair(capacity: usize) -> (Self, ServerEnd) {
        let (client_tx, server_rx) = mpsc::channel(capacity);
        let (server_tx, client_rx) = mpsc::channel(capacity);

        let connection =
            Self { to_server: Some(client_tx), from_server: client_rx, abort_handle: None };
        (connection, ServerEnd { from_client: server_rx, to_client: server_tx })
    }

    /// Attach the task driving the far side, so [`Connection::stop`] can
    /// abort it.
    pub fn with_abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort_handle = Some(handle);
        self
    }

    /// Send one request.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the outbound half was closed or the far
    ///   side is gone
    pub async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        let tx = self.to_server.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message).await.map_err(|_| TransportError::Closed)
    }

    /// Wait for room in the outbound buffer.
    ///
    /// The returned future owns its own sender handle, so it can be polled
    /// while [`Connection::recv`] is pending.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the outbound half was closed or the far
    ///   side is gone
    pub fn reserve(
        &self,
    ) -> impl Future<Output = Result<mpsc::OwnedPermit<ClientMessage>, TransportError>> + use<> {
        let tx = self.to_server.clone();
        async move {
            let tx = tx.ok_or(TransportError::Closed)?;
            tx.reserve_owned().await.map_err(|_| TransportError::Closed)
        }
    }

    /// Next inbound message. `None` once the far side finished the stream.
    pub async fn recv(&mut self) -> Option<Result<ServerMessage, TransportError>> {
        self.from_server.recv().await
    }

    /// Close the outbound half. Inbound messages keep flowing until the far
    /// side finishes.
    pub fn close_outbound(&mut self) {
        self.to_server = None;
    }

    /// Whether requests can still be sent.
    pub fn is_outbound_open(&self) -> bool {
        self.to_server.is_some()
    }

    /// Abort the task driving the far side, if any.
    pub fn stop(&self) {
        if let Some(handle) = &self.abort_handle {
            handle.abort();
        }
    }
}
