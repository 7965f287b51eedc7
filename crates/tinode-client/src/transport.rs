//! WebSocket transport for the client.
//!
//! [`connect`] opens the server's channel endpoint and returns a
//! [`Connection`]; a spawned task bridges the socket and the channel pair.
//! This is a thin layer that only moves JSON text frames. Protocol logic
//! stays in the Sans-IO [`Session`](crate::Session).
//!
//! Server frames that fail to decode are logged and skipped. Once the
//! engine closes the outbound half, the task sends a close frame and keeps
//! forwarding inbound messages until the server finishes, bounded by
//! [`ClientConfig::close_timeout`].

use std::time::Duration;

use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tinode_proto::ServerMessage;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::{
    config::ClientConfig,
    connection::{Connection, ServerEnd, TransportError},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Inbound = mpsc::Sender<Result<ServerMessage, TransportError>>;

/// Channel buffer per direction.
const CHANNEL_CAPACITY: usize = 32;

/// Connect to a Tinode server over WebSocket.
///
/// Returns a [`Connection`] whose far side is driven by a spawned task.
///
/// # Errors
///
/// - `TransportError::Connection` if the WebSocket handshake fails
pub async fn connect(config: &ClientConfig) -> Result<Connection, TransportError> {
    let url = config.endpoint_url();
    tracing::debug!(host = %config.host, secure = config.secure, "connecting");

    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(format!("{}: {e}", config.host)))?;

    let (connection, server_end) = Connection::pair(CHANNEL_CAPACITY);
    let handle = tokio::spawn(run_connection(socket, server_end, config.close_timeout));

    Ok(connection.with_abort_handle(handle.abort_handle()))
}

/// Bridge the socket and the channel pair until either side finishes.
async fn run_connection(socket: Socket, end: ServerEnd, close_timeout: Duration) {
    let ServerEnd { mut from_client, to_client } = end;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = from_client.recv() => {
                let Some(message) = outgoing else {
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("dropping unencodable request: {e}");
                        continue;
                    },
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    report(&to_client, TransportError::Stream(format!("write failed: {e}"))).await;
                    return;
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(frame)) => {
                        if !forward(frame, &to_client).await {
                            return;
                        }
                    },
                    Some(Err(e)) => {
                        report(&to_client, TransportError::Stream(format!("read failed: {e}"))).await;
                        return;
                    },
                    None => return,
                }
            }
        }
    }

    close(sink, stream, &to_client, close_timeout).await;
}

/// Send a close frame, then forward whatever the server still sends.
async fn close(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    to_client: &Inbound,
    close_timeout: Duration,
) {
    if let Err(e) = sink.send(Message::Close(None)).await {
        tracing::debug!("close frame not sent: {e}");
        return;
    }

    let drain = async {
        while let Some(Ok(frame)) = stream.next().await {
            if !forward(frame, to_client).await {
                break;
            }
        }
    };
    if tokio::time::timeout(close_timeout, drain).await.is_err() {
        tracing::debug!("server did not finish close handshake in {close_timeout:?}");
    }
}

/// Forward one frame. Returns false once the stream is over.
async fn forward(frame: Message, to_client: &Inbound) -> bool {
    match frame {
        Message::Text(text) => match ServerMessage::from_json(&text) {
            Ok(message) => to_client.send(Ok(message)).await.is_ok(),
            Err(e) => {
                tracing::warn!("skipping undecodable server message: {e}");
                true
            },
        },
        Message::Close(frame) => {
            tracing::debug!(?frame, "server closed stream");
            false
        },
        _ => true,
    }
}

async fn report(to_client: &Inbound, error: TransportError) {
    tracing::error!("{error}");
    // Client may already be gone.
    let _ = to_client.send(Err(error)).await;
}
