//! Pumps an axum `WebSocket` against a pre-existing outbound channel, so
//! the session/dispatch layer never has to touch `futures` combinators
//! directly. Two tasks do the work: one drains the given outbound receiver
//! into the socket's sink half, the other forwards binary frames from the
//! socket's stream half into a freshly created inbound channel.
//!
//! The outbound sender half is created by the caller *before* the upgrade
//! completes (see `server::ws_upgrade_handler`), so a user can be admitted
//! into the registry — and thus rejected as a duplicate — synchronously,
//! ahead of the socket even existing.

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

/// Spawns the two pump tasks for `socket`, driving `out_rx` into the sink
/// and returning a receiver fed by binary frames from the stream.
pub fn spawn_pump(
    socket: WebSocket,
    mut out_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (mut sink, mut stream) = socket.split();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        while let Some(bytes) = out_rx.recv().await {
            if sink.send(Message::Binary(Bytes::from(bytes))).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Binary(bytes) => {
                    if in_tx.send(bytes.to_vec()).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                Message::Text(_) | Message::Ping(_) | Message::Pong(_) => {
                    // Text frames carry no meaning in this protocol;
                    // ping/pong are handled by axum internally.
                }
            }
        }
    });

    in_rx
}
