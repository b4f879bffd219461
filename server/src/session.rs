//! One websocket session: an inbound read loop plus a dedicated writer task.
//!
//! Inbound frames are parsed and handed to the hub in receive order. A
//! malformed frame is logged and dropped; the session itself survives.
//! Outbound frames arrive over an unbounded channel and are written by a
//! single task that owns the sink half, so frames to one peer can never
//! interleave. The first read error or close frame ends the session.

use crate::hub::Hub;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::protocol::ClientFrame;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Monotonic identifier for one live connection.
pub type SessionId = u64;

/// Upgrades a freshly-accepted TCP stream and runs the session to
/// completion.
pub async fn run(hub: Arc<Hub>, stream: TcpStream, addr: SocketAddr) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let id = hub.register(tx).await;
    info!("session {} connected from {}", id, addr);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(incoming) = source.next().await {
        let msg = match incoming {
            Ok(msg) => msg,
            Err(e) => {
                debug!("session {} read error: {}", id, e);
                break;
            }
        };
        match msg {
            Message::Text(text) => {
                debug!("session {} -> {}", id, text);
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => hub.dispatch(id, frame).await,
                    // Malformed frames are dropped; the session stays up.
                    Err(e) => warn!("session {}: unparsable frame: {}", id, e),
                }
            }
            Message::Close(_) => break,
            // Ping/pong is handled by the protocol layer; binary frames are
            // not part of this protocol.
            _ => {}
        }
    }

    // Unregistering drops the last sender, which lets the writer drain its
    // queue and exit.
    hub.unregister(id).await;
    let _ = writer.await;
    info!("session {} disconnected", id);
}
