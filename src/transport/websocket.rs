//! WebSocket transport
//!
//! A minimal WebSocket server that translates protocol JSON frames into hub
//! operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Run `subscribe`, `start` and `reset` requests against the `TimerHub`
//! - Forward every update of the connection's subscriptions as JSON frames
//! - Drop all subscriptions of a connection once it closes
//!
//! A connection may subscribe to several timers; updates carry the timer id.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use std::io;

use crate::client::Subscription;
use crate::timer::TimerHub;
use crate::timer::duration::parse_duration;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::require_timer_id;

pub async fn start_websocket_server(addr: String, hub: TimerHub) -> io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket server listening on ws://{addr}");
    serve_websocket(listener, hub).await;
    Ok(())
}

pub async fn serve_websocket(listener: TcpListener, hub: TimerHub) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                spawn(handle_connection(stream, hub.clone()));
            }
            Err(e) => warn!("Failed to accept connection: {e}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, hub: TimerHub) {
    let connection_id = format!("conn-{}", Uuid::new_v4());

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Only the send loop writes to the socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    {
        let connection_id = connection_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("Failed to send message to {connection_id}: {e}");
                    break;
                }
            }
            debug!("Send loop closed for {connection_id}");
        });
    }

    let mut forwarders = Vec::new();

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => handle_message(&hub, message, &tx, &mut forwarders),
            Err(err) => {
                warn!(
                    "Invalid client message from {connection_id}: {err} | {}",
                    text.chars().take(100).collect::<String>()
                );
                Some(ServerMessage::Error {
                    message: format!("invalid message: {err}"),
                })
            }
        };

        if let Some(reply) = reply {
            let _ = tx.send(reply.to_frame());
        }
    }

    // Aborting drops each subscription, which detaches it from its timer.
    for forwarder in forwarders {
        forwarder.abort();
    }

    info!("{connection_id} disconnected");
}

/// Applies one client request. Returns the direct reply, if any; a successful
/// subscribe is answered by the update frames themselves.
fn handle_message(
    hub: &TimerHub,
    message: ClientMessage,
    outbound: &UnboundedSender<WsMessage>,
    forwarders: &mut Vec<JoinHandle<()>>,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::Subscribe { timer_id } => match hub.subscribe(&timer_id) {
            Ok(subscription) => {
                forwarders.push(spawn(forward_updates(subscription, outbound.clone())));
                None
            }
            Err(e) => Some(e.into()),
        },
        ClientMessage::Start { timer_id, duration } => {
            let started = require_timer_id(&timer_id)
                .and_then(|_| parse_duration(&duration))
                .and_then(|seconds| hub.start(&timer_id, seconds));
            Some(match started {
                Ok(_) => ServerMessage::Ack { timer_id },
                Err(e) => e.into(),
            })
        }
        ClientMessage::Reset { timer_id } => Some(match hub.reset(&timer_id) {
            Ok(_) => ServerMessage::Ack { timer_id },
            Err(e) => e.into(),
        }),
    }
}

async fn forward_updates(mut subscription: Subscription, outbound: UnboundedSender<WsMessage>) {
    while let Some(snapshot) = subscription.recv().await {
        let update = ServerMessage::Update {
            timer_id: subscription.timer_id.clone(),
            snapshot,
        };
        if outbound.send(update.to_frame()).is_err() {
            break;
        }
    }
}
