//! One realtime connection: socket pumps plus the session worker.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::protocol::InboundFrame;
use super::AppState;
use crate::session::{ClientEvent, ConnectionInfo, Session};

/// Serve a connection until the client goes away.
///
/// Inbound messages are queued and handled one at a time by a dedicated
/// session task, so a message that arrives mid-run waits for the thread to
/// be ready. Once the socket closes, the in-flight run is left to settle on
/// its own (its output is discarded) and queued messages are dropped.
pub async fn run(socket: WebSocket, info: ConnectionInfo, state: AppState) {
    let span = info_span!(
        "connection",
        id = %info.id,
        address = %info.address,
        server_id = ?info.server_id
    );
    serve(socket, info, state).instrument(span).await
}

async fn serve(socket: WebSocket, info: ConnectionInfo, state: AppState) {
    info!("client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(
        async move {
            while let Some(event) = event_rx.recv().await {
                if ws_tx.send(Message::Text(event.to_frame().into())).await.is_err() {
                    debug!("socket closed, dropping outbound events");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let session = state.session(info, event_tx);
    tokio::spawn(run_session(session, inbound_rx).in_current_span());

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match InboundFrame::parse(text.as_str()) {
                Ok(InboundFrame::Message(body)) => {
                    if inbound_tx.send(body).is_err() {
                        break;
                    }
                }
                Ok(InboundFrame::Other(event)) => debug!(event = %event, "ignoring inbound event"),
                Err(e) => warn!(error = %e, "malformed inbound frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "socket error");
                break;
            }
        }
    }

    drop(inbound_tx);
    writer.abort();
    info!("client disconnected");
}

async fn run_session(mut session: Session, mut inbound: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = inbound.recv().await {
        if session.is_detached() {
            debug!("client gone, dropping queued messages");
            break;
        }
        session.handle_message(text).await;
    }
    debug!(phase = %session.phase(), "session released");
}
