use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{lobby_service, match_service, session_events},
    state::SharedState,
};

/// Handle the full lifecycle for an individual participant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    state
        .connections()
        .register(&connection_id, outbound_tx.clone());
    info!(connection_id = %connection_id, "participant connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text, "received client message");
                handle_text(&state, &connection_id, &text).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %connection_id, "participant closed the connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                let err = ServiceError::InvalidInput("binary frames are not supported".into());
                session_events::send_error(&state, &connection_id, &err);
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    lobby_service::handle_disconnect(&state, &connection_id).await;
    state.connections().unregister(&connection_id);
    info!(connection_id = %connection_id, "participant disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Decode one text frame, run it and report any failure to its sender.
pub async fn handle_text(state: &SharedState, connection_id: &str, text: &str) {
    let result = match ClientMessage::from_json_str(text) {
        Ok(message) => {
            let label = message.label();
            let result = dispatch(state, connection_id, message).await;
            if let Err(err) = &result {
                warn!(connection_id, request = label, error = %err, "client request rejected");
            }
            result
        }
        Err(err) => {
            warn!(connection_id, error = %err, "failed to parse or validate client message");
            Err(ServiceError::InvalidInput(err.to_string()))
        }
    };

    if let Err(err) = result {
        session_events::send_error(state, connection_id, &err);
    }
}

/// Route a decoded message to the service owning it.
pub async fn dispatch(
    state: &SharedState,
    connection_id: &str,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::CreateSession(input) => {
            lobby_service::create_session(state, connection_id, input).await?;
            Ok(())
        }
        ClientMessage::JoinSession(input) => {
            lobby_service::join_session(state, connection_id, input).await
        }
        ClientMessage::LeaveSession => lobby_service::leave_session(state, connection_id).await,
        ClientMessage::UpdateSettings(input) => {
            lobby_service::update_settings(state, connection_id, input).await
        }
        ClientMessage::KickParticipant { name } => {
            lobby_service::kick_participant(state, connection_id, &name).await
        }
        ClientMessage::StartVoting => match_service::start_voting(state, connection_id).await,
        ClientMessage::SubmitAnswer { answer } => {
            match_service::submit_answer(state, connection_id, answer).await
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
