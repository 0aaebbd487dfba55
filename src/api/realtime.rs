//! Live presence channel: one WebSocket per participant, JSON envelopes
//! `{"event": ..., "data": ...}` in both directions.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::api::errors::ApiError;
use crate::api::events::trigger_start;
use crate::api::guards::CurrentUser;
use crate::api::validation::QueryParams;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::UserResponse;
use crate::services::event_activity;
use crate::services::permissions::Rank;
use crate::services::presence::{
    self, ClientMessage, PresenceHub, PresenceState, PresenceUpdate, ServerMessage,
};
use crate::services::warnings;

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
struct WsQuery {
    #[serde(default)]
    token: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    QueryParams(query): QueryParams<WsQuery>,
) -> Result<Response, ApiError> {
    let header_token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    let token = query
        .token
        .or(header_token)
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;
    let current = CurrentUser::from_token(&state, &token)?;

    Ok(ws.on_upgrade(move |socket| session(socket, state, current)))
}

/// What the connection joined, once `user:join` succeeded.
struct Joined {
    event_id: String,
    as_professor: bool,
    user: UserResponse,
}

enum Flow {
    Continue,
    Close,
}

struct Connection {
    state: AppState,
    current: CurrentUser,
    outbound: mpsc::Sender<Message>,
    forwarders: Vec<JoinHandle<()>>,
    joined: Option<Joined>,
}

async fn session(socket: WebSocket, state: AppState, current: CurrentUser) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    tracing::debug!(user_id = %current.id(), "WebSocket connected");
    let mut connection =
        Connection { state, current, outbound, forwarders: Vec::new(), joined: None };

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(client_message) = serde_json::from_str::<ClientMessage>(&text) else {
            connection.send_error(422, "Unknown message").await;
            continue;
        };

        if let Flow::Close = connection.handle(client_message).await {
            let _ = connection.outbound.send(Message::Close(None)).await;
            break;
        }
    }

    connection.leave().await;
    drop(connection);
    let _ = writer.await;
}

impl Connection {
    async fn handle(&mut self, message: ClientMessage) -> Flow {
        let result = match message {
            ClientMessage::UserJoin(_) => self.join().await,
            ClientMessage::QuizStart(_) => self.quiz_start().await,
            ClientMessage::EventWarn(_) => self.warn().await,
        };

        match result {
            Ok(flow) => flow,
            Err(error) => {
                let close = matches!(error, ApiError::AccessForbidden);
                self.send_error(error.status().as_u16(), &error.message()).await;
                if close {
                    Flow::Close
                } else {
                    Flow::Continue
                }
            }
        }
    }

    async fn join(&mut self) -> Result<Flow, ApiError> {
        if self.joined.is_some() {
            return Ok(Flow::Continue);
        }

        let as_professor = self.current.has_rank(&self.state, Rank::Professor);
        let event = event_activity::resolve_for_user(
            self.state.db(),
            self.current.id(),
            as_professor,
            primitive_now_utc(),
            false,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve event"))?
        .ok_or(ApiError::NotFound("Event"))?;

        let user = repositories::users::find_by_id(self.state.db(), self.current.id())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?
            .ok_or(ApiError::NotFound("User"))?;
        let user = UserResponse::from_db(user);

        if as_professor {
            self.subscribe(&presence::event_room(&event.id));
            self.subscribe(&presence::professor_room(&event.id));
        } else {
            let amount =
                repositories::event_warns::find_amount(self.state.db(), &event.id, &user.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to load warnings"))?;
            if let Err(block) = warnings::check_presence(amount) {
                metrics::record_presence_blocked();
                tracing::info!(
                    user_id = %user.id,
                    event_id = %event.id,
                    amount,
                    "Presence blocked"
                );
                return Err(block.into());
            }

            self.subscribe(&presence::event_room(&event.id));
            self.subscribe(&presence::student_room(&event.id));
            self.notify_professors(&event.id, &user, PresenceState::Joined, Some(amount));
        }

        tracing::info!(
            action = "presence_join",
            event_id = %event.id,
            user_id = %user.id,
            as_professor,
            "Joined event"
        );
        self.joined = Some(Joined { event_id: event.id, as_professor, user });
        Ok(Flow::Continue)
    }

    /// Professors trigger the event start; students announce they began.
    async fn quiz_start(&mut self) -> Result<Flow, ApiError> {
        let Some(joined) = self.joined.as_ref() else {
            return Err(ApiError::NotFound("Event"));
        };

        if joined.as_professor {
            trigger_start(&self.state, self.current.id())
                .await
                .map_err(|e| ApiError::internal(e, "Failed to start event"))?;
        } else {
            self.notify_professors(&joined.event_id, &joined.user, PresenceState::Started, None);
        }
        Ok(Flow::Continue)
    }

    async fn warn(&mut self) -> Result<Flow, ApiError> {
        let Some(joined) = self.joined.as_ref() else {
            return Err(ApiError::NotFound("Event"));
        };
        if joined.as_professor {
            return Ok(Flow::Continue);
        }

        let warn = repositories::event_warns::increment(
            self.state.db(),
            &uuid::Uuid::new_v4().to_string(),
            &joined.event_id,
            &joined.user.id,
            primitive_now_utc(),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record warning"))?;
        metrics::record_warning();

        tracing::info!(
            action = "event_warn",
            event_id = %warn.event_id,
            user_id = %warn.user_id,
            amount = warn.amount,
            "Warning recorded"
        );
        self.notify_professors(
            &joined.event_id,
            &joined.user,
            PresenceState::Warned,
            Some(warn.amount),
        );

        warnings::check_presence(warn.amount)?;
        Ok(Flow::Continue)
    }

    fn notify_professors(
        &self,
        event_id: &str,
        user: &UserResponse,
        state: PresenceState,
        warns: Option<i32>,
    ) {
        let update = PresenceUpdate { user: user.clone(), state, warns };
        self.state
            .presence()
            .broadcast(&presence::professor_room(event_id), &ServerMessage::UserUpdate(update));
    }

    fn subscribe(&mut self, room: &str) {
        let receiver = self.state.presence().subscribe(room);
        self.forwarders.push(tokio::spawn(forward(receiver, self.outbound.clone())));
    }

    async fn send_error(&self, status: u16, error: &str) {
        let frame = ServerMessage::Error { status, error: error.to_string() };
        match serde_json::to_string(&frame) {
            Ok(text) => {
                let _ = self.outbound.send(Message::Text(text)).await;
            }
            Err(err) => tracing::error!(error = %err, "Failed to encode error frame"),
        }
    }

    /// Tells professors a student left, then drops every room subscription.
    async fn leave(&mut self) {
        if let Some(joined) = self.joined.take() {
            if !joined.as_professor {
                self.notify_professors(&joined.event_id, &joined.user, PresenceState::Left, None);
            }
            tracing::info!(
                action = "presence_leave",
                event_id = %joined.event_id,
                user_id = %joined.user.id,
                "Left event"
            );
        }
        release_rooms(self.state.presence(), std::mem::take(&mut self.forwarders)).await;
    }
}

/// Stops the forwarders and waits until their receivers are dropped, so
/// the prune that follows sees the rooms they held as abandoned.
async fn release_rooms(hub: &PresenceHub, forwarders: Vec<JoinHandle<()>>) {
    for forwarder in &forwarders {
        forwarder.abort();
    }
    for forwarder in forwarders {
        let _ = forwarder.await;
    }
    hub.prune();
}

async fn forward(mut receiver: broadcast::Receiver<Arc<str>>, outbound: mpsc::Sender<Message>) {
    loop {
        match receiver.recv().await {
            Ok(frame) => {
                if outbound.send(Message::Text(frame.to_string())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Presence subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                let _ = outbound.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn released_rooms_are_pruned_right_away() {
        let hub = PresenceHub::default();
        let (outbound, _outbound_rx) = mpsc::channel(4);
        let forwarders = vec![
            tokio::spawn(forward(hub.subscribe(&presence::event_room("e1")), outbound.clone())),
            tokio::spawn(forward(hub.subscribe(&presence::student_room("e1")), outbound)),
        ];
        assert_eq!(hub.room_count(), 2);

        release_rooms(&hub, forwarders).await;
        assert_eq!(hub.room_count(), 0);
    }
}
