//! Live presence rooms.
//!
//! Every event has three rooms: one for all participants, one for students
//! and one for supervising professors. Rooms are in-process broadcast
//! channels created on first subscription and dropped once nobody listens.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::broadcast;

use crate::schemas::event::EventResponse;
use crate::schemas::user::UserResponse;

const ROOM_CAPACITY: usize = 64;

pub(crate) fn event_room(event_id: &str) -> String {
    format!("event-{event_id}")
}

pub(crate) fn student_room(event_id: &str) -> String {
    format!("student-event-{event_id}")
}

pub(crate) fn professor_room(event_id: &str) -> String {
    format!("professor-event-{event_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PresenceState {
    Joined,
    Started,
    Warned,
    Left,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresenceUpdate {
    #[serde(flatten)]
    pub(crate) user: UserResponse,
    pub(crate) state: PresenceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) warns: Option<i32>,
}

/// Frames pushed to clients, as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub(crate) enum ServerMessage {
    #[serde(rename = "user:update")]
    UserUpdate(PresenceUpdate),
    #[serde(rename = "event:start")]
    EventStart(EventResponse),
    #[serde(rename = "error")]
    Error { status: u16, error: String },
}

/// Frames accepted from clients. Any `data` they carry is accepted and
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub(crate) enum ClientMessage {
    #[serde(rename = "user:join")]
    UserJoin(Option<Ignored>),
    #[serde(rename = "quiz:start")]
    QuizStart(Option<Ignored>),
    #[serde(rename = "event:warn", alias = "event/warn")]
    EventWarn(Option<Ignored>),
}

/// Payload whose content is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ignored;

impl<'de> Deserialize<'de> for Ignored {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Ignored)
    }
}

#[derive(Default)]
pub(crate) struct PresenceHub {
    rooms: Mutex<HashMap<String, broadcast::Sender<Arc<str>>>>,
}

impl PresenceHub {
    pub(crate) fn subscribe(&self, room: &str) -> broadcast::Receiver<Arc<str>> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Sends to every current subscriber of `room`; returns how many
    /// receivers got the frame.
    pub(crate) fn broadcast(&self, room: &str, message: &ServerMessage) -> usize {
        let frame: Arc<str> = match serde_json::to_string(message) {
            Ok(frame) => frame.into(),
            Err(err) => {
                tracing::error!(error = %err, room, "Failed to encode presence frame");
                return 0;
            }
        };

        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).and_then(|sender| sender.send(frame).ok()).unwrap_or(0)
    }

    /// Drops rooms nobody listens to anymore.
    pub(crate) fn prune(&self) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Tells every event room the server is going away, then drops all
    /// rooms so subscribers observe a closed channel. Returns how many rooms
    /// were open.
    pub(crate) fn close_all(&self) -> usize {
        let notice = ServerMessage::Error {
            status: 503,
            error: "Server shutting down".to_string(),
        };
        let frame: Option<Arc<str>> = serde_json::to_string(&notice).ok().map(Into::into);

        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(frame) = frame {
            for (_, sender) in rooms.iter().filter(|(name, _)| name.starts_with("event-")) {
                let _ = sender.send(frame.clone());
            }
        }
        let closed = rooms.len();
        rooms.clear();
        closed
    }

    pub(crate) fn room_count(&self) -> usize {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
