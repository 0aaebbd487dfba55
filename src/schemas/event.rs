use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, Time,
};

use crate::core::time::{format_countdown, format_primitive, parse_countdown, to_primitive_utc};
use crate::db::models::{Event, EventWarn};
use crate::schemas::user::UserResponse;
use crate::services::event_activity::{self, Activity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventCreate {
    #[serde(deserialize_with = "deserialize_datetime_flexible")]
    pub(crate) start: PrimitiveDateTime,
    #[serde(deserialize_with = "deserialize_datetime_flexible")]
    pub(crate) end: PrimitiveDateTime,
    #[serde(default = "default_countdown", deserialize_with = "deserialize_countdown")]
    pub(crate) countdown: Time,
    pub(crate) group_id: String,
    pub(crate) quiz_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentEventQuery {
    #[serde(default)]
    pub(crate) only_actual: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventResponse {
    pub(crate) id: String,
    pub(crate) start: String,
    pub(crate) end: String,
    pub(crate) countdown: String,
    pub(crate) started: bool,
    pub(crate) started_at: Option<String>,
    pub(crate) status: Activity,
    pub(crate) owner_id: String,
    pub(crate) group_id: String,
    pub(crate) quiz_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) collaborators: Option<Vec<UserResponse>>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl EventResponse {
    pub(crate) fn from_db(event: Event, now: PrimitiveDateTime) -> Self {
        let status = event_activity::classify(&event, now);
        Self {
            id: event.id,
            start: format_primitive(event.start_at),
            end: format_primitive(event.end_at),
            countdown: format_countdown(event.countdown),
            started: event.started,
            started_at: event.started_at.map(format_primitive),
            status,
            owner_id: event.owner_id,
            group_id: event.group_id,
            quiz_id: event.quiz_id,
            collaborators: None,
            created_at: format_primitive(event.created_at),
            updated_at: format_primitive(event.updated_at),
        }
    }

    pub(crate) fn with_collaborators(mut self, collaborators: Vec<UserResponse>) -> Self {
        self.collaborators = Some(collaborators);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventWarnResponse {
    pub(crate) id: String,
    pub(crate) amount: i32,
    pub(crate) event_id: String,
    pub(crate) user_id: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl EventWarnResponse {
    pub(crate) fn from_db(warn: EventWarn) -> Self {
        Self {
            id: warn.id,
            amount: warn.amount,
            event_id: warn.event_id,
            user_id: warn.user_id,
            created_at: format_primitive(warn.created_at),
            updated_at: format_primitive(warn.updated_at),
        }
    }
}

fn default_countdown() -> Time {
    Time::MIDNIGHT
}

/// RFC 3339 with any offset, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as
/// UTC. Stored as naive UTC.
pub(crate) fn parse_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(to_primitive_utc(value));
    }
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value);
    }
    PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
}

fn deserialize_datetime_flexible<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_countdown<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_countdown(&raw).ok_or_else(|| D::Error::custom(format!("invalid countdown: {raw}")))
}
