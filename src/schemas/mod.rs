use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub(crate) mod answer;
pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod event;
pub(crate) mod question;
pub(crate) mod quiz;
pub(crate) mod role;
pub(crate) mod user;
pub(crate) mod user_answer;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
}

/// Acknowledgement bodies such as `{"deleted": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ack {
    Updated,
    Deleted,
    Added,
    Removed,
}

impl Ack {
    fn key(self) -> &'static str {
        match self {
            Ack::Updated => "updated",
            Ack::Deleted => "deleted",
            Ack::Added => "added",
            Ack::Removed => "removed",
        }
    }
}

impl Serialize for Ack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key(), &true)?;
        map.end()
    }
}
