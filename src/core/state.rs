use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::permissions::PermissionLadder;
use crate::services::presence::PresenceHub;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    presence: PresenceHub,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle) -> Self {
        Self {
            inner: Arc::new(InnerState { settings, db, redis, presence: PresenceHub::default() }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn presence(&self) -> &PresenceHub {
        &self.inner.presence
    }

    pub(crate) fn ladder(&self) -> PermissionLadder {
        PermissionLadder::from_settings(self.inner.settings.permissions())
    }
}
