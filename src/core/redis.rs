use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError, Script};
use tokio::sync::RwLock;

/// Increments the window counter and arms its expiry on the first hit.
const FIXED_WINDOW_SCRIPT: &str = r#"
local hits = redis.call("INCR", KEYS[1])
if hits == 1 then
    redis.call("EXPIRE", KEYS[1], ARGV[1])
end
return hits
"#;

/// Lazily connected Redis client shared through `AppState`. Every caller
/// tolerates a missing connection.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::default() }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let manager = ConnectionManager::new(Client::open(self.url.as_str())?).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut connection) = self.connection().await else {
            return RedisHealth::Disconnected;
        };
        match cmd("PING").query_async::<_, String>(&mut connection).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Counts a hit against `key` and reports whether the caller is still
    /// within `limit` hits for the current window. Always `true` while
    /// disconnected.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut connection) = self.connection().await else {
            return Ok(true);
        };
        let hits: u64 = Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut connection)
            .await?;
        Ok(hits <= limit)
    }
}

/// Usernames are compared case-insensitively, so is their throttle.
pub(crate) fn login_rate_key(username: &str) -> String {
    format!("quizroom:login:{}", username.trim().to_lowercase())
}
