use sqlx::PgPool;

use crate::db::models::EventWarn;

const COLUMNS: &str = "id, amount, event_id, user_id, created_at, updated_at";

/// Current warning count, zero when nothing was ever reported.
pub(crate) async fn find_amount(
    executor: impl sqlx::PgExecutor<'_>,
    event_id: &str,
    user_id: &str,
) -> Result<i32, sqlx::Error> {
    let amount = sqlx::query_scalar::<_, i32>(
        "SELECT amount FROM event_warns WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(amount.unwrap_or(0))
}

pub(crate) async fn increment(
    pool: &PgPool,
    id: &str,
    event_id: &str,
    user_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<EventWarn, sqlx::Error> {
    sqlx::query_as::<_, EventWarn>(&format!(
        "INSERT INTO event_warns (id, amount, event_id, user_id, created_at, updated_at)
         VALUES ($1, 1, $2, $3, $4, $4)
         ON CONFLICT (event_id, user_id)
         DO UPDATE SET amount = event_warns.amount + 1, updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(event_id)
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_event(
    pool: &PgPool,
    event_id: &str,
) -> Result<Vec<EventWarn>, sqlx::Error> {
    sqlx::query_as::<_, EventWarn>(&format!(
        "SELECT {COLUMNS} FROM event_warns WHERE event_id = $1 ORDER BY amount DESC, user_id"
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await
}
