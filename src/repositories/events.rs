use sqlx::PgPool;

use crate::db::models::{Event, User};

const COLUMNS: &str = "\
    id, start_at, end_at, countdown, started, started_at, owner_id, group_id, quiz_id, \
    created_at, updated_at";

pub(crate) struct CreateEvent<'a> {
    pub(crate) id: &'a str,
    pub(crate) start_at: time::PrimitiveDateTime,
    pub(crate) end_at: time::PrimitiveDateTime,
    pub(crate) countdown: time::Time,
    pub(crate) owner_id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateEvent<'_>,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (
            id, start_at, end_at, countdown, started, started_at, owner_id, group_id, quiz_id,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,FALSE,NULL,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.start_at)
    .bind(params.end_at)
    .bind(params.countdown)
    .bind(params.owner_id)
    .bind(params.group_id)
    .bind(params.quiz_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!("SELECT {COLUMNS} FROM events WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!("SELECT {COLUMNS} FROM events ORDER BY start_at DESC"))
        .fetch_all(pool)
        .await
}

/// Events the user owns or collaborates on.
pub(crate) async fn list_possessed(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {COLUMNS} FROM events e
         WHERE e.owner_id = $1
            OR EXISTS (
                SELECT 1 FROM event_collaborators ec WHERE ec.event_id = e.id AND ec.user_id = $1
            )
         ORDER BY e.start_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Every event scheduled for one of `group_ids`, past ones included.
pub(crate) async fn list_for_groups(
    executor: impl sqlx::PgExecutor<'_>,
    group_ids: &[String],
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {COLUMNS} FROM events WHERE group_id = ANY($1) ORDER BY start_at DESC"
    ))
    .bind(group_ids)
    .fetch_all(executor)
    .await
}

/// Events of `group_ids` that can still be upcoming or active at `now`,
/// most recent start first.
pub(crate) async fn list_open_for_groups(
    executor: impl sqlx::PgExecutor<'_>,
    group_ids: &[String],
    now: time::PrimitiveDateTime,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {COLUMNS} FROM events
         WHERE group_id = ANY($1) AND (end_at >= $2 OR started)
         ORDER BY start_at DESC"
    ))
    .bind(group_ids)
    .bind(now)
    .fetch_all(executor)
    .await
}

/// Owned counterpart of [`list_open_for_groups`].
pub(crate) async fn list_open_owned(
    executor: impl sqlx::PgExecutor<'_>,
    owner_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {COLUMNS} FROM events
         WHERE owner_id = $1 AND (end_at >= $2 OR started)
         ORDER BY start_at DESC"
    ))
    .bind(owner_id)
    .bind(now)
    .fetch_all(executor)
    .await
}

/// Flips the start flag once. `None` when the event is gone or already started.
pub(crate) async fn mark_started(
    pool: &PgPool,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "UPDATE events SET started = TRUE, started_at = $2, updated_at = $2
         WHERE id = $1 AND started = FALSE
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn collaborator_ids(
    executor: impl sqlx::PgExecutor<'_>,
    event_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM event_collaborators WHERE event_id = $1 ORDER BY user_id",
    )
    .bind(event_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_collaborators(
    pool: &PgPool,
    event_id: &str,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.hashed_password, u.gender,
                u.role_id, u.created_at, u.updated_at
         FROM users u JOIN event_collaborators ec ON ec.user_id = u.id
         WHERE ec.event_id = $1
         ORDER BY u.username",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn add_collaborator(
    pool: &PgPool,
    event_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO event_collaborators (event_id, user_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_collaborator(
    pool: &PgPool,
    event_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM event_collaborators WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
