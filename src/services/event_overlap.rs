//! Double-booking guard for event windows.
//!
//! Two groups are related when they share at least one member. A proposed
//! window is rejected when it meets the window of any event scheduled for a
//! related group; bounds are inclusive, so back-to-back events collide.

use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db;
use crate::db::models::Event;
use crate::repositories;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) start: PrimitiveDateTime,
    pub(crate) end: PrimitiveDateTime,
}

impl Window {
    pub(crate) fn new(start: PrimitiveDateTime, end: PrimitiveDateTime) -> Self {
        Self { start, end }
    }

    pub(crate) fn of(event: &Event) -> Self {
        Self { start: event.start_at, end: event.end_at }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum WindowError {
    #[error("Event end must be after its start")]
    EndNotAfterStart,
    #[error("Event start must be in the future")]
    StartNotInFuture,
}

/// Windows accepted for new events: strictly positive length and a start
/// strictly after `now`.
pub(crate) fn validate_window(window: &Window, now: PrimitiveDateTime) -> Result<(), WindowError> {
    if window.end <= window.start {
        return Err(WindowError::EndNotAfterStart);
    }
    if window.start <= now {
        return Err(WindowError::StartNotInFuture);
    }
    Ok(())
}

pub(crate) fn overlaps(proposed: &Window, existing: &Window) -> bool {
    let ends_inside = proposed.start <= existing.end && existing.end <= proposed.end;
    let starts_inside = proposed.start <= existing.start && existing.start <= proposed.end;
    let contains = existing.start <= proposed.start && existing.end >= proposed.end;
    let contained = existing.start >= proposed.start && existing.end <= proposed.end;
    ends_inside || starts_inside || contains || contained
}

pub(crate) fn find_conflict<'a>(
    proposed: &Window,
    existing: impl IntoIterator<Item = &'a Event>,
) -> Option<&'a Event> {
    existing.into_iter().find(|event| overlaps(proposed, &Window::of(event)))
}

/// Lock key serializing event creation for one group.
pub(crate) fn group_lock_key(group_id: &str) -> String {
    format!("event-group:{group_id}")
}

pub(crate) struct NewEvent<'a> {
    pub(crate) owner_id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) window: Window,
    pub(crate) countdown: time::Time,
}

#[derive(Debug, Error)]
pub(crate) enum ScheduleError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("Group not found")]
    GroupNotFound,
    #[error("Quiz not found")]
    QuizNotFound,
    #[error("Event already exists")]
    Conflict { event_id: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Creates an event once its window is valid and free for every related
/// group. The check and the insert share one transaction that holds the
/// creation lock of each related group.
pub(crate) async fn schedule(
    pool: &PgPool,
    new_event: NewEvent<'_>,
    now: PrimitiveDateTime,
) -> Result<Event, ScheduleError> {
    validate_window(&new_event.window, now)?;

    let mut tx = pool.begin().await?;
    if repositories::groups::find_by_id(&mut *tx, new_event.group_id).await?.is_none() {
        return Err(ScheduleError::GroupNotFound);
    }
    if repositories::quizzes::find_by_id(&mut *tx, new_event.quiz_id).await?.is_none() {
        return Err(ScheduleError::QuizNotFound);
    }

    let member_ids = repositories::groups::user_ids(&mut *tx, new_event.group_id).await?;
    let related = repositories::groups::ids_containing_users(&mut *tx, &member_ids).await?;

    let mut lock_order: Vec<&str> = related.iter().map(String::as_str).collect();
    lock_order.push(new_event.group_id);
    lock_order.sort_unstable();
    lock_order.dedup();
    for group_id in lock_order {
        db::advisory_xact_lock(&mut tx, &group_lock_key(group_id)).await?;
    }

    let existing = repositories::events::list_for_groups(&mut *tx, &related).await?;
    if let Some(conflict) = find_conflict(&new_event.window, &existing) {
        tracing::info!(
            group_id = new_event.group_id,
            conflicting_event_id = %conflict.id,
            "Event window overlaps a related group"
        );
        return Err(ScheduleError::Conflict { event_id: conflict.id.clone() });
    }

    let event = repositories::events::create(
        &mut *tx,
        repositories::events::CreateEvent {
            id: &Uuid::new_v4().to_string(),
            start_at: new_event.window.start,
            end_at: new_event.window.end,
            countdown: new_event.countdown,
            owner_id: new_event.owner_id,
            group_id: new_event.group_id,
            quiz_id: new_event.quiz_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        action = "event_create",
        event_id = %event.id,
        group_id = %event.group_id,
        quiz_id = %event.quiz_id,
        "Event scheduled"
    );
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Time;

    fn event(id: &str, start: PrimitiveDateTime, end: PrimitiveDateTime) -> Event {
        Event {
            id: id.to_string(),
            start_at: start,
            end_at: end,
            countdown: Time::MIDNIGHT,
            started: false,
            started_at: None,
            owner_id: "owner".to_string(),
            group_id: "group".to_string(),
            quiz_id: "quiz".to_string(),
            created_at: start,
            updated_at: start,
        }
    }

    fn window(start: (u8, u8), end: (u8, u8)) -> Window {
        let day = datetime!(2025-06-01 00:00);
        let at = |(hour, minute): (u8, u8)| {
            day.replace_time(Time::from_hms(hour, minute, 0).unwrap())
        };
        Window::new(at(start), at(end))
    }

    fn proposed() -> Window {
        window((10, 0), (12, 0))
    }

    #[test]
    fn detects_each_interval_relation() {
        let p = proposed();
        // existing ends inside
        assert!(overlaps(&p, &window((9, 0), (11, 0))));
        // existing starts inside
        assert!(overlaps(&p, &window((11, 0), (13, 0))));
        // existing contains proposed
        assert!(overlaps(&p, &window((8, 0), (14, 0))));
        // existing inside proposed
        assert!(overlaps(&p, &window((10, 30), (11, 30))));
    }

    #[test]
    fn touching_bounds_conflict() {
        let p = proposed();
        assert!(overlaps(&p, &window((8, 0), (10, 0))));
        assert!(overlaps(&p, &window((12, 0), (13, 0))));
    }

    #[test]
    fn disjoint_windows_pass() {
        let p = proposed();
        assert!(!overlaps(&p, &window((7, 0), (9, 59))));
        assert!(!overlaps(&p, &window((12, 1), (13, 0))));
    }

    #[test]
    fn four_clauses_match_closed_interval_test() {
        let p = proposed();
        let minutes = [-180i64, -60, -1, 0, 30, 60, 120, 121, 240];
        for start in minutes {
            for end in minutes.iter().copied().filter(|end| *end > start) {
                let existing = Window::new(
                    p.start + time::Duration::minutes(start),
                    p.start + time::Duration::minutes(end),
                );
                let closed = !(existing.end < p.start || existing.start > p.end);
                assert_eq!(overlaps(&p, &existing), closed, "start={start} end={end}");
            }
        }
    }

    #[test]
    fn find_conflict_returns_first_colliding_event() {
        let events = vec![
            event("early", datetime!(2025-06-01 06:00), datetime!(2025-06-01 07:00)),
            event("clash", datetime!(2025-06-01 11:00), datetime!(2025-06-01 11:30)),
        ];
        let conflict = find_conflict(&proposed(), &events).map(|event| event.id.as_str());
        assert_eq!(conflict, Some("clash"));
        assert!(find_conflict(&proposed(), &events[..1]).is_none());
    }

    #[test]
    fn window_validation() {
        let now = datetime!(2025-06-01 09:00);
        assert_eq!(validate_window(&proposed(), now), Ok(()));
        assert_eq!(
            validate_window(&window((12, 0), (12, 0)), now),
            Err(WindowError::EndNotAfterStart)
        );
        assert_eq!(
            validate_window(&proposed(), datetime!(2025-06-01 10:00)),
            Err(WindowError::StartNotInFuture)
        );
    }
}
