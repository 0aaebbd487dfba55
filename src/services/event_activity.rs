//! Time-derived event lifecycle.
//!
//! Nothing here is persisted: an event is upcoming, active or ended purely
//! as a function of `now`, its window and the explicit start flag.

use serde::Serialize;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Event;
use crate::repositories;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Activity {
    Upcoming,
    Active,
    Ended,
}

/// `Active` covers the nominal window and, once started, everything from the
/// start onwards. Before the start an event is always upcoming.
pub(crate) fn classify(event: &Event, now: PrimitiveDateTime) -> Activity {
    let in_window = event.start_at <= now && now <= event.end_at;
    let held_open = event.started && now >= event.start_at;
    if in_window || held_open {
        Activity::Active
    } else if now < event.start_at {
        Activity::Upcoming
    } else {
        Activity::Ended
    }
}

/// Picks the event a user is currently concerned with among `candidates`.
///
/// Active events win; the candidates' relative order decides between
/// several. Otherwise, unless `only_actual`, the upcoming event with the
/// latest start is returned.
pub(crate) fn resolve(
    candidates: Vec<Event>,
    now: PrimitiveDateTime,
    only_actual: bool,
) -> Option<Event> {
    let mut upcoming = Vec::new();
    for event in candidates {
        match classify(&event, now) {
            Activity::Active => return Some(event),
            Activity::Upcoming if !only_actual => upcoming.push(event),
            Activity::Upcoming | Activity::Ended => {}
        }
    }

    upcoming.sort_by(|a, b| b.start_at.cmp(&a.start_at));
    upcoming.into_iter().next()
}

/// Which events a user is concerned with: students see the events of their
/// groups, professors the events they own.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope<'a> {
    Groups(&'a [String]),
    Owner(&'a str),
}

pub(crate) async fn resolve_for(
    pool: &PgPool,
    scope: Scope<'_>,
    now: PrimitiveDateTime,
    only_actual: bool,
) -> Result<Option<Event>, sqlx::Error> {
    let candidates = match scope {
        Scope::Groups([]) => return Ok(None),
        Scope::Groups(group_ids) => {
            repositories::events::list_open_for_groups(pool, group_ids, now).await?
        }
        Scope::Owner(owner_id) => {
            repositories::events::list_open_owned(pool, owner_id, now).await?
        }
    };
    Ok(resolve(candidates, now, only_actual))
}

/// Resolves in the professor scope when `as_professor`, in the group scope
/// of the user otherwise.
pub(crate) async fn resolve_for_user(
    pool: &PgPool,
    user_id: &str,
    as_professor: bool,
    now: PrimitiveDateTime,
    only_actual: bool,
) -> Result<Option<Event>, sqlx::Error> {
    if as_professor {
        return resolve_for(pool, Scope::Owner(user_id), now, only_actual).await;
    }
    let group_ids = repositories::users::group_ids(pool, user_id).await?;
    resolve_for(pool, Scope::Groups(&group_ids), now, only_actual).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartDecision {
    Start,
    NothingToStart,
    NotOwner,
    AlreadyStarted,
}

/// Whether `caller_id` may flip the start flag of the event resolved for
/// them. Every outcome other than `Start` is a silent no-op.
pub(crate) fn start_decision(event: Option<&Event>, caller_id: &str) -> StartDecision {
    match event {
        None => StartDecision::NothingToStart,
        Some(event) if event.owner_id != caller_id => StartDecision::NotOwner,
        Some(event) if event.started => StartDecision::AlreadyStarted,
        Some(_) => StartDecision::Start,
    }
}

/// Start trigger. Returns the freshly started event, or `None` when the
/// trigger was a no-op.
pub(crate) async fn start_for_professor(
    pool: &PgPool,
    professor_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Event>, sqlx::Error> {
    let event = resolve_for(pool, Scope::Owner(professor_id), now, false).await?;
    let decision = start_decision(event.as_ref(), professor_id);
    let Some(event) = event.filter(|_| decision == StartDecision::Start) else {
        tracing::debug!(professor_id, ?decision, "Start trigger ignored");
        return Ok(None);
    };

    let started = repositories::events::mark_started(pool, &event.id, now).await?;
    if let Some(started) = &started {
        tracing::info!(
            action = "event_start",
            event_id = %started.id,
            professor_id,
            "Event started"
        );
    }
    Ok(started)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::{Duration, Time};

    const NOW: PrimitiveDateTime = datetime!(2025-06-01 12:00);

    fn event(id: &str, start: PrimitiveDateTime, end: PrimitiveDateTime, started: bool) -> Event {
        Event {
            id: id.to_string(),
            start_at: start,
            end_at: end,
            countdown: Time::MIDNIGHT,
            started,
            started_at: started.then_some(start),
            owner_id: "prof".to_string(),
            group_id: "group".to_string(),
            quiz_id: "quiz".to_string(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn inside_window_is_active() {
        let e = event("e", NOW - Duration::hours(1), NOW + Duration::hours(1), false);
        assert_eq!(classify(&e, NOW), Activity::Active);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let e = event("e", NOW, NOW + Duration::hours(1), false);
        assert_eq!(classify(&e, NOW), Activity::Active);
        let e = event("e", NOW - Duration::hours(1), NOW, false);
        assert_eq!(classify(&e, NOW), Activity::Active);
    }

    #[test]
    fn future_start_is_upcoming_even_when_started() {
        let e = event("e", NOW + Duration::hours(1), NOW + Duration::hours(2), true);
        assert_eq!(classify(&e, NOW), Activity::Upcoming);
    }

    #[test]
    fn past_end_is_ended_unless_started() {
        let e = event("e", NOW - Duration::hours(2), NOW - Duration::hours(1), false);
        assert_eq!(classify(&e, NOW), Activity::Ended);
        let e = event("e", NOW - Duration::hours(2), NOW - Duration::hours(1), true);
        assert_eq!(classify(&e, NOW), Activity::Active);
    }

    #[test]
    fn resolve_prefers_active() {
        let candidates = vec![
            event("later", NOW + Duration::hours(3), NOW + Duration::hours(4), false),
            event("now", NOW - Duration::minutes(5), NOW + Duration::hours(1), false),
        ];
        assert_eq!(resolve(candidates, NOW, false).map(|e| e.id), Some("now".to_string()));
    }

    #[test]
    fn upcoming_only_when_not_restricted() {
        let upcoming =
            vec![event("soon", NOW + Duration::hours(1), NOW + Duration::hours(2), false)];
        assert!(resolve(upcoming.clone(), NOW, true).is_none());
        assert_eq!(resolve(upcoming, NOW, false).map(|e| e.id), Some("soon".to_string()));
    }

    #[test]
    fn upcoming_resolution_takes_latest_start() {
        let candidates = vec![
            event("soon", NOW + Duration::hours(1), NOW + Duration::hours(2), false),
            event("next-week", NOW + Duration::days(7), NOW + Duration::hours(169), false),
            event("tomorrow", NOW + Duration::days(1), NOW + Duration::hours(25), false),
        ];
        assert_eq!(resolve(candidates, NOW, false).map(|e| e.id), Some("next-week".to_string()));
    }

    #[test]
    fn ended_events_never_resolve() {
        let candidates =
            vec![event("old", NOW - Duration::hours(3), NOW - Duration::hours(1), false)];
        assert!(resolve(candidates.clone(), NOW, false).is_none());
        assert!(resolve(candidates, NOW, true).is_none());
    }

    #[test]
    fn start_decision_covers_no_op_cases() {
        let e = event("e", NOW + Duration::hours(1), NOW + Duration::hours(2), false);
        assert_eq!(start_decision(None, "prof"), StartDecision::NothingToStart);
        assert_eq!(start_decision(Some(&e), "other"), StartDecision::NotOwner);
        assert_eq!(start_decision(Some(&e), "prof"), StartDecision::Start);

        let started = event("e", NOW - Duration::hours(1), NOW + Duration::hours(2), true);
        assert_eq!(start_decision(Some(&started), "prof"), StartDecision::AlreadyStarted);
    }
}
