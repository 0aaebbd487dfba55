use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::services::permissions::Rank;
use crate::services::presence;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn overlapping_event_for_shared_member_conflicts() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let professor = test_support::insert_user(db, "prof001", Rank::Professor).await;
    let student = test_support::insert_user(db, "student001", Rank::Student).await;
    let group_a = test_support::insert_group(db, "group-a", &[&student]).await;
    let group_b = test_support::insert_group(db, "group-b", &[&student]).await;
    let quiz = test_support::insert_quiz(db, "quiz-a", &professor, false).await;
    let token = test_support::bearer_token(&ctx.state, &professor, Rank::Professor);

    let start = primitive_now_utc() + Duration::days(1);
    let end = start + Duration::hours(2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events",
            Some(&token),
            Some(json!({
                "start": format_primitive(start),
                "end": format_primitive(end),
                "countdown": "00:30:00",
                "groupId": group_a.id,
                "quizId": quiz.id,
            })),
        ))
        .await
        .expect("create event");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["status"], "upcoming");
    assert_eq!(created["countdown"], "00:30:00");
    assert_eq!(created["ownerId"], professor.id.as_str());

    // Back-to-back windows share the boundary instant.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events",
            Some(&token),
            Some(json!({
                "start": format_primitive(end),
                "end": format_primitive(end + Duration::hours(1)),
                "groupId": group_b.id,
                "quizId": quiz.id,
            })),
        ))
        .await
        .expect("create overlapping event");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["error"], "Event already exists");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn unrelated_groups_may_share_a_window() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let professor = test_support::insert_user(db, "prof002", Rank::Professor).await;
    let first = test_support::insert_user(db, "student010", Rank::Student).await;
    let second = test_support::insert_user(db, "student011", Rank::Student).await;
    let group_a = test_support::insert_group(db, "group-c", &[&first]).await;
    let group_b = test_support::insert_group(db, "group-d", &[&second]).await;
    let quiz = test_support::insert_quiz(db, "quiz-b", &professor, false).await;
    let token = test_support::bearer_token(&ctx.state, &professor, Rank::Professor);

    let start = primitive_now_utc() + Duration::days(2);
    let end = start + Duration::hours(1);

    for group_id in [&group_a.id, &group_b.id] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/events",
                Some(&token),
                Some(json!({
                    "start": format_primitive(start),
                    "end": format_primitive(end),
                    "groupId": group_id,
                    "quizId": quiz.id,
                })),
            ))
            .await
            .expect("create event");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn past_or_inverted_windows_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let professor = test_support::insert_user(db, "prof003", Rank::Professor).await;
    let group = test_support::insert_group(db, "group-e", &[]).await;
    let quiz = test_support::insert_quiz(db, "quiz-c", &professor, false).await;
    let token = test_support::bearer_token(&ctx.state, &professor, Rank::Professor);

    let now = primitive_now_utc();
    let windows = [
        (now - Duration::hours(1), now + Duration::hours(1)),
        (now + Duration::hours(3), now + Duration::hours(2)),
    ];

    for (start, end) in windows {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/events",
                Some(&token),
                Some(json!({
                    "start": format_primitive(start),
                    "end": format_primitive(end),
                    "groupId": group.id,
                    "quizId": quiz.id,
                })),
            ))
            .await
            .expect("create event");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn students_cannot_schedule_events() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let student = test_support::insert_user(db, "student020", Rank::Student).await;
    let token = test_support::bearer_token(&ctx.state, &student, Rank::Student);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/events", Some(&token), None))
        .await
        .expect("list events");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn current_event_prefers_active_over_upcoming() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let professor = test_support::insert_user(db, "prof004", Rank::Professor).await;
    let student = test_support::insert_user(db, "student030", Rank::Student).await;
    let group = test_support::insert_group(db, "group-f", &[&student]).await;
    let quiz = test_support::insert_quiz(db, "quiz-d", &professor, false).await;
    let now = primitive_now_utc();

    let upcoming = test_support::insert_event(
        db,
        &professor,
        &group,
        &quiz,
        now + Duration::days(1),
        now + Duration::days(1) + Duration::hours(1),
    )
    .await;
    let active = test_support::insert_event(
        db,
        &professor,
        &group,
        &quiz,
        now - Duration::minutes(10),
        now + Duration::minutes(50),
    )
    .await;

    let token = test_support::bearer_token(&ctx.state, &student, Rank::Student);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/events/current",
            Some(&token),
            None,
        ))
        .await
        .expect("current event");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["id"], active.id.as_str());
    assert_eq!(body["status"], "active");

    repositories::events::delete(db, &active.id).await.expect("delete event");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/events/current",
            Some(&token),
            None,
        ))
        .await
        .expect("current event");
    let body = test_support::read_json(response).await;
    assert_eq!(body["id"], upcoming.id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/events/current?onlyActual=true",
            Some(&token),
            None,
        ))
        .await
        .expect("current event");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn start_flips_flag_once_and_broadcasts() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let professor = test_support::insert_user(db, "prof005", Rank::Professor).await;
    let group = test_support::insert_group(db, "group-g", &[]).await;
    let quiz = test_support::insert_quiz(db, "quiz-e", &professor, false).await;
    let now = primitive_now_utc();
    let event = test_support::insert_event(
        db,
        &professor,
        &group,
        &quiz,
        now + Duration::minutes(5),
        now + Duration::hours(1),
    )
    .await;

    let mut room = ctx.state.presence().subscribe(&presence::event_room(&event.id));
    let token = test_support::bearer_token(&ctx.state, &professor, Rank::Professor);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events/start",
            Some(&token),
            None,
        ))
        .await
        .expect("start event");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["id"], event.id.as_str());
    assert_eq!(body["started"], true);

    let frame = room.try_recv().expect("event:start frame");
    let frame: serde_json::Value = serde_json::from_str(&frame).expect("frame json");
    assert_eq!(frame["event"], "event:start");
    assert_eq!(frame["data"]["id"], event.id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events/start",
            Some(&token),
            None,
        ))
        .await
        .expect("start event again");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await, serde_json::Value::Null);
    assert!(room.try_recv().is_err());
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn only_the_owner_deletes_an_event() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let owner = test_support::insert_user(db, "prof006", Rank::Professor).await;
    let helper = test_support::insert_user(db, "prof007", Rank::Professor).await;
    let group = test_support::insert_group(db, "group-h", &[]).await;
    let quiz = test_support::insert_quiz(db, "quiz-f", &owner, false).await;
    let now = primitive_now_utc();
    let event = test_support::insert_event(
        db,
        &owner,
        &group,
        &quiz,
        now + Duration::days(3),
        now + Duration::days(3) + Duration::hours(1),
    )
    .await;

    let owner_token = test_support::bearer_token(&ctx.state, &owner, Rank::Professor);
    let helper_token = test_support::bearer_token(&ctx.state, &helper, Rank::Professor);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/events/{}/collaborators/{}", event.id, helper.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("add collaborator");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/events/{}", event.id),
            Some(&helper_token),
            None,
        ))
        .await
        .expect("get event");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["collaborators"][0]["id"], helper.id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/events/{}", event.id),
            Some(&helper_token),
            None,
        ))
        .await
        .expect("delete as collaborator");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/events/{}", event.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("delete as owner");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await, json!({"deleted": true}));
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn scheduling_requires_rights_on_the_quiz() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let owner = test_support::insert_user(db, "prof008", Rank::Professor).await;
    let outsider = test_support::insert_user(db, "prof009", Rank::Professor).await;
    let group = test_support::insert_group(db, "group-i", &[]).await;
    let quiz = test_support::insert_quiz(db, "quiz-g", &owner, false).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner, Rank::Professor);
    let outsider_token = test_support::bearer_token(&ctx.state, &outsider, Rank::Professor);

    let start = primitive_now_utc() + Duration::days(4);
    let payload = json!({
        "start": format_primitive(start),
        "end": format_primitive(start + Duration::hours(1)),
        "groupId": group.id,
        "quizId": quiz.id,
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events",
            Some(&outsider_token),
            Some(payload.clone()),
        ))
        .await
        .expect("create event as outsider");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/quizzes/{}/collaborators/{}", quiz.id, outsider.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("add quiz collaborator");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/events",
            Some(&outsider_token),
            Some(payload),
        ))
        .await
        .expect("create event as collaborator");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["ownerId"], outsider.id.as_str());
}
