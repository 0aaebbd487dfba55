use crate::core::time::primitive_now_utc;
use crate::db::models::{Event, Question, User};
use crate::repositories;
use crate::services::permissions::Rank;
use crate::test_support::{self, TestContext};
use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

struct Fixture {
    professor: User,
    student: User,
    event: Event,
    question: Question,
}

async fn active_event(ctx: &TestContext, strict: bool) -> Fixture {
    let db = ctx.state.db();
    let professor = test_support::insert_user(db, "prof100", Rank::Professor).await;
    let student = test_support::insert_user(db, "student100", Rank::Student).await;
    let group = test_support::insert_group(db, "group-100", &[&student]).await;
    let quiz = test_support::insert_quiz(db, "quiz-100", &professor, strict).await;
    let question = test_support::insert_question(db, "question-100", &quiz).await;
    let now = primitive_now_utc();
    let event = test_support::insert_event(
        db,
        &professor,
        &group,
        &quiz,
        now - Duration::minutes(5),
        now + Duration::hours(1),
    )
    .await;
    Fixture { professor, student, event, question }
}

async fn submit(
    ctx: &TestContext,
    token: &str,
    question_id: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/questions/{question_id}/user-answers"),
            Some(token),
            Some(body),
        ))
        .await
        .expect("submit answer");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn single_answer_is_recorded_once() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let (status, body) = submit(&ctx, &token, &fixture.question.id, json!({"answer": "42"})).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["answerContent"], "42");
    assert_eq!(body["eventId"], fixture.event.id.as_str());
    assert_eq!(body["valid"], serde_json::Value::Null);

    let (status, body) = submit(&ctx, &token, &fixture.question.id, json!({"answer": "43"})).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["error"], "UserAnswer already exists");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn batch_answers_come_back_in_order() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let (status, body) =
        submit(&ctx, &token, &fixture.question.id, json!({"answers": ["red", "green"]})).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    let answers = body.as_array().expect("batch array");
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0]["answerContent"], "red");
    assert_eq!(answers[1]["answerContent"], "green");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn malformed_payloads_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let payloads = [
        json!({}),
        json!({"answers": []}),
        json!({"answer": "a", "answers": ["b"]}),
        json!({"answer": ""}),
        json!({"answers": ["ok", ""]}),
    ];
    for body in payloads {
        let (status, body) = submit(&ctx, &token, &fixture.question.id, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
    }
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn question_outside_the_quiz_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let other_quiz =
        test_support::insert_quiz(ctx.state.db(), "quiz-101", &fixture.professor, false).await;
    let stray = test_support::insert_question(ctx.state.db(), "question-101", &other_quiz).await;
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let (status, body) = submit(&ctx, &token, &stray.id, json!({"answer": "x"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["error"], "Question not found");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn strict_quiz_refuses_from_third_warning() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, true).await;
    for _ in 0..3 {
        repositories::event_warns::increment(
            ctx.state.db(),
            &uuid::Uuid::new_v4().to_string(),
            &fixture.event.id,
            &fixture.student.id,
            primitive_now_utc(),
        )
        .await
        .expect("warn");
    }
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let (status, body) = submit(&ctx, &token, &fixture.question.id, json!({"answer": "x"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn lenient_quiz_ignores_warnings() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    for _ in 0..5 {
        repositories::event_warns::increment(
            ctx.state.db(),
            &uuid::Uuid::new_v4().to_string(),
            &fixture.event.id,
            &fixture.student.id,
            primitive_now_utc(),
        )
        .await
        .expect("warn");
    }
    let token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);

    let (status, body) = submit(&ctx, &token, &fixture.question.id, json!({"answer": "x"})).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn owner_grades_and_student_reads_back() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let student_token = test_support::bearer_token(&ctx.state, &fixture.student, Rank::Student);
    let professor_token =
        test_support::bearer_token(&ctx.state, &fixture.professor, Rank::Professor);

    let (_, created) =
        submit(&ctx, &student_token, &fixture.question.id, json!({"answer": "42"})).await;
    let answer_id = created["id"].as_str().expect("answer id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/user-answers/{answer_id}"),
            Some(&student_token),
            Some(json!({"valid": true})),
        ))
        .await
        .expect("grade as student");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/user-answers/{answer_id}"),
            Some(&professor_token),
            Some(json!({"valid": true})),
        ))
        .await
        .expect("grade as owner");
    let status = response.status();
    let graded = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["valid"], true);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/user-answers/me",
            Some(&student_token),
            None,
        ))
        .await
        .expect("own answers");
    let mine = test_support::read_json(response).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    assert_eq!(mine[0]["valid"], true);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn submission_before_start_finds_no_event() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let professor = test_support::insert_user(db, "prof110", Rank::Professor).await;
    let student = test_support::insert_user(db, "student110", Rank::Student).await;
    let group = test_support::insert_group(db, "group-110", &[&student]).await;
    let quiz = test_support::insert_quiz(db, "quiz-110", &professor, true).await;
    let question = test_support::insert_question(db, "question-110", &quiz).await;
    let now = primitive_now_utc();
    test_support::insert_event(
        db,
        &professor,
        &group,
        &quiz,
        now + Duration::minutes(10),
        now + Duration::minutes(70),
    )
    .await;
    let token = test_support::bearer_token(&ctx.state, &student, Rank::Student);

    let (status, body) = submit(&ctx, &token, &question.id, json!({"answer": "early"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["error"], "Event not found");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn student_without_group_finds_no_event() {
    let ctx = test_support::setup_test_context().await;
    let fixture = active_event(&ctx, false).await;
    let loner = test_support::insert_user(ctx.state.db(), "student111", Rank::Student).await;
    let token = test_support::bearer_token(&ctx.state, &loner, Rank::Student);

    let (status, body) = submit(&ctx, &token, &fixture.question.id, json!({"answer": "x"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["error"], "Event not found");
}
