use crate::repositories;
use crate::services::permissions::Rank;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn admin_can_create_and_update_user() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_user(ctx.state.db(), "admin001", Rank::Admin).await;
    let token = test_support::bearer_token(&ctx.state, &admin, Rank::Admin);
    let student_role = repositories::roles::find_by_slug(ctx.state.db(), "student")
        .await
        .expect("find role")
        .expect("student role");

    let create_payload = json!({
        "username": "student123",
        "firstName": "Student",
        "lastName": "User",
        "password": "student-pass",
        "roleId": student_role.id,
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(create_payload),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let user_id = created["id"].as_str().expect("user id").to_string();
    assert_eq!(created["username"], "student123");
    assert_eq!(created["firstName"], "Student");
    assert!(created.get("hashedPassword").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            Some(json!({"lastName": "Renamed"})),
        ))
        .await
        .expect("update user");

    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["lastName"], "Renamed");
    assert_eq!(updated["firstName"], "Student");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get user");

    let status = response.status();
    let fetched = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {fetched}");
    assert_eq!(fetched["lastName"], "Renamed");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn duplicate_username_conflicts() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_user(ctx.state.db(), "admin002", Rank::Admin).await;
    let token = test_support::bearer_token(&ctx.state, &admin, Rank::Admin);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "admin002",
                "firstName": "Copy",
                "lastName": "Cat",
                "password": "long-enough",
                "roleId": admin.role_id,
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn student_edits_self_but_not_role() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "student200", Rank::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student201", Rank::Student).await;
    let token = test_support::bearer_token(&ctx.state, &student, Rank::Student);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/users/{}", student.id),
            Some(&token),
            Some(json!({"firstName": "Self"})),
        ))
        .await
        .expect("update self");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/users/{}", student.id),
            Some(&token),
            Some(json!({"roleId": other.role_id})),
        ))
        .await
        .expect("change role");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/users/{}", other.id),
            Some(&token),
            Some(json!({"firstName": "Intruder"})),
        ))
        .await
        .expect("update other");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None))
        .await
        .expect("list users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn user_groups_are_listed_for_self() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "student300", Rank::Student).await;
    test_support::insert_group(ctx.state.db(), "group-a", &[&student]).await;
    test_support::insert_group(ctx.state.db(), "group-b", &[]).await;
    let token = test_support::bearer_token(&ctx.state, &student, Rank::Student);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/users/{}/groups", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list groups");

    let status = response.status();
    let groups = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {groups}");
    let groups = groups.as_array().expect("array");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["slug"], "group-a");
}
