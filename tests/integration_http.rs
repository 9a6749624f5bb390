mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{authed, body_json, campus, setup_test_app, token_for};
use registrar_models::UserRole;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health() {
    let c = campus();
    let app = setup_test_app(&c);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_enroll_returns_created() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": c.cs101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Enrolled successfully");
    assert_eq!(body["section_id"], c.cs101.get());
    assert_eq!(body["seats_remaining"], 29);
    assert!(body["enrollment_id"].is_i64());
}

#[tokio::test]
async fn test_enroll_without_token_is_unauthorized() {
    let c = campus();
    let app = setup_test_app(&c);

    let request = Request::builder()
        .method("POST")
        .uri("/api/enrollments")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({ "section_id": c.cs101.get() })).unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_enroll_as_instructor_is_unauthorized() {
    let c = campus();
    let instructor = c.store.add_user(UserRole::Instructor);
    let token = token_for(instructor, UserRole::Instructor);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": c.cs101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["code"], "access_denied");
    assert!(c.store.enrollments().is_empty());
}

#[tokio::test]
async fn test_enroll_while_suspended_is_unauthorized() {
    let c = campus();
    let student = c.store.add_student();
    c.store
        .suspend_until(student, Some(Utc::now() + chrono::Duration::days(3)));
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": c.cs101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Account suspended until")
    );
}

#[tokio::test]
async fn test_enroll_unknown_section_is_not_found() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": 987_654 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Section not found");
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_enroll_invalid_section_id_is_unprocessable() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": 0 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_missing_prerequisite_lists_courses() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token,
            Some(json!({ "section_id": c.cs201.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing prerequisites: CS101");
    assert_eq!(body["code"], "ineligible");
    assert_eq!(body["missing"], json!(["CS101"]));
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_full_section_is_bad_request() {
    let c = common::campus_with(Default::default(), 1);
    let first = c.store.add_student();
    let second = c.store.add_student();
    c.service.enroll(first, c.cs101).await.unwrap();

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token_for(second, UserRole::Student),
            Some(json!({ "section_id": c.cs101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Section is full");
    assert_eq!(body["code"], "full");
}

#[tokio::test]
async fn test_schedule_conflict_is_bad_request() {
    let c = campus();
    let student = c.store.add_student();
    c.service.enroll(student, c.cs101).await.unwrap();

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token_for(student, UserRole::Student),
            Some(json!({ "section_id": c.math101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Time conflict with another enrolled course");
    assert_eq!(body["code"], "schedule_conflict");
}

#[tokio::test]
async fn test_duplicate_enroll_is_conflict() {
    let c = campus();
    let student = c.store.add_student();
    c.service.enroll(student, c.cs101).await.unwrap();

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed(
            "POST",
            "/api/enrollments",
            &token_for(student, UserRole::Student),
            Some(json!({ "section_id": c.cs101.get() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "already_enrolled");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_drop_and_schedule_round_trip() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);
    c.service.enroll(student, c.cs101).await.unwrap();

    let app = setup_test_app(&c);
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/enrollments", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["course_code"], "CS101");
    assert_eq!(body[0]["room_name"], "Science Hall 101");

    let uri = format!("/api/enrollments/{}", c.cs101);
    let response = app
        .clone()
        .oneshot(authed("DELETE", &uri, &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Enrollment dropped");
    assert_eq!(body["section_id"], c.cs101.get());

    let response = app
        .oneshot(authed("DELETE", &uri, &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(c.store.section(c.cs101).unwrap().enrolled, 0);
    c.assert_consistent();
}

#[tokio::test]
async fn test_section_availability_open_to_any_role() {
    let c = campus();
    let student = c.store.add_student();
    c.service.enroll(student, c.cs101).await.unwrap();
    let instructor = c.store.add_user(UserRole::Instructor);

    let app = setup_test_app(&c);
    let uri = format!("/api/sections/{}/availability", c.cs101);
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &uri,
            &token_for(instructor, UserRole::Instructor),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enrolled"], 1);
    assert_eq!(body["capacity"], 30);
    assert_eq!(body["seats_remaining"], 29);

    let response = app
        .oneshot(authed(
            "GET",
            "/api/sections/424242/availability",
            &token_for(instructor, UserRole::Instructor),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_course_eligibility_endpoint() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/courses/CS201/eligibility", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["eligible"], false);
    assert_eq!(body["missing"], json!(["CS101"]));

    c.complete_cs101(student, "B").await;

    let response = app
        .oneshot(authed("GET", "/api/courses/CS201/eligibility", &token, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["eligible"], true);
    assert_eq!(body["missing"], json!([]));
}

#[tokio::test]
async fn test_student_status_endpoint() {
    let c = campus();
    let student = c.store.add_student();
    let token = token_for(student, UserRole::Student);

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed("GET", "/api/students/me/status", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["student_id"], student.get());
    assert_eq!(body["is_suspended"], false);
    assert!(body["suspended_until"].is_null());
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let c = campus();
    let student = c.store.add_student();
    let token = format!("{}x", token_for(student, UserRole::Student));

    let app = setup_test_app(&c);
    let response = app
        .oneshot(authed("GET", "/api/students/me/status", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
