use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use pfa_backend::api::router;
use pfa_backend::events::{AppEvent, EventBus};
use pfa_backend::state::AppState;

async fn test_app() -> (Router, EventBus) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let events = EventBus::default();
    let state = AppState {
        db: pool,
        events: events.clone(),
    };
    (router(state), events)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", "Bearer test-token")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_needs_no_token() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_bearer_token_is_rejected() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/students").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn students_can_be_created_searched_and_paged() {
    let (app, _) = test_app().await;

    for (first, last, email) in [
        ("Amine", "Ben Salah", "amine@uni.tn"),
        ("Yosr", "Trabelsi", "yosr@uni.tn"),
        ("Omar", "Jlassi", "omar@uni.tn"),
    ] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/students",
                json!({
                    "first_name": first,
                    "last_name": last,
                    "email": email,
                    "level": "4"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get("/students?search=yosr")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["items"][0]["email"], "yosr@uni.tn");

    let response = app.oneshot(get("/students?per_page=2&page=2")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn period_validation_and_overlap() {
    let (app, _) = test_app().await;

    // Reversed range.
    let response = app
        .clone()
        .oneshot(post_json(
            "/period",
            json!({
                "period_type": "pfa",
                "start_date": "2025-01-31T00:00:00Z",
                "end_date": "2025-01-01T00:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_range");

    // Valid period.
    let response = app
        .clone()
        .oneshot(post_json(
            "/period",
            json!({
                "period_type": "pfa",
                "start_date": "2025-01-01T00:00:00Z",
                "end_date": "2025-01-31T00:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["period_type"], "pfa");
    assert_eq!(body["status"], "closed");

    // Overlapping same-type period.
    let response = app
        .clone()
        .oneshot(post_json(
            "/period",
            json!({
                "period_type": "pfa",
                "start_date": "2025-01-20T00:00:00Z",
                "end_date": "2025-02-10T00:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "overlap");

    // Same range for another type is fine.
    let response = app
        .oneshot(post_json(
            "/period",
            json!({
                "period_type": "stageEte",
                "start_date": "2025-01-20T00:00:00Z",
                "end_date": "2025-02-10T00:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn progress_marking_is_gated_and_append_only() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/subjects",
            json!({
                "title": "Distributed Systems",
                "level": "4",
                "semester": "S1",
                "year": 2025,
                "curriculum": {
                    "chapters": [
                        {"title": "Ch1", "sections": ["S1", "S2"]},
                        {"title": "Ch2", "sections": []}
                    ]
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let subject = body_json(response).await;
    let id = subject["id"].as_str().unwrap().to_string();

    // Skipping ahead is locked.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/subjects/{}/progress", id),
            json!({"chapter_index": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "progress_locked");

    // Complete chapter 0 and its sections in order.
    for payload in [
        json!({"chapter_index": 0}),
        json!({"chapter_index": 0, "section_index": 0}),
        json!({"chapter_index": 0, "section_index": 1}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json(&format!("/subjects/{}/progress", id), payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Completing the same unit twice is rejected.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/subjects/{}/progress", id),
            json!({"chapter_index": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "already_completed");

    // 3 of 4 units done.
    let response = app
        .clone()
        .oneshot(get(&format!("/subjects/{}/progress", id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["percent"], 75);
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);
    assert_eq!(body["entries"][1]["title"], "Ch1 - S1");

    // Now chapter 1 unlocks.
    let response = app
        .oneshot(post_json(
            &format!("/subjects/{}/progress", id),
            json!({"chapter_index": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn linked_skill_is_archived_instead_of_deleted() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/subjects",
            json!({"title": "Compilers", "level": "4", "semester": "S2", "year": 2025}),
        ))
        .await
        .unwrap();
    let subject = body_json(response).await;
    let subject_id = subject["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/skills",
            json!({"name": "Parsing", "subject_ids": [subject_id]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let skill = body_json(response).await;
    let skill_id = skill["id"].as_str().unwrap().to_string();

    // Plain delete is refused with a structured code.
    let response = app
        .clone()
        .oneshot(delete(&format!("/skills/{}", skill_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "linked");

    // Archiving instead is accepted and hides the skill.
    let response = app
        .clone()
        .oneshot(delete(&format!("/skills/{}?archive=true", skill_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(get("/skills")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 0);

    // Restore brings it back.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/skills/{}/restore", skill_id))
                .header("authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/skills")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 1);
}

#[tokio::test]
async fn creating_a_year_publishes_an_event() {
    let (app, events) = test_app().await;
    let mut rx = events.subscribe();

    let response = app
        .oneshot(post_json("/years", json!({"label": "2025-2026"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = rx.recv().await.expect("event");
    assert_eq!(
        event,
        AppEvent::YearCreated {
            label: "2025-2026".to_string()
        }
    );
}

#[tokio::test]
async fn validated_choices_respect_topic_capacity() {
    let (app, _) = test_app().await;

    let mut student_ids = Vec::new();
    for (first, email) in [("A", "a@uni.tn"), ("B", "b@uni.tn")] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/students",
                json!({"first_name": first, "last_name": "X", "email": email, "level": "4"}),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        student_ids.push(body["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/pfa",
            json!({
                "title": "Compiler playground",
                "description": "Toy language tooling",
                "technologies": "Rust",
                "mode": "monome",
                "year": 2025
            }),
        ))
        .await
        .unwrap();
    let topic = body_json(response).await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let mut choice_ids = Vec::new();
    for (i, student_id) in student_ids.iter().enumerate() {
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/pfa/{}/choices", topic_id),
                json!({"student_id": student_id, "priority": i + 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        choice_ids.push(body["id"].as_str().unwrap().to_string());
    }

    // First accepted + validated choice fills the monome topic.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/pfa/{}/choices/{}", topic_id, choice_ids[0]))
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"accepted_by_teacher": true, "validated": true}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Second validation exceeds capacity.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/pfa/{}/choices/{}", topic_id, choice_ids[1]))
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"accepted_by_teacher": true, "validated": true}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "capacity");

    let response = app.oneshot(get(&format!("/pfa/{}", topic_id))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["students"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn planning_room_conflicts_are_rejected() {
    let (app, _) = test_app().await;

    let mut teacher_ids = Vec::new();
    for email in ["enc@uni.tn", "rap@uni.tn"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/teachers",
                json!({"first_name": "T", "last_name": "X", "email": email}),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        teacher_ids.push(body["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/pfa",
            json!({
                "title": "Chat platform",
                "description": "Websocket chat",
                "technologies": "Rust",
                "mode": "binome",
                "year": 2025
            }),
        ))
        .await
        .unwrap();
    let topic = body_json(response).await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let slot = |time: &str, room: &str| {
        json!({
            "topic_id": topic_id,
            "date": "2025-06-20",
            "time": time,
            "room": room,
            "duration_minutes": 30,
            "encadrant_id": teacher_ids[0],
            "rapporteur_id": teacher_ids[1]
        })
    };

    let response = app
        .clone()
        .oneshot(post_json("/plannings", slot("09:00", "A1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same room, overlapping window.
    let response = app
        .clone()
        .oneshot(post_json("/plannings", slot("09:15", "A1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "room_taken");

    // Same rapporteur and encadrant.
    let response = app
        .clone()
        .oneshot(post_json(
            "/plannings",
            json!({
                "topic_id": topic_id,
                "date": "2025-06-20",
                "time": "11:00",
                "room": "A1",
                "duration_minutes": 30,
                "encadrant_id": teacher_ids[0],
                "rapporteur_id": teacher_ids[0]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "same_teacher");

    // Publish all slots.
    let response = app
        .clone()
        .oneshot(post_json("/plannings/publish", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["published"], 1);

    let response = app.oneshot(get("/plannings?published_only=true")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}
