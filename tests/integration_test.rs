use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use elera_backend::adaptive::types::Difficulty;
use elera_backend::seed::DEMO_LEARNER_ID;
use elera_backend::store::memory::MemoryStores;
use elera_backend::store::LearnerStore;

mod common;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cachedCandidateLists"], 0);
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, get("/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_next_submit_and_summary_flow() {
    let app = common::create_test_app().await;

    let (status, next) = send(
        &app,
        post_json("/api/quiz/next", json!({ "learnerId": DEMO_LEARNER_ID, "course": "DBMS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["success"], true);
    let data = &next["data"];
    assert_eq!(data["effectiveTopic"], "ER Model");
    assert_eq!(data["requestedDifficulty"], "easy");
    assert_eq!(data["course"], "DBMS");
    assert!(data["item"].get("correctAnswer").is_none());

    let item_id = data["item"]["id"].as_str().unwrap().to_string();
    let choice = data["item"]["options"][0].as_str().unwrap().to_string();

    let (status, submitted) = send(
        &app,
        post_json(
            "/api/quiz/submit",
            json!({
                "learnerId": DEMO_LEARNER_ID,
                "itemId": item_id,
                "selectedOption": choice,
                "timeTakenSec": 8,
                "mode": "formative"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = &submitted["data"];
    assert_eq!(result["topic"], "ER Model");
    assert_eq!(result["attempts"], 1);
    let is_correct = result["isCorrect"].as_bool().unwrap();
    assert_eq!(is_correct, result["correctAnswer"] == json!(choice));
    let expected_points = if is_correct { Difficulty::Easy.points() } else { 0 };
    assert_eq!(result["points"], expected_points);

    let (status, summary) = send(
        &app,
        get(&format!("/api/analytics/learners/{DEMO_LEARNER_ID}/summary")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let heatmap = summary["data"]["heatmap"].as_array().unwrap();
    assert_eq!(heatmap.len(), 1);
    assert_eq!(heatmap[0]["topic"], "ER Model");
    assert_eq!(heatmap[0]["total"], 1);
    assert_eq!(summary["data"]["trajectory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_next_item_errors_map_to_codes() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, post_json("/api/quiz/next", json!({ "learnerId": "ghost" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "LEARNER_NOT_FOUND");

    let (status, body) = send(&app, post_json("/api/quiz/next", json!({ "learnerId": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let empty = Request::builder()
        .method("POST")
        .uri("/api/quiz/next")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_empty_catalog_reports_no_content() {
    let memory = MemoryStores::new();
    common::seed(&memory, vec![], vec![common::learner("l1", &[("Joins", 0.3)])], vec![]).await;
    let app = common::app_with_memory(&memory);

    let (status, body) = send(
        &app,
        post_json("/api/quiz/next", json!({ "learnerId": "l1", "course": "DBMS" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_CONTENT_AVAILABLE");
    assert_eq!(body["details"]["course"], "DBMS");
    assert_eq!(body["details"]["topic"], "Joins");
}

#[tokio::test]
async fn test_submit_unknown_item() {
    let app = common::create_test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/quiz/submit",
            json!({ "learnerId": DEMO_LEARNER_ID, "itemId": "missing", "selectedOption": "A" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ITEM_NOT_FOUND");
}

#[tokio::test]
async fn test_summary_for_unknown_learner() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, get("/api/analytics/learners/ghost/summary")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "LEARNER_NOT_FOUND");
}

#[tokio::test]
async fn test_import_then_export() {
    let app = common::app_with_memory(&MemoryStores::new());

    let (status, body) = send(
        &app,
        post_json(
            "/api/items/import",
            json!({
                "items": [
                    {
                        "course": "DSA",
                        "text": "Which structure is LIFO?",
                        "type": "mcq",
                        "options": ["Stack", "Queue"],
                        "correctAnswer": "Stack",
                        "topic": "Stacks",
                        "difficulty": "easy"
                    },
                    { "text": "Explain a hash collision.", "type": "short", "topic": "Hashing" }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["inserted"], 2);

    let (status, body) = send(&app, get("/api/items/export")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items[0]["correctAnswer"], "Stack");
    assert_eq!(items[1]["difficulty"], "easy");

    let (status, body) = send(
        &app,
        post_json("/api/items/import", json!({ "items": [{ "text": "" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_submit_coerces_loose_hint_and_time_fields() {
    let memory = MemoryStores::new();
    common::seed(
        &memory,
        vec![common::mcq("q1", "C", "Stacks", Difficulty::Easy)],
        vec![common::learner("l1", &[])],
        vec![],
    )
    .await;
    let app = common::app_with_memory(&memory);

    let (status, body) = send(
        &app,
        post_json(
            "/api/quiz/submit",
            json!({
                "learnerId": "l1",
                "itemId": "q1",
                "selectedOption": "right",
                "usedHint": null,
                "timeTakenSec": "12"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["penalty"], 0.0);
    assert_eq!(body["data"]["newMastery"], 0.65);

    let (status, body) = send(
        &app,
        post_json(
            "/api/quiz/submit",
            json!({
                "learnerId": "l1",
                "itemId": "q1",
                "selectedOption": "right",
                "usedHint": 1,
                "timeTakenSec": "later"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["penalty"], 0.1);

    let learner = memory.learners.find("l1").await.unwrap().unwrap();
    assert_eq!(learner.mastery_for("Stacks").unwrap().time_on_task_sec, 12.0);
}

#[tokio::test]
async fn test_course_browsing_routes() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, get("/api/courses")).await;
    assert_eq!(status, StatusCode::OK);
    let courses = body["data"]["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 8);
    assert_eq!(courses[1]["name"], "DSA");

    let (status, body) = send(&app, get("/api/courses/DSA/subjects")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["course"], "DSA");
    assert_eq!(body["data"]["subjects"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        get("/api/courses/DBMS/questions?topic=SQL%20Basics&difficulty=easy"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(body["data"]["count"], questions.len());
    assert!(!questions.is_empty());
    for question in questions {
        assert_eq!(question["topic"], "SQL Basics");
        assert_eq!(question["difficulty"], "easy");
        assert!(question.get("correctAnswer").is_none());
    }

    let (status, body) = send(&app, get("/api/courses/DBMS/questions?difficulty=brutal")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, get("/api/courses/learning-path/DSA")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"][1]["topic"], "Stacks");
    assert_eq!(body["data"]["path"][1]["id"], 2);
}
