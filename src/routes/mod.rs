mod analytics;
mod courses;
mod health;
mod items;
mod quiz;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::response::{AppError, ErrorResponse};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/quiz/next", post(quiz::next_item))
        .route("/api/quiz/submit", post(quiz::submit_answer))
        .route(
            "/api/analytics/learners/:id/summary",
            get(analytics::learner_summary),
        )
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/:course/subjects", get(courses::list_subjects))
        .route("/api/courses/:course/questions", get(courses::list_questions))
        .route(
            "/api/courses/learning-path/:course",
            get(courses::learning_path),
        )
        .route("/api/items/export", get(items::export_items))
        .route("/api/items/import", post(items::import_items))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(ErrorResponse {
            success: false,
            error: "route not found".to_string(),
            code: "NOT_FOUND".to_string(),
            details: None,
        }),
    )
        .into_response()
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("request body is required"));
    }
    serde_json::from_slice(body).map_err(|err| AppError::validation(format!("invalid request body: {err}")))
}
