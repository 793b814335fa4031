use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::adaptive::types::Mode;
use crate::response::{ok, AppError};
use crate::routes::parse_body;
use crate::services::quiz::{NextItemInput, SubmitAnswerInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextItemRequest {
    learner_id: String,
    #[serde(default)]
    course: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerRequest {
    learner_id: String,
    item_id: String,
    #[serde(default)]
    selected_option: Option<String>,
    #[serde(default)]
    used_hint: Option<Value>,
    #[serde(default)]
    time_taken_sec: Option<Value>,
    #[serde(default)]
    mode: Option<String>,
}

fn request_mode(raw: Option<&str>) -> Mode {
    raw.map(Mode::parse).unwrap_or_default()
}

/// Clients send hint flags as booleans, 0/1, strings or null.
fn hint_flag(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Seconds as a number or numeric string; anything else counts as zero.
fn elapsed_seconds(raw: Option<&Value>) -> f64 {
    let seconds = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    seconds.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub async fn next_item(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let payload: NextItemRequest = parse_body(&body)?;
    if payload.learner_id.trim().is_empty() {
        return Err(AppError::validation("learnerId is required"));
    }

    let selection = state
        .quiz()
        .next_item(NextItemInput {
            mode: request_mode(payload.mode.as_deref()),
            learner_id: payload.learner_id,
            course: payload.course,
            topic: payload.topic,
        })
        .await?;

    Ok(ok(selection).into_response())
}

pub async fn submit_answer(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let payload: SubmitAnswerRequest = parse_body(&body)?;
    if payload.learner_id.trim().is_empty() || payload.item_id.trim().is_empty() {
        return Err(AppError::validation("learnerId and itemId are required"));
    }

    let result = state
        .quiz()
        .submit_answer(SubmitAnswerInput {
            mode: request_mode(payload.mode.as_deref()),
            learner_id: payload.learner_id,
            item_id: payload.item_id,
            selected_option: payload.selected_option,
            used_hint: hint_flag(payload.used_hint.as_ref()),
            time_taken_sec: elapsed_seconds(payload.time_taken_sec.as_ref()),
        })
        .await?;

    Ok(ok(result).into_response())
}
