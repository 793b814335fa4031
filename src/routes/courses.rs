use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::adaptive::types::Difficulty;
use crate::response::{ok, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    topic: Option<String>,
    difficulty: Option<String>,
}

pub async fn list_courses(State(state): State<AppState>) -> Result<Response, AppError> {
    let courses = state.courses().list_courses().await?;
    Ok(ok(courses).into_response())
}

pub async fn list_subjects(
    State(state): State<AppState>,
    Path(course): Path<String>,
) -> Result<Response, AppError> {
    let subjects = state.courses().list_subjects(&course).await?;
    Ok(ok(subjects).into_response())
}

pub async fn list_questions(
    State(state): State<AppState>,
    Path(course): Path<String>,
    Query(query): Query<QuestionQuery>,
) -> Result<Response, AppError> {
    let difficulty = match query.difficulty.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Difficulty::parse(raw)
                .ok_or_else(|| AppError::validation(format!("unknown difficulty '{raw}'")))?,
        ),
    };
    let questions = state
        .courses()
        .list_questions(&course, query.topic.as_deref(), difficulty)
        .await?;
    Ok(ok(questions).into_response())
}

pub async fn learning_path(
    State(state): State<AppState>,
    Path(course): Path<String>,
) -> Result<Response, AppError> {
    Ok(ok(state.courses().learning_path(&course)).into_response())
}
