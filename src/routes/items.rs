use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::parse_body;
use crate::services::items::ItemDraft;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ImportRequest {
    items: Vec<ItemDraft>,
}

#[derive(Serialize)]
struct ImportResponse {
    inserted: usize,
}

pub async fn export_items(State(state): State<AppState>) -> Result<Response, AppError> {
    let export = state.catalog().export().await?;
    Ok(ok(export).into_response())
}

pub async fn import_items(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let payload: ImportRequest = parse_body(&body)?;
    let inserted = state.catalog().import(payload.items).await?;
    Ok(ok(ImportResponse { inserted }).into_response())
}
