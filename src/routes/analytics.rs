use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::response::{ok, AppError};
use crate::state::AppState;

pub async fn learner_summary(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Result<Response, AppError> {
    let summary = state.analytics().learner_summary(&learner_id).await?;
    Ok(ok(summary).into_response())
}
