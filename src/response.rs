use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::services::analytics::AnalyticsError;
use crate::services::items::ImportError;
use crate::services::quiz::QuizError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<Value>,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, code, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
            is_operational: false,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.is_operational {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
        }
        let message = if self.is_operational {
            self.message
        } else {
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { .. } => Self::conflict(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::LearnerNotFound(id) => {
                Self::not_found("LEARNER_NOT_FOUND", format!("learner {id} not found"))
            }
            QuizError::ItemNotFound(id) => {
                Self::not_found("ITEM_NOT_FOUND", format!("item {id} not found"))
            }
            QuizError::NoTopicAvailable { course } => Self::not_found(
                "NO_TOPIC_AVAILABLE",
                "no topic with active content is available",
            )
            .with_details(serde_json::json!({ "course": course })),
            QuizError::NoContentAvailable { course, topic } => Self::not_found(
                "NO_CONTENT_AVAILABLE",
                "no questions available, try another topic",
            )
            .with_details(serde_json::json!({ "course": course, "topic": topic })),
            QuizError::Persistence(err) => err.into(),
        }
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::LearnerNotFound(id) => {
                Self::not_found("LEARNER_NOT_FOUND", format!("learner {id} not found"))
            }
            AnalyticsError::Persistence(err) => err.into(),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Invalid { .. } => Self::validation(err.to_string()),
            ImportError::Persistence(err) => err.into(),
        }
    }
}
