use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::adaptive::mastery::{self, AttemptOutcome};
use crate::adaptive::pipeline::{Selection, SelectionError, SelectionPipeline, SelectionRequest};
use crate::adaptive::types::{Item, ItemType, Mode, ResponseEvent};
use crate::store::{StoreError, Stores};

const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("learner {0} not found")]
    LearnerNotFound(String),
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("no topic available (course: {course:?})")]
    NoTopicAvailable { course: Option<String> },
    #[error("no content available (course: {course:?}, topic: {topic:?})")]
    NoContentAvailable {
        course: Option<String>,
        topic: Option<String>,
    },
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<SelectionError> for QuizError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::NoTopicAvailable { course } => Self::NoTopicAvailable { course },
            SelectionError::NoContentAvailable { course, topic } => {
                Self::NoContentAvailable { course, topic }
            }
            SelectionError::Persistence(err) => Self::Persistence(err),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NextItemInput {
    pub learner_id: String,
    pub course: Option<String>,
    pub topic: Option<String>,
    pub mode: Mode,
}

#[derive(Debug, Clone, Default)]
pub struct SubmitAnswerInput {
    pub learner_id: String,
    pub item_id: String,
    pub selected_option: Option<String>,
    pub used_hint: bool,
    pub time_taken_sec: f64,
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResult {
    pub is_correct: bool,
    pub new_mastery: f64,
    pub streak: u32,
    pub attempts: u32,
    pub points: u32,
    pub penalty: f64,
    pub topic: String,
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub attempt_id: String,
}

/// Serializes read-modify-write cycles per learner without making different
/// learners contend.
#[derive(Default)]
pub struct LearnerLocks {
    table: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LearnerLocks {
    pub async fn acquire(&self, learner_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock();
            if table.len() >= LOCK_TABLE_PRUNE_THRESHOLD {
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(table.entry(learner_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct QuizService {
    stores: Stores,
    pipeline: Arc<SelectionPipeline>,
    locks: LearnerLocks,
}

impl QuizService {
    pub fn new(stores: Stores, pipeline: Arc<SelectionPipeline>) -> Self {
        Self {
            stores,
            pipeline,
            locks: LearnerLocks::default(),
        }
    }

    pub async fn next_item(&self, input: NextItemInput) -> Result<Selection, QuizError> {
        let learner = self
            .stores
            .learners
            .find(&input.learner_id)
            .await?
            .ok_or_else(|| QuizError::LearnerNotFound(input.learner_id.clone()))?;

        let request = SelectionRequest {
            course: normalize(input.course),
            topic: normalize(input.topic),
            mode: input.mode,
        };
        let selection = self.pipeline.select(&learner, &request, Utc::now()).await?;

        tracing::info!(
            learner_id = %learner.id,
            item_id = %selection.item.id,
            topic = %selection.effective_topic,
            difficulty = %selection.effective_difficulty,
            tier = selection.tier.as_str(),
            "next item served"
        );
        Ok(selection)
    }

    pub async fn submit_answer(&self, input: SubmitAnswerInput) -> Result<SubmitAnswerResult, QuizError> {
        let _guard = self.locks.acquire(&input.learner_id).await;

        let mut learner = self
            .stores
            .learners
            .find(&input.learner_id)
            .await?
            .ok_or_else(|| QuizError::LearnerNotFound(input.learner_id.clone()))?;
        let item = self
            .stores
            .items
            .find_by_id(&input.item_id)
            .await?
            .ok_or_else(|| QuizError::ItemNotFound(input.item_id.clone()))?;

        let now = Utc::now();
        let outcome = AttemptOutcome {
            is_correct: grade(&item, input.selected_option.as_deref()),
            used_hint: input.used_hint,
            time_taken_sec: input.time_taken_sec,
            mode: input.mode,
        };
        let points = if outcome.is_correct {
            item.difficulty.points()
        } else {
            0
        };

        let event = ResponseEvent {
            id: uuid::Uuid::new_v4().to_string(),
            learner_id: learner.id.clone(),
            item_id: item.id.clone(),
            topic: item.topic.clone(),
            difficulty: item.difficulty,
            mode: input.mode,
            is_correct: outcome.is_correct,
            selected_option: input.selected_option.clone(),
            used_hint: input.used_hint,
            penalty: outcome.penalty(),
            points,
            time_taken_sec: input.time_taken_sec.max(0.0),
            created_at: now,
        };
        let attempt_id = event.id.clone();
        self.stores.responses.append(event).await?;

        let record = mastery::update(&mut learner, &item.topic, &outcome, now);
        self.stores.learners.save(&learner).await?;

        tracing::info!(
            learner_id = %learner.id,
            item_id = %item.id,
            topic = %record.topic,
            is_correct = outcome.is_correct,
            mastery = record.score,
            streak = record.streak,
            "answer recorded"
        );

        Ok(SubmitAnswerResult {
            is_correct: outcome.is_correct,
            new_mastery: record.score,
            streak: record.streak,
            attempts: record.attempts,
            points,
            penalty: outcome.penalty(),
            topic: record.topic,
            correct_answer: item.correct_answer,
            explanation: item.explanation,
            attempt_id,
        })
    }
}

/// Multiple-choice answers must match the key exactly; free-response items
/// count any non-blank answer as correct.
pub fn grade(item: &Item, selected: Option<&str>) -> bool {
    match item.item_type {
        ItemType::Mcq => match (selected, item.correct_answer.as_deref()) {
            (Some(selected), Some(correct)) => selected == correct,
            _ => false,
        },
        ItemType::Short | ItemType::Code => selected.is_some_and(|s| !s.trim().is_empty()),
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
