use serde::Serialize;

use crate::adaptive::types::{MasteryRecord, ResponseEvent};
use crate::store::{StoreError, Stores};

const TRAJECTORY_WINDOW: usize = 10;
const UNTAGGED_TOPIC: &str = "General";

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("learner {0} not found")]
    LearnerNotFound(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerView {
    pub id: String,
    pub name: String,
    pub mastery: Vec<MasteryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRate {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub idx: usize,
    pub ma: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSummary {
    pub learner: LearnerView,
    pub heatmap: Vec<TopicRate>,
    pub trajectory: Vec<TrajectoryPoint>,
}

pub struct AnalyticsService {
    stores: Stores,
}

impl AnalyticsService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn learner_summary(&self, learner_id: &str) -> Result<LearnerSummary, AnalyticsError> {
        let learner = self
            .stores
            .learners
            .find(learner_id)
            .await?
            .ok_or_else(|| AnalyticsError::LearnerNotFound(learner_id.to_string()))?;
        let events = self.stores.responses.for_learner(learner_id).await?;

        Ok(LearnerSummary {
            heatmap: topic_heatmap(&events),
            trajectory: accuracy_trajectory(&events, TRAJECTORY_WINDOW),
            learner: LearnerView {
                id: learner.id,
                name: learner.name,
                mastery: learner.mastery,
            },
        })
    }
}

/// Correctness rate per topic, in the order topics first appear.
pub fn topic_heatmap(events: &[ResponseEvent]) -> Vec<TopicRate> {
    let mut rates: Vec<TopicRate> = Vec::new();
    for event in events {
        let topic = if event.topic.trim().is_empty() {
            UNTAGGED_TOPIC
        } else {
            event.topic.as_str()
        };
        let index = match rates.iter().position(|r| r.topic == topic) {
            Some(index) => index,
            None => {
                rates.push(TopicRate {
                    topic: topic.to_string(),
                    correct: 0,
                    total: 0,
                    rate: 0.0,
                });
                rates.len() - 1
            }
        };
        let entry = &mut rates[index];
        entry.total += 1;
        entry.correct += u32::from(event.is_correct);
    }
    for entry in &mut rates {
        entry.rate = if entry.total > 0 {
            f64::from(entry.correct) / f64::from(entry.total)
        } else {
            0.0
        };
    }
    rates
}

/// Moving average of correctness; before the window fills it averages the
/// attempts seen so far.
pub fn accuracy_trajectory(events: &[ResponseEvent], window: usize) -> Vec<TrajectoryPoint> {
    let window = window.max(1);
    let mut sum = 0u32;
    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            sum += u32::from(event.is_correct);
            if i >= window {
                sum -= u32::from(events[i - window].is_correct);
            }
            let span = (i + 1).min(window);
            TrajectoryPoint {
                idx: i + 1,
                ma: f64::from(sum) / span as f64,
            }
        })
        .collect()
}
