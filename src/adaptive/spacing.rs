use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::{ResponseStore, StoreError};

/// Removes candidates the learner has answered within the cooldown window.
#[derive(Clone)]
pub struct SpacingFilter {
    responses: Arc<dyn ResponseStore>,
}

impl SpacingFilter {
    pub fn new(responses: Arc<dyn ResponseStore>) -> Self {
        Self { responses }
    }

    pub async fn filter(
        &self,
        learner_id: &str,
        candidate_ids: &[String],
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let since = cooldown_start(now, cooldown);
        let recent = self
            .responses
            .find_recent(learner_id, candidate_ids, since)
            .await?;
        let seen: HashSet<&str> = recent.iter().map(|e| e.item_id.as_str()).collect();

        Ok(candidate_ids
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect())
    }
}

fn cooldown_start(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(cooldown)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
