//! Next-item selection
//!
//! Resolves a topic, asks the rule evaluator for a difficulty, gathers cached
//! candidates and narrows them by spacing. When a pool comes up empty the
//! pipeline escalates through [`FallbackTier::ESCALATION`] until some tier
//! yields an item, so a request only fails when the catalog has no active item.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::adaptive::rules::{self, RuleContext, NO_PRIOR_ATTEMPT_MINUTES};
use crate::adaptive::spacing::SpacingFilter;
use crate::adaptive::types::{
    Difficulty, Item, ItemType, Learner, Mode, PresentedItem, Rule, DEFAULT_MASTERY_SCORE,
};
use crate::cache::keys::CandidateKey;
use crate::cache::CandidateCache;
use crate::store::{ItemFilter, ItemStore, ResponseStore, RuleStore, StoreError, Stores};

#[derive(Debug, Clone)]
pub struct SelectionSettings {
    /// Spacing window used when the topic has no active rule.
    pub default_cooldown: Duration,
    /// Lifetime of cached candidate lists; `None` uses the cache default.
    pub candidate_ttl: Option<Duration>,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            default_cooldown: Duration::from_secs(crate::config::DEFAULT_COOLDOWN_MINS * 60),
            candidate_ttl: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionRequest {
    pub course: Option<String>,
    pub topic: Option<String>,
    pub mode: Mode,
}

/// Candidate pools in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackTier {
    /// Resolved topic and difficulty, minus items inside the cooldown window.
    Spaced,
    /// Resolved topic and difficulty, spacing ignored.
    Unspaced,
    /// Any active item for the topic regardless of difficulty.
    AnyDifficulty,
    /// Any active item in the catalog.
    Global,
}

impl FallbackTier {
    pub const ESCALATION: [FallbackTier; 4] = [
        FallbackTier::Spaced,
        FallbackTier::Unspaced,
        FallbackTier::AnyDifficulty,
        FallbackTier::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spaced => "spaced",
            Self::Unspaced => "unspaced",
            Self::AnyDifficulty => "anyDifficulty",
            Self::Global => "global",
        }
    }
}

/// Inputs shared by every tier of one selection.
#[derive(Debug, Clone)]
pub struct TierScope {
    pub learner_id: String,
    pub course: Option<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub cooldown: Duration,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub item: PresentedItem,
    pub effective_topic: String,
    pub effective_difficulty: Difficulty,
    pub requested_difficulty: Difficulty,
    pub course: Option<String>,
    pub tier: FallbackTier,
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
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

pub struct SelectionPipeline {
    items: Arc<dyn ItemStore>,
    rules: Arc<dyn RuleStore>,
    responses: Arc<dyn ResponseStore>,
    spacing: SpacingFilter,
    cache: Arc<CandidateCache>,
    settings: SelectionSettings,
}

impl SelectionPipeline {
    pub fn new(stores: &Stores, cache: Arc<CandidateCache>, settings: SelectionSettings) -> Self {
        Self {
            items: Arc::clone(&stores.items),
            rules: Arc::clone(&stores.rules),
            responses: Arc::clone(&stores.responses),
            spacing: SpacingFilter::new(Arc::clone(&stores.responses)),
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub async fn select(
        &self,
        learner: &Learner,
        request: &SelectionRequest,
        now: DateTime<Utc>,
    ) -> Result<Selection, SelectionError> {
        let course = request.course.as_deref();
        let topic = self
            .resolve_topic(learner, request)
            .await?
            .ok_or_else(|| SelectionError::NoTopicAvailable {
                course: request.course.clone(),
            })?;

        let rule = self.rules.find_active_rule(&topic).await?;
        let context = self.build_context(learner, &topic, request.mode, now).await?;
        let difficulty = rules::decide_for_rule(rule.as_ref(), &context);

        let scope = TierScope {
            learner_id: learner.id.clone(),
            course: request.course.clone(),
            topic,
            difficulty,
            cooldown: self.cooldown_for(rule.as_ref()),
            now,
        };
        let key = CandidateKey::new(course, &scope.topic, difficulty);
        let base = self.candidate_ids(&key, &scope).await?;

        for tier in FallbackTier::ESCALATION {
            let pool = self.tier_candidates(tier, &scope, &base).await?;
            if pool.is_empty() {
                tracing::debug!(
                    learner_id = %scope.learner_id,
                    topic = %scope.topic,
                    difficulty = %difficulty,
                    tier = tier.as_str(),
                    "candidate pool empty, escalating"
                );
                continue;
            }

            let stale_key = matches!(tier, FallbackTier::Spaced | FallbackTier::Unspaced).then_some(&key);
            if let Some(item) = self.pick(pool, stale_key).await? {
                tracing::debug!(
                    learner_id = %scope.learner_id,
                    item_id = %item.id,
                    tier = tier.as_str(),
                    "selected next item"
                );
                return Ok(finish(item, &scope, tier));
            }
        }

        tracing::warn!(
            learner_id = %scope.learner_id,
            course = ?scope.course,
            topic = %scope.topic,
            "no active content after full escalation"
        );
        Err(SelectionError::NoContentAvailable {
            course: scope.course,
            topic: Some(scope.topic),
        })
    }

    /// Request topic, else the learner's weakest topic, else the first topic
    /// with active content in the course (or anywhere).
    pub async fn resolve_topic(
        &self,
        learner: &Learner,
        request: &SelectionRequest,
    ) -> Result<Option<String>, StoreError> {
        if let Some(topic) = request.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Some(topic.to_string()));
        }
        if let Some(topic) = learner.weakest_topic() {
            return Ok(Some(topic.to_string()));
        }

        let mut topics = self.items.distinct_active_topics(request.course.as_deref()).await?;
        if topics.is_empty() && request.course.is_some() {
            topics = self.items.distinct_active_topics(None).await?;
        }
        Ok(topics.into_iter().next())
    }

    pub async fn build_context(
        &self,
        learner: &Learner,
        topic: &str,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<RuleContext, StoreError> {
        let record = learner.mastery_for(topic);
        let latest = self.responses.latest_for_topic(&learner.id, topic).await?;

        let minutes_since_topic_attempt = latest
            .as_ref()
            .map(|event| (now - event.created_at).num_milliseconds().max(0) as f64 / 60_000.0)
            .unwrap_or(NO_PRIOR_ATTEMPT_MINUTES);

        Ok(RuleContext {
            mastery: record.map_or(DEFAULT_MASTERY_SCORE, |r| r.score),
            streak: record.map_or(0, |r| r.streak),
            attempts: record.map_or(0, |r| r.attempts),
            minutes_since_topic_attempt,
            last_correct: latest.as_ref().is_some_and(|e| e.is_correct),
            last_wrong: latest.as_ref().is_some_and(|e| !e.is_correct),
            mode,
        })
    }

    pub async fn tier_candidates(
        &self,
        tier: FallbackTier,
        scope: &TierScope,
        base: &[String],
    ) -> Result<Vec<String>, StoreError> {
        match tier {
            FallbackTier::Spaced => {
                self.spacing
                    .filter(&scope.learner_id, base, scope.cooldown, scope.now)
                    .await
            }
            FallbackTier::Unspaced => Ok(base.to_vec()),
            FallbackTier::AnyDifficulty => {
                let filter = ItemFilter::new(scope.course.as_deref(), Some(&scope.topic), None);
                self.items.find_active_ids(&filter).await
            }
            FallbackTier::Global => self.items.find_active_ids(&ItemFilter::any()).await,
        }
    }

    fn cooldown_for(&self, rule: Option<&Rule>) -> Duration {
        rule.map(|r| Duration::from_secs(r.cooldown_mins.saturating_mul(60)))
            .unwrap_or(self.settings.default_cooldown)
    }

    async fn candidate_ids(
        &self,
        key: &CandidateKey,
        scope: &TierScope,
    ) -> Result<Vec<String>, StoreError> {
        let now_ms = scope.now.timestamp_millis();
        if let Some(ids) = self.cache.get_at(key, now_ms) {
            return Ok(ids);
        }

        let filter = ItemFilter::new(scope.course.as_deref(), Some(&scope.topic), Some(scope.difficulty));
        let ids = self.items.find_active_ids(&filter).await?;
        self.cache
            .insert_at(key.clone(), ids.clone(), self.settings.candidate_ttl, now_ms);
        Ok(ids)
    }

    /// Draws uniformly from `pool` until an id resolves to an active item.
    async fn pick(
        &self,
        mut pool: Vec<String>,
        stale_key: Option<&CandidateKey>,
    ) -> Result<Option<Item>, StoreError> {
        while !pool.is_empty() {
            let id = pool.swap_remove(random_index(pool.len()));
            match self.items.find_by_id(&id).await? {
                Some(item) if item.is_active => return Ok(Some(item)),
                _ => {
                    tracing::debug!(item_id = %id, "candidate no longer active, skipping");
                    if let Some(key) = stale_key {
                        self.cache.invalidate(key);
                    }
                }
            }
        }
        Ok(None)
    }
}

fn random_index(len: usize) -> usize {
    rand::rng().random_range(0..len)
}

/// Shuffles multiple-choice options in place when the item allows it.
pub fn randomize_options(item: &mut Item) {
    if item.item_type == ItemType::Mcq && item.randomize_options && item.options.len() > 1 {
        item.options.shuffle(&mut rand::rng());
    }
}

fn finish(mut item: Item, scope: &TierScope, tier: FallbackTier) -> Selection {
    randomize_options(&mut item);

    let course = if tier == FallbackTier::Global {
        item.course.clone()
    } else {
        scope.course.clone().or_else(|| item.course.clone())
    };

    Selection {
        effective_topic: item.topic.clone(),
        effective_difficulty: item.difficulty,
        requested_difficulty: scope.difficulty,
        course,
        tier,
        item: PresentedItem::from(item),
    }
}
