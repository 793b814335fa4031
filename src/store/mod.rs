//! Persistence seams consumed by the selection and submission paths.
//!
//! Every store is an object-safe async trait so hosts can back it with any
//! database; [`memory`] provides the in-process implementation used by the
//! binary and the tests.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adaptive::types::{Course, Difficulty, Item, Learner, ResponseEvent, Rule};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("stale write for {entity} {id}: stored version {stored}, attempted {attempted}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        stored: u64,
        attempted: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Narrowing applied to active item lookups; `None` means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub course: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl ItemFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(course: Option<&str>, topic: Option<&str>, difficulty: Option<Difficulty>) -> Self {
        Self {
            course: course.map(str::to_string),
            topic: topic.map(str::to_string),
            difficulty,
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        item.is_active
            && self
                .course
                .as_deref()
                .map_or(true, |course| item.course.as_deref() == Some(course))
            && self.topic.as_deref().map_or(true, |topic| item.topic == topic)
            && self.difficulty.map_or(true, |d| item.difficulty == d)
    }
}

#[async_trait]
pub trait LearnerStore: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<Learner>, StoreError>;

    /// Persists `learner` if its version matches the stored one and returns the
    /// stored copy with the bumped version.
    async fn save(&self, learner: &Learner) -> Result<Learner, StoreError>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Ids of active items matching `filter`, in catalog order.
    async fn find_active_ids(&self, filter: &ItemFilter) -> Result<Vec<String>, StoreError>;

    /// Active items matching `filter`, in catalog order.
    async fn find_active(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Item>, StoreError>;

    async fn distinct_active_topics(&self, course: Option<&str>) -> Result<Vec<String>, StoreError>;

    async fn all(&self) -> Result<Vec<Item>, StoreError>;

    async fn insert_many(&self, items: Vec<Item>) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Active courses in declaration order.
    async fn list_active(&self) -> Result<Vec<Course>, StoreError>;
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn find_active_rule(&self, topic: &str) -> Result<Option<Rule>, StoreError>;
}

#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Events for `learner_id` on any of `item_ids` created at or after `since`.
    async fn find_recent(
        &self,
        learner_id: &str,
        item_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ResponseEvent>, StoreError>;

    async fn latest_for_topic(
        &self,
        learner_id: &str,
        topic: &str,
    ) -> Result<Option<ResponseEvent>, StoreError>;

    /// All events for `learner_id`, oldest first.
    async fn for_learner(&self, learner_id: &str) -> Result<Vec<ResponseEvent>, StoreError>;

    async fn append(&self, event: ResponseEvent) -> Result<(), StoreError>;
}

/// Store handles shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub learners: Arc<dyn LearnerStore>,
    pub items: Arc<dyn ItemStore>,
    pub rules: Arc<dyn RuleStore>,
    pub responses: Arc<dyn ResponseStore>,
    pub courses: Arc<dyn CourseStore>,
}

impl Stores {
    pub fn from_memory(memory: &memory::MemoryStores) -> Self {
        Self {
            learners: memory.learners.clone(),
            items: memory.items.clone(),
            rules: memory.rules.clone(),
            responses: memory.responses.clone(),
            courses: memory.courses.clone(),
        }
    }
}
