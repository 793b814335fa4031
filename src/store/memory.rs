use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{CourseStore, ItemFilter, ItemStore, LearnerStore, ResponseStore, RuleStore, StoreError};
use crate::adaptive::types::{Course, Item, Learner, ResponseEvent, Rule};

#[derive(Default)]
pub struct MemoryLearnerStore {
    learners: RwLock<HashMap<String, Learner>>,
}

impl MemoryLearnerStore {
    /// Inserts or replaces a learner without a version check.
    pub fn upsert(&self, learner: Learner) {
        self.learners.write().insert(learner.id.clone(), learner);
    }
}

#[async_trait]
impl LearnerStore for MemoryLearnerStore {
    async fn find(&self, id: &str) -> Result<Option<Learner>, StoreError> {
        Ok(self.learners.read().get(id).cloned())
    }

    async fn save(&self, learner: &Learner) -> Result<Learner, StoreError> {
        let mut learners = self.learners.write();
        if let Some(stored) = learners.get(&learner.id) {
            if stored.version != learner.version {
                return Err(StoreError::VersionConflict {
                    entity: "learner",
                    id: learner.id.clone(),
                    stored: stored.version,
                    attempted: learner.version,
                });
            }
        }
        let mut saved = learner.clone();
        saved.version = learner.version.wrapping_add(1);
        learners.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }
}

/// Keeps items in insertion order, which is the catalog's declaration order.
#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    pub fn set_active(&self, id: &str, active: bool) -> bool {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn find_active_ids(&self, filter: &ItemFilter) -> Result<Vec<String>, StoreError> {
        Ok(self
            .items
            .read()
            .iter()
            .filter(|item| filter.matches(item))
            .map(|item| item.id.clone())
            .collect())
    }

    async fn find_active(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .items
            .read()
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().iter().find(|item| item.id == id).cloned())
    }

    async fn distinct_active_topics(&self, course: Option<&str>) -> Result<Vec<String>, StoreError> {
        let filter = ItemFilter::new(course, None, None);
        let mut topics: Vec<String> = Vec::new();
        for item in self.items.read().iter().filter(|item| filter.matches(item)) {
            if !topics.contains(&item.topic) {
                topics.push(item.topic.clone());
            }
        }
        Ok(topics)
    }

    async fn all(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.read().clone())
    }

    async fn insert_many(&self, items: Vec<Item>) -> Result<usize, StoreError> {
        let count = items.len();
        let mut stored = self.items.write();
        for item in items {
            match stored.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => stored.push(item),
            }
        }
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemoryCourseStore {
    courses: RwLock<Vec<Course>>,
}

impl MemoryCourseStore {
    /// Adds a course, replacing any existing course with the same name.
    pub fn insert(&self, course: Course) {
        let mut courses = self.courses.write();
        match courses.iter_mut().find(|c| c.name == course.name) {
            Some(existing) => *existing = course,
            None => courses.push(course),
        }
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn list_active(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self
            .courses
            .read()
            .iter()
            .filter(|course| course.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRuleStore {
    pub fn insert(&self, rule: Rule) {
        self.rules.write().push(rule);
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_active_rule(&self, topic: &str) -> Result<Option<Rule>, StoreError> {
        Ok(self
            .rules
            .read()
            .iter()
            .find(|rule| rule.active && rule.topic == topic)
            .cloned())
    }
}

/// Append-only response log.
#[derive(Default)]
pub struct MemoryResponseStore {
    events: RwLock<Vec<ResponseEvent>>,
}

impl MemoryResponseStore {
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn find_recent(
        &self,
        learner_id: &str,
        item_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ResponseEvent>, StoreError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.learner_id == learner_id && e.created_at >= since)
            .filter(|e| item_ids.iter().any(|id| *id == e.item_id))
            .cloned()
            .collect())
    }

    async fn latest_for_topic(
        &self,
        learner_id: &str,
        topic: &str,
    ) -> Result<Option<ResponseEvent>, StoreError> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.learner_id == learner_id && e.topic == topic)
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn for_learner(&self, learner_id: &str) -> Result<Vec<ResponseEvent>, StoreError> {
        let mut events: Vec<ResponseEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn append(&self, event: ResponseEvent) -> Result<(), StoreError> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Concrete in-memory stores, kept typed so seeding and tests can reach the
/// inherent helpers.
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub learners: Arc<MemoryLearnerStore>,
    pub items: Arc<MemoryItemStore>,
    pub rules: Arc<MemoryRuleStore>,
    pub responses: Arc<MemoryResponseStore>,
    pub courses: Arc<MemoryCourseStore>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}
