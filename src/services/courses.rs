use serde::Serialize;

use crate::adaptive::types::{Course, Difficulty, PresentedItem};
use crate::store::{ItemFilter, StoreError, Stores};

#[derive(Debug, Clone, Serialize)]
pub struct CourseList {
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseSubjects {
    pub course: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionList {
    pub count: usize,
    pub questions: Vec<PresentedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningStep {
    pub id: u32,
    pub title: &'static str,
    pub topic: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningPath {
    pub course: String,
    pub path: Vec<LearningStep>,
}

const fn step(id: u32, topic: &'static str, description: &'static str) -> LearningStep {
    LearningStep {
        id,
        title: topic,
        topic,
        description,
    }
}

const LEARNING_PATHS: &[(&str, &[LearningStep])] = &[
    (
        "DBMS",
        &[
            step(1, "ER Model", "Entities, relationships and schemas."),
            step(2, "Normalization", "1NF → 3NF forms and anomalies."),
            step(3, "SQL Basics", "SELECT, WHERE, JOIN fundamentals."),
        ],
    ),
    (
        "DSA",
        &[
            step(1, "Arrays", "Indexing, traversal, complexity."),
            step(2, "Stacks", "LIFO operations and use-cases."),
            step(3, "Queues", "FIFO ordering and variants."),
        ],
    ),
];

/// Read-only browsing over courses and their active items.
///
/// Questions are returned as [`PresentedItem`]s, so answer keys and
/// explanations never leave through this service.
pub struct CourseCatalogService {
    stores: Stores,
}

impl CourseCatalogService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn list_courses(&self) -> Result<CourseList, StoreError> {
        let courses = self.stores.courses.list_active().await?;
        Ok(CourseList { courses })
    }

    /// Subjects are the distinct topics of the course's active items, which
    /// may differ from the subjects a course declares.
    pub async fn list_subjects(&self, course: &str) -> Result<CourseSubjects, StoreError> {
        let subjects = self.stores.items.distinct_active_topics(Some(course)).await?;
        Ok(CourseSubjects {
            course: course.to_string(),
            subjects,
        })
    }

    pub async fn list_questions(
        &self,
        course: &str,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Result<QuestionList, StoreError> {
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());
        let filter = ItemFilter::new(Some(course), topic, difficulty);
        let questions: Vec<PresentedItem> = self
            .stores
            .items
            .find_active(&filter)
            .await?
            .into_iter()
            .map(PresentedItem::from)
            .collect();
        tracing::debug!(course, ?topic, count = questions.len(), "listed course questions");
        Ok(QuestionList {
            count: questions.len(),
            questions,
        })
    }

    /// Static study order per course; unknown courses get an empty path.
    pub fn learning_path(&self, course: &str) -> LearningPath {
        let path = LEARNING_PATHS
            .iter()
            .find(|(name, _)| *name == course)
            .map(|(_, steps)| steps.to_vec())
            .unwrap_or_default();
        LearningPath {
            course: course.to_string(),
            path,
        }
    }
}
