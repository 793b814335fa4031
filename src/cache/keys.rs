use std::fmt;
use std::time::Duration;

use crate::adaptive::types::Difficulty;

pub const CANDIDATE_IDS_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_CANDIDATE_CAPACITY: usize = 500;

const ANY_COURSE: &str = "any";

/// Identifies one candidate list: (course-or-"any", topic, difficulty).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    pub course: String,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl CandidateKey {
    pub fn new(course: Option<&str>, topic: &str, difficulty: Difficulty) -> Self {
        Self {
            course: course.unwrap_or(ANY_COURSE).to_string(),
            topic: topic.to_string(),
            difficulty,
        }
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.course, self.topic, self.difficulty)
    }
}
