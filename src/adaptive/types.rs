use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MASTERY_SCORE: f64 = 0.5;
pub const DEFAULT_RULE_COOLDOWN_MINS: u64 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Points awarded for a correct answer at this difficulty.
    pub fn points(&self) -> u32 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Diagnostic,
    #[default]
    Formative,
    Summative,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Formative => "formative",
            Self::Summative => "summative",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagnostic" => Some(Self::Diagnostic),
            "formative" => Some(Self::Formative),
            "summative" => Some(Self::Summative),
            _ => None,
        }
    }

    /// Lenient parse used at the request boundary; unknown modes act as formative.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    /// EWMA weight given to the newest outcome.
    pub fn alpha(&self) -> f64 {
        match self {
            Self::Diagnostic => 0.5,
            Self::Summative => 0.35,
            Self::Formative => 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Mcq,
    Short,
    Code,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub topic: String,
    pub score: f64,
    pub streak: u32,
    pub attempts: u32,
    pub time_on_task_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl MasteryRecord {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            score: DEFAULT_MASTERY_SCORE,
            streak: 0,
            attempts: 0,
            time_on_task_sec: 0.0,
            last_attempt_at: None,
        }
    }

    pub fn with_score(topic: impl Into<String>, score: f64) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            ..Self::new(topic)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learner {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mastery: Vec<MasteryRecord>,
    #[serde(default)]
    pub version: u64,
}

impl Learner {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mastery: Vec::new(),
            version: 0,
        }
    }

    pub fn mastery_for(&self, topic: &str) -> Option<&MasteryRecord> {
        self.mastery.iter().find(|m| m.topic == topic)
    }

    /// Lowest-scoring topic; ties keep the earliest declared record.
    pub fn weakest_topic(&self) -> Option<&str> {
        let mut weakest: Option<&MasteryRecord> = None;
        for record in &self.mastery {
            match weakest {
                Some(current) if record.score >= current.score => {}
                _ => weakest = Some(record),
            }
        }
        weakest.map(|m| m.topic.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub course: Option<String>,
    pub text: String,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    /// Bloom's taxonomy level the item targets, e.g. "apply".
    #[serde(default)]
    pub bloom_level: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default = "default_true")]
    pub randomize_options: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Item as shown to a learner before answering: no answer key, no explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedItem {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub options: Vec<String>,
    pub course: Option<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub hints: Vec<String>,
}

impl From<Item> for PresentedItem {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            text: item.text,
            item_type: item.item_type,
            options: item.options,
            course: item.course,
            topic: item.topic,
            difficulty: item.difficulty,
            hints: item.hints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub if_expr: String,
    pub next_difficulty: Difficulty,
}

impl Condition {
    pub fn new(if_expr: impl Into<String>, next_difficulty: Difficulty) -> Self {
        Self {
            if_expr: if_expr.into(),
            next_difficulty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub topic: String,
    #[serde(default = "default_rule_cooldown")]
    pub cooldown_mins: u64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Browsable course with its declared subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default = "default_true", skip_serializing)]
    pub is_active: bool,
}

impl Course {
    pub fn new(name: impl Into<String>, code: impl Into<String>, subjects: &[&str]) -> Self {
        Self {
            name: name.into(),
            code: Some(code.into()),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub id: String,
    pub learner_id: String,
    pub item_id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub mode: Mode,
    pub is_correct: bool,
    #[serde(default)]
    pub selected_option: Option<String>,
    pub used_hint: bool,
    pub penalty: f64,
    pub points: u32,
    pub time_taken_sec: f64,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_rule_cooldown() -> u64 {
    DEFAULT_RULE_COOLDOWN_MINS
}
