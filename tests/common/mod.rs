#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};

use elera_backend::adaptive::pipeline::{SelectionPipeline, SelectionSettings};
use elera_backend::adaptive::types::{
    Condition, Difficulty, Item, ItemType, Learner, MasteryRecord, Mode, ResponseEvent, Rule,
};
use elera_backend::cache::CandidateCache;
use elera_backend::config::Config;
use elera_backend::state::AppState;
use elera_backend::store::memory::MemoryStores;
use elera_backend::store::{ItemStore, ResponseStore, Stores};

pub async fn create_test_app() -> Router {
    let config = Config {
        seed_demo_data: true,
        ..Config::default()
    };
    elera_backend::create_app(&config).await
}

pub fn app_with_memory(memory: &MemoryStores) -> Router {
    elera_backend::app_with_state(test_state(memory))
}

pub fn test_state(memory: &MemoryStores) -> AppState {
    AppState::with_components(
        Stores::from_memory(memory),
        Arc::new(CandidateCache::default()),
        SelectionSettings::default(),
    )
}

pub fn pipeline(memory: &MemoryStores) -> (SelectionPipeline, Arc<CandidateCache>) {
    let cache = Arc::new(CandidateCache::default());
    let pipeline = SelectionPipeline::new(
        &Stores::from_memory(memory),
        Arc::clone(&cache),
        SelectionSettings::default(),
    );
    (pipeline, cache)
}

pub fn mcq(id: &str, course: &str, topic: &str, difficulty: Difficulty) -> Item {
    Item {
        id: id.to_string(),
        course: Some(course.to_string()),
        text: format!("question {id}"),
        item_type: ItemType::Mcq,
        options: vec!["right".into(), "wrong-1".into(), "wrong-2".into(), "wrong-3".into()],
        correct_answer: Some("right".into()),
        topic: topic.to_string(),
        difficulty,
        hints: vec!["think".into()],
        explanation: Some(format!("because {id}")),
        bloom_level: None,
        skills: Vec::new(),
        outcomes: Vec::new(),
        source_url: None,
        randomize_options: true,
        is_active: true,
    }
}

pub fn learner(id: &str, mastery: &[(&str, f64)]) -> Learner {
    let mut learner = Learner::new(id, format!("learner {id}"));
    learner.mastery = mastery
        .iter()
        .map(|(topic, score)| MasteryRecord::with_score(*topic, *score))
        .collect();
    learner
}

pub fn three_band_rule(topic: &str, cooldown_mins: u64) -> Rule {
    Rule {
        topic: topic.to_string(),
        cooldown_mins,
        conditions: vec![
            Condition::new("mastery < 0.5", Difficulty::Easy),
            Condition::new("mastery >= 0.5 && mastery < 0.8", Difficulty::Medium),
            Condition::new("mastery >= 0.8", Difficulty::Hard),
        ],
        active: true,
    }
}

pub async fn seed(memory: &MemoryStores, items: Vec<Item>, learners: Vec<Learner>, rules: Vec<Rule>) {
    memory.items.insert_many(items).await.unwrap();
    for learner in learners {
        memory.learners.upsert(learner);
    }
    for rule in rules {
        memory.rules.insert(rule);
    }
}

pub async fn record_attempt(
    memory: &MemoryStores,
    learner_id: &str,
    item: &Item,
    is_correct: bool,
    at: DateTime<Utc>,
) {
    memory
        .responses
        .append(ResponseEvent {
            id: format!("evt-{learner_id}-{}-{}", item.id, at.timestamp_millis()),
            learner_id: learner_id.to_string(),
            item_id: item.id.clone(),
            topic: item.topic.clone(),
            difficulty: item.difficulty,
            mode: Mode::Formative,
            is_correct,
            selected_option: None,
            used_hint: false,
            penalty: 0.0,
            points: 0,
            time_taken_sec: 5.0,
            created_at: at,
        })
        .await
        .unwrap();
}

pub fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    now - chrono::Duration::minutes(minutes)
}
