use std::collections::HashSet;

use chrono::Utc;

use elera_backend::adaptive::pipeline::{FallbackTier, SelectionError, SelectionRequest};
use elera_backend::adaptive::rules::NO_PRIOR_ATTEMPT_MINUTES;
use elera_backend::adaptive::types::{Difficulty, Mode};
use elera_backend::store::memory::MemoryStores;

mod common;

use common::{learner, mcq, minutes_ago, pipeline, record_attempt, seed, three_band_rule};

fn request(course: Option<&str>, topic: Option<&str>) -> SelectionRequest {
    SelectionRequest {
        course: course.map(str::to_string),
        topic: topic.map(str::to_string),
        mode: Mode::Formative,
    }
}

// ============================================================================
// Topic resolution
// ============================================================================

#[tokio::test]
async fn test_weakest_topic_is_chosen_when_none_requested() {
    let memory = MemoryStores::new();
    seed(
        &memory,
        vec![
            mcq("a1", "C", "A", Difficulty::Medium),
            mcq("b1", "C", "B", Difficulty::Medium),
        ],
        vec![learner("l1", &[("A", 0.8), ("B", 0.3)])],
        vec![],
    )
    .await;
    let (pipeline, _) = pipeline(&memory);
    let l1 = learner("l1", &[("A", 0.8), ("B", 0.3)]);

    let selection = pipeline.select(&l1, &request(None, None), Utc::now()).await.unwrap();

    assert_eq!(selection.effective_topic, "B");
    assert_eq!(selection.item.id, "b1");
    assert_eq!(selection.tier, FallbackTier::Spaced);
}

#[tokio::test]
async fn test_topic_falls_back_to_catalog_then_other_courses() {
    let memory = MemoryStores::new();
    seed(&memory, vec![mcq("s1", "DSA", "Stacks", Difficulty::Easy)], vec![], vec![]).await;
    let (pipeline, _) = pipeline(&memory);
    let fresh = learner("new", &[]);

    let in_course = pipeline.resolve_topic(&fresh, &request(Some("DSA"), None)).await.unwrap();
    assert_eq!(in_course.as_deref(), Some("Stacks"));

    let other_course = pipeline.resolve_topic(&fresh, &request(Some("DBMS"), None)).await.unwrap();
    assert_eq!(other_course.as_deref(), Some("Stacks"));

    let blank = pipeline.resolve_topic(&fresh, &request(None, Some("   "))).await.unwrap();
    assert_eq!(blank.as_deref(), Some("Stacks"));
}

#[tokio::test]
async fn test_no_topic_available_for_empty_catalog_and_fresh_learner() {
    let memory = MemoryStores::new();
    let (pipeline, _) = pipeline(&memory);

    let err = pipeline
        .select(&learner("new", &[]), &request(Some("DBMS"), None), Utc::now())
        .await
        .unwrap_err();

    match err {
        SelectionError::NoTopicAvailable { course } => assert_eq!(course.as_deref(), Some("DBMS")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Rule-driven difficulty and fallback tiers
// ============================================================================

#[tokio::test]
async fn test_rule_decides_difficulty_from_mastery() {
    let memory = MemoryStores::new();
    seed(
        &memory,
        vec![
            mcq("e1", "C", "B", Difficulty::Easy),
            mcq("m1", "C", "B", Difficulty::Medium),
            mcq("h1", "C", "B", Difficulty::Hard),
        ],
        vec![],
        vec![three_band_rule("B", 60)],
    )
    .await;
    let (pipeline, _) = pipeline(&memory);

    let low = pipeline
        .select(&learner("l1", &[("B", 0.3)]), &request(None, None), Utc::now())
        .await
        .unwrap();
    assert_eq!(low.requested_difficulty, Difficulty::Easy);
    assert_eq!(low.item.id, "e1");

    let high = pipeline
        .select(&learner("l2", &[("B", 0.9)]), &request(None, None), Utc::now())
        .await
        .unwrap();
    assert_eq!(high.requested_difficulty, Difficulty::Hard);
    assert_eq!(high.item.id, "h1");
}

#[tokio::test]
async fn test_recently_answered_items_are_spaced_out() {
    let memory = MemoryStores::new();
    let seen = mcq("seen", "C", "B", Difficulty::Easy);
    seed(
        &memory,
        vec![seen.clone(), mcq("fresh", "C", "B", Difficulty::Easy)],
        vec![],
        vec![three_band_rule("B", 60)],
    )
    .await;
    let now = Utc::now();
    record_attempt(&memory, "l1", &seen, true, minutes_ago(now, 5)).await;
    let (pipeline, _) = pipeline(&memory);
    let l1 = learner("l1", &[("B", 0.3)]);

    for _ in 0..20 {
        let selection = pipeline.select(&l1, &request(None, None), now).await.unwrap();
        assert_eq!(selection.item.id, "fresh");
        assert_eq!(selection.tier, FallbackTier::Spaced);
    }
}

#[tokio::test]
async fn test_attempts_outside_cooldown_do_not_space() {
    let memory = MemoryStores::new();
    let only = mcq("only", "C", "B", Difficulty::Easy);
    seed(&memory, vec![only.clone()], vec![], vec![three_band_rule("B", 60)]).await;
    let now = Utc::now();
    record_attempt(&memory, "l1", &only, true, minutes_ago(now, 61)).await;
    let (pipeline, _) = pipeline(&memory);

    let selection = pipeline
        .select(&learner("l1", &[("B", 0.3)]), &request(None, None), now)
        .await
        .unwrap();
    assert_eq!(selection.tier, FallbackTier::Spaced);
}

#[tokio::test]
async fn test_spacing_that_empties_the_pool_falls_back_to_unspaced() {
    let memory = MemoryStores::new();
    let only = mcq("only", "C", "B", Difficulty::Easy);
    seed(&memory, vec![only.clone()], vec![], vec![three_band_rule("B", 60)]).await;
    let now = Utc::now();
    record_attempt(&memory, "l1", &only, true, minutes_ago(now, 1)).await;
    let (pipeline, _) = pipeline(&memory);

    let selection = pipeline
        .select(&learner("l1", &[("B", 0.3)]), &request(None, None), now)
        .await
        .unwrap();

    assert_eq!(selection.item.id, "only");
    assert_eq!(selection.tier, FallbackTier::Unspaced);
    assert_eq!(selection.effective_difficulty, Difficulty::Easy);
}

#[tokio::test]
async fn test_missing_difficulty_falls_back_to_any_difficulty_in_topic() {
    let memory = MemoryStores::new();
    seed(
        &memory,
        vec![
            mcq("easy", "C", "B", Difficulty::Easy),
            mcq("other-topic", "C", "Z", Difficulty::Hard),
        ],
        vec![],
        vec![three_band_rule("B", 60)],
    )
    .await;
    let (pipeline, _) = pipeline(&memory);

    let selection = pipeline
        .select(&learner("l1", &[("B", 0.9)]), &request(None, None), Utc::now())
        .await
        .unwrap();

    assert_eq!(selection.tier, FallbackTier::AnyDifficulty);
    assert_eq!(selection.requested_difficulty, Difficulty::Hard);
    assert_eq!(selection.effective_difficulty, Difficulty::Easy);
    assert_eq!(selection.effective_topic, "B");
    assert_eq!(selection.item.id, "easy");
}

#[tokio::test]
async fn test_unknown_topic_falls_back_to_global_pool() {
    let memory = MemoryStores::new();
    seed(&memory, vec![mcq("arr", "DSA", "Arrays", Difficulty::Easy)], vec![], vec![]).await;
    let (pipeline, _) = pipeline(&memory);

    let selection = pipeline
        .select(&learner("l1", &[]), &request(Some("DBMS"), Some("Graphs")), Utc::now())
        .await
        .unwrap();

    assert_eq!(selection.tier, FallbackTier::Global);
    assert_eq!(selection.effective_topic, "Arrays");
    assert_eq!(selection.effective_difficulty, Difficulty::Easy);
    assert_eq!(selection.requested_difficulty, Difficulty::Medium);
    assert_eq!(selection.course.as_deref(), Some("DSA"));
}

#[tokio::test]
async fn test_empty_catalog_reports_course_and_topic() {
    let memory = MemoryStores::new();
    let (pipeline, _) = pipeline(&memory);

    let err = pipeline
        .select(&learner("l1", &[("Joins", 0.2)]), &request(Some("DBMS"), None), Utc::now())
        .await
        .unwrap_err();

    match err {
        SelectionError::NoContentAvailable { course, topic } => {
            assert_eq!(course.as_deref(), Some("DBMS"));
            assert_eq!(topic.as_deref(), Some("Joins"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Candidate cache
// ============================================================================

#[tokio::test]
async fn test_candidate_lists_are_cached_and_stale_ids_skipped() {
    let memory = MemoryStores::new();
    seed(
        &memory,
        vec![
            mcq("medium", "C", "A", Difficulty::Medium),
            mcq("easy", "C", "A", Difficulty::Easy),
        ],
        vec![],
        vec![],
    )
    .await;
    let (pipeline, cache) = pipeline(&memory);
    let l1 = learner("l1", &[("A", 0.5)]);

    let first = pipeline.select(&l1, &request(None, None), Utc::now()).await.unwrap();
    assert_eq!(first.item.id, "medium");
    assert_eq!(cache.len(), 1);

    // The cached list still names the item after it is retired.
    memory.items.set_active("medium", false);
    let second = pipeline.select(&l1, &request(None, None), Utc::now()).await.unwrap();

    assert_eq!(second.item.id, "easy");
    assert_eq!(second.tier, FallbackTier::AnyDifficulty);
    assert!(cache.is_empty());
}

// ============================================================================
// Presentation
// ============================================================================

#[tokio::test]
async fn test_options_are_shuffled_without_losing_any() {
    let memory = MemoryStores::new();
    let item = mcq("q", "C", "A", Difficulty::Medium);
    let expected: HashSet<String> = item.options.iter().cloned().collect();
    seed(&memory, vec![item], vec![], vec![]).await;
    let (pipeline, _) = pipeline(&memory);
    let l1 = learner("l1", &[("A", 0.5)]);

    let mut orders = HashSet::new();
    for _ in 0..40 {
        let selection = pipeline.select(&l1, &request(None, None), Utc::now()).await.unwrap();
        let seen: HashSet<String> = selection.item.options.iter().cloned().collect();
        assert_eq!(seen, expected);
        assert_eq!(selection.item.options.len(), 4);
        orders.insert(selection.item.options);
    }
    assert!(orders.len() > 1, "40 draws produced a single option order");
}

#[tokio::test]
async fn test_option_order_is_kept_when_randomization_is_off() {
    let memory = MemoryStores::new();
    let mut item = mcq("q", "C", "A", Difficulty::Medium);
    item.randomize_options = false;
    let original = item.options.clone();
    seed(&memory, vec![item], vec![], vec![]).await;
    let (pipeline, _) = pipeline(&memory);
    let l1 = learner("l1", &[("A", 0.5)]);

    for _ in 0..10 {
        let selection = pipeline.select(&l1, &request(None, None), Utc::now()).await.unwrap();
        assert_eq!(selection.item.options, original);
    }
}

#[tokio::test]
async fn test_presented_item_hides_answer_key() {
    let memory = MemoryStores::new();
    seed(&memory, vec![mcq("q", "C", "A", Difficulty::Medium)], vec![], vec![]).await;
    let (pipeline, _) = pipeline(&memory);

    let selection = pipeline
        .select(&learner("l1", &[("A", 0.5)]), &request(None, None), Utc::now())
        .await
        .unwrap();
    let json = serde_json::to_value(&selection).unwrap();
    let item = json.get("item").and_then(|v| v.as_object()).unwrap();

    assert!(!item.contains_key("correctAnswer"));
    assert!(!item.contains_key("explanation"));
    assert_eq!(json["effectiveTopic"], "A");
    assert_eq!(json["tier"], "spaced");
}

// ============================================================================
// Rule context
// ============================================================================

#[tokio::test]
async fn test_context_reflects_latest_topic_attempt() {
    let memory = MemoryStores::new();
    let item = mcq("q", "C", "A", Difficulty::Medium);
    seed(&memory, vec![item.clone()], vec![], vec![]).await;
    let now = Utc::now();
    record_attempt(&memory, "l1", &item, true, minutes_ago(now, 30)).await;
    record_attempt(&memory, "l1", &item, false, minutes_ago(now, 10)).await;
    let (pipeline, _) = pipeline(&memory);
    let mut l1 = learner("l1", &[("A", 0.42)]);
    l1.mastery[0].streak = 0;
    l1.mastery[0].attempts = 2;

    let ctx = pipeline.build_context(&l1, "A", Mode::Summative, now).await.unwrap();

    assert_eq!(ctx.mastery, 0.42);
    assert_eq!(ctx.attempts, 2);
    assert!(ctx.last_wrong);
    assert!(!ctx.last_correct);
    assert!((ctx.minutes_since_topic_attempt - 10.0).abs() < 1e-6);
    assert_eq!(ctx.mode, Mode::Summative);
}

#[tokio::test]
async fn test_context_defaults_for_untouched_topic() {
    let memory = MemoryStores::new();
    let (pipeline, _) = pipeline(&memory);

    let ctx = pipeline
        .build_context(&learner("l1", &[]), "A", Mode::Formative, Utc::now())
        .await
        .unwrap();

    assert_eq!(ctx.mastery, 0.5);
    assert_eq!(ctx.streak, 0);
    assert_eq!(ctx.minutes_since_topic_attempt, NO_PRIOR_ATTEMPT_MINUTES);
    assert!(!ctx.last_correct && !ctx.last_wrong);
}
