use chrono::{DateTime, Utc};

use crate::adaptive::types::{Learner, MasteryRecord, Mode};

pub const HINT_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptOutcome {
    pub is_correct: bool,
    pub used_hint: bool,
    pub time_taken_sec: f64,
    pub mode: Mode,
}

impl AttemptOutcome {
    pub fn penalty(&self) -> f64 {
        if self.used_hint {
            HINT_PENALTY
        } else {
            0.0
        }
    }

    /// Correctness credited to the EWMA after the hint penalty.
    pub fn effective(&self) -> f64 {
        let raw = if self.is_correct { 1.0 } else { 0.0 };
        (raw - self.penalty()).max(0.0)
    }
}

pub fn ewma(old_score: f64, alpha: f64, outcome: f64) -> f64 {
    let updated = (1.0 - alpha) * old_score + alpha * outcome;
    round2(updated).clamp(0.0, 1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn sanitize_seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn apply_outcome(record: &mut MasteryRecord, outcome: &AttemptOutcome, now: DateTime<Utc>) {
    let old_score = if record.score.is_finite() {
        record.score.clamp(0.0, 1.0)
    } else {
        crate::adaptive::types::DEFAULT_MASTERY_SCORE
    };
    record.score = ewma(old_score, outcome.mode.alpha(), outcome.effective());
    record.streak = if outcome.is_correct {
        record.streak.saturating_add(1)
    } else {
        0
    };
    record.attempts = record.attempts.saturating_add(1);
    record.time_on_task_sec += sanitize_seconds(outcome.time_taken_sec);
    record.last_attempt_at = Some(now);
}

/// Applies one outcome to the learner's record for `topic`, creating the record
/// with defaults first if needed. Returns a copy of the updated record.
pub fn update(
    learner: &mut Learner,
    topic: &str,
    outcome: &AttemptOutcome,
    now: DateTime<Utc>,
) -> MasteryRecord {
    let index = match learner.mastery.iter().position(|m| m.topic == topic) {
        Some(index) => index,
        None => {
            learner.mastery.push(MasteryRecord::new(topic));
            learner.mastery.len() - 1
        }
    };
    let record = &mut learner.mastery[index];
    apply_outcome(record, outcome, now);
    record.clone()
}
