pub mod mastery;
pub mod pipeline;
pub mod rules;
pub mod spacing;
pub mod types;

pub use mastery::AttemptOutcome;
pub use pipeline::{FallbackTier, Selection, SelectionError, SelectionPipeline, SelectionRequest, SelectionSettings};
pub use rules::{RuleContext, NO_PRIOR_ATTEMPT_MINUTES};
pub use spacing::SpacingFilter;
pub use types::{Difficulty, Item, ItemType, Learner, MasteryRecord, Mode, PresentedItem, ResponseEvent, Rule};
