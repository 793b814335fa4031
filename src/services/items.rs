use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adaptive::types::{Difficulty, Item, ItemType};
use crate::cache::CandidateCache;
use crate::store::{StoreError, Stores};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("item #{index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Item as authored for import; ids are always assigned on import.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub bloom_level: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub randomize_options: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ItemDraft {
    fn into_item(self, index: usize) -> Result<Item, ImportError> {
        if self.text.trim().is_empty() {
            return Err(ImportError::Invalid {
                index,
                reason: "text is required".to_string(),
            });
        }
        Ok(Item {
            id: uuid::Uuid::new_v4().to_string(),
            course: self.course.filter(|c| !c.trim().is_empty()),
            text: self.text,
            item_type: self.item_type,
            options: self.options,
            correct_answer: self.correct_answer,
            topic: self.topic,
            difficulty: self.difficulty,
            hints: self.hints,
            explanation: self.explanation,
            bloom_level: self.bloom_level,
            skills: self.skills,
            outcomes: self.outcomes,
            source_url: self.source_url,
            randomize_options: self.randomize_options.unwrap_or(true),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogExport {
    pub count: usize,
    pub items: Vec<Item>,
}

pub struct ItemCatalogService {
    stores: Stores,
    cache: Arc<CandidateCache>,
}

impl ItemCatalogService {
    pub fn new(stores: Stores, cache: Arc<CandidateCache>) -> Self {
        Self { stores, cache }
    }

    pub async fn export(&self) -> Result<CatalogExport, StoreError> {
        let items = self.stores.items.all().await?;
        Ok(CatalogExport {
            count: items.len(),
            items,
        })
    }

    /// Validates every draft before inserting any, then drops cached candidate
    /// lists so the new items are eligible on the next request.
    pub async fn import(&self, drafts: Vec<ItemDraft>) -> Result<usize, ImportError> {
        let items = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.into_item(index))
            .collect::<Result<Vec<_>, _>>()?;

        let inserted = self.stores.items.insert_many(items).await?;
        self.cache.clear();
        tracing::info!(inserted, "item catalog imported");
        Ok(inserted)
    }
}
