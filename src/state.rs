use std::sync::Arc;
use std::time::Instant;

use crate::adaptive::pipeline::{SelectionPipeline, SelectionSettings};
use crate::cache::CandidateCache;
use crate::config::Config;
use crate::services::analytics::AnalyticsService;
use crate::services::courses::CourseCatalogService;
use crate::services::items::ItemCatalogService;
use crate::services::quiz::QuizService;
use crate::store::Stores;

/// Process-wide components, built once and shared by every request.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    cache: Arc<CandidateCache>,
    quiz: Arc<QuizService>,
    analytics: Arc<AnalyticsService>,
    catalog: Arc<ItemCatalogService>,
    courses: Arc<CourseCatalogService>,
}

impl AppState {
    pub fn new(stores: Stores, config: &Config) -> Self {
        let cache = Arc::new(CandidateCache::new(
            config.candidate_cache_capacity,
            config.candidate_cache_ttl,
        ));
        let settings = SelectionSettings {
            default_cooldown: config.default_cooldown(),
            candidate_ttl: Some(config.candidate_cache_ttl),
        };
        Self::with_components(stores, cache, settings)
    }

    pub fn with_components(
        stores: Stores,
        cache: Arc<CandidateCache>,
        settings: SelectionSettings,
    ) -> Self {
        let pipeline = Arc::new(SelectionPipeline::new(&stores, Arc::clone(&cache), settings));
        Self {
            started_at: Instant::now(),
            quiz: Arc::new(QuizService::new(stores.clone(), pipeline)),
            analytics: Arc::new(AnalyticsService::new(stores.clone())),
            courses: Arc::new(CourseCatalogService::new(stores.clone())),
            catalog: Arc::new(ItemCatalogService::new(stores, Arc::clone(&cache))),
            cache,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn cache(&self) -> Arc<CandidateCache> {
        Arc::clone(&self.cache)
    }

    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }

    pub fn catalog(&self) -> Arc<ItemCatalogService> {
        Arc::clone(&self.catalog)
    }

    pub fn courses(&self) -> Arc<CourseCatalogService> {
        Arc::clone(&self.courses)
    }
}
