pub mod adaptive;
pub mod cache;
pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;
use crate::store::memory::MemoryStores;
use crate::store::Stores;

/// Builds the application over in-memory stores, seeding the demo catalog when
/// the configuration asks for it.
pub async fn create_app(config: &Config) -> axum::Router {
    let memory = MemoryStores::new();
    if config.seed_demo_data {
        seed::seed_demo_catalog(&memory).await;
    }
    let state = AppState::new(Stores::from_memory(&memory), config);
    app_with_state(state)
}

pub fn app_with_state(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
