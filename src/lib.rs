//! Household services quote engine.
//!
//! Prices moving, cleaning and decluttering jobs from settings-driven
//! formulas and serves the results over a small JSON API.

pub mod cache;
pub mod config;
pub mod distance;
pub mod error;
pub mod pricing;
pub mod settings;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use cache::AppCache;
use pricing::PricingOrchestrator;
use settings::ConfigurationStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigurationStore>,
    pub orchestrator: Arc<PricingOrchestrator>,
    pub cache: AppCache,
}

/// Full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(pricing::router())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "cache": state.cache.stats(),
    }))
}
