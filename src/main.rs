use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use household_quote::cache::{start_cache_warmer, AppCache};
use household_quote::config::{AppConfig, LogFormat};
use household_quote::distance::{CachedDistanceLookup, NoDistanceLookup};
use household_quote::pricing::PricingOrchestrator;
use household_quote::settings::keys::default_settings;
use household_quote::settings::{
    ConfigurationStore, InMemorySettingsRepository, PgSettingsRepository, SettingsRepository,
};
use household_quote::{app, AppState};

fn init_logger(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("household_quote=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_logger(config.log_format);

    let cache = AppCache::with_ttls(config.settings_cache_ttl, config.distance_cache_ttl);

    let repository: Arc<dyn SettingsRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("failed to connect to the settings database")?;
            info!("Settings backed by Postgres");
            Arc::new(PgSettingsRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using built-in default settings");
            Arc::new(InMemorySettingsRepository::with_settings(default_settings()))
        }
    };

    let store = Arc::new(ConfigurationStore::new(repository, cache.settings.clone()));
    let distance = Arc::new(CachedDistanceLookup::new(Arc::new(NoDistanceLookup), cache.clone()));
    let orchestrator = Arc::new(PricingOrchestrator::with_distance_timeout(
        store.clone(),
        distance,
        config.distance_timeout,
    ));

    tokio::spawn(start_cache_warmer(
        store.clone(),
        cache.clone(),
        config.settings_warm_interval,
    ));

    let state = AppState {
        store,
        orchestrator,
        cache,
    };

    let app = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
