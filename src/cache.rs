//! In-memory caching using moka
//!
//! Provides process-wide caches for configuration settings and driving
//! distances. Settings change rarely and are invalidated explicitly on
//! write; distances between two postal codes effectively never change.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::distance::DistanceResult;
use crate::settings::store::SettingsCache;
use crate::settings::ConfigurationStore;

/// Default settings TTL (1 hour)
pub const DEFAULT_SETTINGS_TTL: Duration = Duration::from_secs(60 * 60);

/// Default distance TTL (24 hours)
pub const DEFAULT_DISTANCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Setting groups preloaded by the cache warmer
const WARM_GROUPS: [&str; 2] = ["pricing", "general"];

/// Application cache holding settings and distance lookups
#[derive(Clone)]
pub struct AppCache {
    /// Settings (full key -> setting, `None` for keys known to be absent)
    pub settings: SettingsCache,
    /// Driving distances ((from, to) postal codes -> successful lookup)
    pub distances: Cache<(String, String), DistanceResult>,
}

impl AppCache {
    /// Create a new cache instance with the default TTLs
    pub fn new() -> Self {
        Self::with_ttls(DEFAULT_SETTINGS_TTL, DEFAULT_DISTANCE_TTL)
    }

    /// Create a cache instance with explicit TTLs
    pub fn with_ttls(settings_ttl: Duration, distance_ttl: Duration) -> Self {
        Self {
            // Settings: a few hundred keys at most
            settings: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(settings_ttl)
                .build(),

            // Distances: one entry per postal code pair
            distances: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(distance_ttl)
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            settings_size: self.settings.entry_count(),
            distances_size: self.distances.entry_count(),
        }
    }

    /// Invalidate all caches
    pub fn invalidate_all(&self) {
        self.settings.invalidate_all();
        self.distances.invalidate_all();
        info!("All caches invalidated");
    }

    /// Generate cache key for a distance lookup
    pub fn distance_key(from_postal_code: &str, to_postal_code: &str) -> (String, String) {
        (
            from_postal_code.trim().to_string(),
            to_postal_code.trim().to_string(),
        )
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub settings_size: u64,
    pub distances_size: u64,
}

/// Start background cache warmer
///
/// Warms the settings cache on startup and refreshes it every `every`.
pub async fn start_cache_warmer(store: Arc<ConfigurationStore>, cache: AppCache, every: Duration) {
    let mut interval = interval(every);
    loop {
        // First tick completes immediately, so this also covers start-up
        interval.tick().await;
        warm_cache(&store, &cache).await;
    }
}

/// Warm the settings cache with every group the engine reads
async fn warm_cache(store: &ConfigurationStore, cache: &AppCache) {
    info!("Starting cache warm-up...");

    for group in WARM_GROUPS {
        match store.warm_group(group).await {
            Ok(count) => info!("Warmed {} settings in group {}", count, group),
            Err(e) => warn!("Failed to warm settings group {}: {}", group, e),
        }
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_key_trims_postal_codes() {
        assert_eq!(
            AppCache::distance_key(" 10115", "80331 "),
            ("10115".to_string(), "80331".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_distances() {
        let cache = AppCache::new();
        cache
            .distances
            .insert(
                AppCache::distance_key("10115", "80331"),
                DistanceResult::found(585.0, Some(330.0)),
            )
            .await;
        assert!(cache.distances.get(&AppCache::distance_key("10115", "80331")).await.is_some());

        cache.invalidate_all();
        assert!(cache.distances.get(&AppCache::distance_key("10115", "80331")).await.is_none());
    }
}
