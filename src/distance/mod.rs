//! Driving distance lookup between two postal codes.
//!
//! The pricing engine only consumes distances; geocoding and routing live
//! behind the [`DistanceLookup`] trait. Lookups may fail or hang, so callers
//! go through [`lookup_with_timeout`], which turns both into an unsuccessful
//! [`DistanceResult`] instead of an error.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::AppCache;

/// Outcome of a distance lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DistanceResult {
    pub fn found(distance_km: f64, duration_minutes: Option<f64>) -> Self {
        Self {
            success: true,
            distance_km: Some(distance_km),
            duration_minutes,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            distance_km: None,
            duration_minutes: None,
            error: Some(error.into()),
        }
    }

    /// Distance in km when the lookup succeeded with a usable value
    pub fn usable_km(&self) -> Option<f64> {
        match (self.success, self.distance_km) {
            (true, Some(km)) if km.is_finite() && km >= 0.0 => Some(km),
            _ => None,
        }
    }
}

/// Driving distance between two postal codes
#[async_trait]
pub trait DistanceLookup: Send + Sync {
    async fn calculate_distance(&self, from_postal_code: &str, to_postal_code: &str)
        -> DistanceResult;
}

/// Run a lookup bounded by `timeout`.
///
/// A timeout is reported as an unsuccessful result, never as an error.
pub async fn lookup_with_timeout(
    lookup: &dyn DistanceLookup,
    from_postal_code: &str,
    to_postal_code: &str,
    timeout: Duration,
) -> DistanceResult {
    match tokio::time::timeout(timeout, lookup.calculate_distance(from_postal_code, to_postal_code))
        .await
    {
        Ok(result) => {
            if !result.success {
                warn!(
                    "Distance lookup {} -> {} failed: {}",
                    from_postal_code,
                    to_postal_code,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            result
        }
        Err(_) => {
            warn!(
                "Distance lookup {} -> {} timed out after {:?}",
                from_postal_code, to_postal_code, timeout
            );
            DistanceResult::failed("timeout")
        }
    }
}

/// Lookup used when no routing backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDistanceLookup;

#[async_trait]
impl DistanceLookup for NoDistanceLookup {
    async fn calculate_distance(&self, _from: &str, _to: &str) -> DistanceResult {
        DistanceResult::failed("distance lookup not configured")
    }
}

/// Fixed distance table, symmetric in its two postal codes
#[derive(Debug, Default, Clone)]
pub struct FixedDistanceTable {
    distances: HashMap<(String, String), f64>,
}

impl FixedDistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, from: &str, to: &str, km: f64) -> Self {
        self.distances.insert(AppCache::distance_key(from, to), km);
        self
    }
}

#[async_trait]
impl DistanceLookup for FixedDistanceTable {
    async fn calculate_distance(&self, from: &str, to: &str) -> DistanceResult {
        let forward = AppCache::distance_key(from, to);
        let backward = AppCache::distance_key(to, from);
        match self
            .distances
            .get(&forward)
            .or_else(|| self.distances.get(&backward))
        {
            Some(km) => DistanceResult::found(*km, None),
            None => DistanceResult::failed(format!("no route between {} and {}", from, to)),
        }
    }
}

/// Caches successful lookups of an inner [`DistanceLookup`]
pub struct CachedDistanceLookup {
    inner: Arc<dyn DistanceLookup>,
    cache: AppCache,
}

impl CachedDistanceLookup {
    pub fn new(inner: Arc<dyn DistanceLookup>, cache: AppCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl DistanceLookup for CachedDistanceLookup {
    async fn calculate_distance(&self, from: &str, to: &str) -> DistanceResult {
        let key = AppCache::distance_key(from, to);
        if let Some(cached) = self.cache.distances.get(&key).await {
            debug!("Cache HIT for distance: {} -> {}", from, to);
            return cached;
        }

        let result = self.inner.calculate_distance(from, to).await;
        if result.usable_km().is_some() {
            self.cache.distances.insert(key, result.clone()).await;
        }
        result
    }
}
