//! Read-through configuration store.
//!
//! Reads go through a process-wide moka cache keyed by the full setting key.
//! Missing keys are cached as `None` so repeated lookups of unknown keys do
//! not hit storage. A write updates storage first and invalidates the cached
//! entry before returning.
//!
//! Cache fills are guarded by a write epoch: a reader snapshots the epoch
//! before going to storage and only caches what it read if no write was
//! acknowledged in between. The epoch check and the insert happen under a
//! shared lock; writers bump the epoch and invalidate under the exclusive
//! lock, so a fill either lands before the invalidation or is dropped.

use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::RwLock as AsyncRwLock;
use tracing::{debug, warn};

use super::models::{split_key, FromSettingValue, Setting, SettingType, SettingValue};
use super::SettingsError;

/// Persistent storage for settings
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn find(&self, group: &str, key: &str) -> Result<Option<Setting>, SettingsError>;

    async fn upsert(&self, setting: &Setting) -> Result<(), SettingsError>;

    async fn list_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError>;
}

/// Cache handle shared by every store instance in the process
pub type SettingsCache = Cache<String, Arc<Option<Setting>>>;

/// Typed, cached access to configuration settings
#[derive(Clone)]
pub struct ConfigurationStore {
    repository: Arc<dyn SettingsRepository>,
    cache: SettingsCache,
    /// Number of acknowledged writes
    write_epoch: Arc<AsyncRwLock<u64>>,
}

impl ConfigurationStore {
    pub fn new(repository: Arc<dyn SettingsRepository>, cache: SettingsCache) -> Self {
        Self {
            repository,
            cache,
            write_epoch: Arc::new(AsyncRwLock::new(0)),
        }
    }

    /// Look up a setting by its full dotted key, consulting the cache first.
    pub async fn lookup(&self, full_key: &str) -> Result<Option<Setting>, SettingsError> {
        if let Some(cached) = self.cache.get(full_key).await {
            debug!("Cache HIT for setting: {}", full_key);
            return Ok((*cached).clone());
        }

        debug!("Cache MISS for setting: {}", full_key);
        let epoch = *self.write_epoch.read().await;
        let (group, key) = split_key(full_key);
        let setting = self.repository.find(group, key).await?;

        let current = self.write_epoch.read().await;
        if *current == epoch {
            self.cache
                .insert(full_key.to_string(), Arc::new(setting.clone()))
                .await;
        } else {
            debug!("Setting {} written during read, not caching", full_key);
        }
        Ok(setting)
    }

    /// Read a typed value, returning `default` for unknown keys or values
    /// that do not convert to `T`.
    ///
    /// # Errors
    /// Fails only when the backing repository is unreachable.
    pub async fn try_get_value<T: FromSettingValue>(
        &self,
        full_key: &str,
        default: T,
    ) -> Result<T, SettingsError> {
        let Some(setting) = self.lookup(full_key).await? else {
            return Ok(default);
        };

        match T::from_setting_value(&setting.value) {
            Some(value) => Ok(value),
            None => {
                warn!(
                    "Setting {} has type {} which cannot be read as requested, using default",
                    full_key,
                    setting.ty.as_str()
                );
                Ok(default)
            }
        }
    }

    /// Read a typed value, never failing. Backend errors are logged and the
    /// default is returned.
    pub async fn get_value<T: FromSettingValue>(&self, full_key: &str, default: T) -> T {
        match self.lookup(full_key).await {
            Ok(Some(setting)) => T::from_setting_value(&setting.value).unwrap_or(default),
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read setting {}: {}", full_key, e);
                default
            }
        }
    }

    /// Write a setting, then drop its cache entry.
    ///
    /// The value is cast through its declared type before storage so that an
    /// unreadable value is rejected up front.
    pub async fn set_value(
        &self,
        full_key: &str,
        value: SettingValue,
        ty: SettingType,
    ) -> Result<(), SettingsError> {
        let value = SettingValue::cast(&value.to_stored(), ty)?;

        let (group, key) = split_key(full_key);
        let is_public = match self.repository.find(group, key).await? {
            Some(existing) => existing.is_public,
            None => false,
        };

        let mut setting = Setting::new(full_key, value, ty);
        setting.is_public = is_public;

        self.repository.upsert(&setting).await?;

        let mut epoch = self.write_epoch.write().await;
        *epoch += 1;
        self.cache.invalidate(full_key).await;
        debug!("Setting {} updated, cache entry invalidated", full_key);
        Ok(())
    }

    /// Load every setting of `group` into the cache.
    ///
    /// Returns the number of settings cached, which is zero when a write
    /// raced the load.
    pub async fn warm_group(&self, group: &str) -> Result<usize, SettingsError> {
        let epoch = *self.write_epoch.read().await;
        let settings = self.repository.list_group(group).await?;

        let current = self.write_epoch.read().await;
        if *current != epoch {
            debug!("Settings written while warming group {}, skipping", group);
            return Ok(0);
        }

        let count = settings.len();
        for setting in settings {
            self.cache
                .insert(setting.full_key(), Arc::new(Some(setting)))
                .await;
        }
        Ok(count)
    }
}

/// In-memory settings repository for tests and local development
#[derive(Default)]
pub struct InMemorySettingsRepository {
    entries: RwLock<HashMap<(String, String), Setting>>,
    reads: AtomicUsize,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with `settings`
    pub fn with_settings(settings: impl IntoIterator<Item = Setting>) -> Self {
        let repo = Self::new();
        {
            let mut entries = repo.entries.write().unwrap_or_else(|e| e.into_inner());
            for setting in settings {
                entries.insert((setting.group.clone(), setting.key.clone()), setting);
            }
        }
        repo
    }

    /// Number of `find` calls that reached this repository
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn find(&self, group: &str, key: &str) -> Result<Option<Setting>, SettingsError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&(group.to_string(), key.to_string())).cloned())
    }

    async fn upsert(&self, setting: &Setting) -> Result<(), SettingsError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert((setting.group.clone(), setting.key.clone()), setting.clone());
        Ok(())
    }

    async fn list_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut settings: Vec<Setting> = entries
            .values()
            .filter(|s| s.group == group)
            .cloned()
            .collect();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(settings)
    }
}
