//! Database queries for the settings table.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Setting, SettingRow};
use super::store::SettingsRepository;
use super::SettingsError;

/// Settings repository backed by the `settings` table in Postgres
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn find(&self, group: &str, key: &str) -> Result<Option<Setting>, SettingsError> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT setting_group, setting_key, value, value_type, is_public, updated_at
            FROM settings
            WHERE setting_group = $1 AND setting_key = $2
            "#,
        )
        .bind(group)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(setting_from_row))
    }

    async fn upsert(&self, setting: &Setting) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            INSERT INTO settings (setting_group, setting_key, value, value_type, is_public, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (setting_group, setting_key)
            DO UPDATE SET
                value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                is_public = EXCLUDED.is_public,
                updated_at = NOW()
            "#,
        )
        .bind(&setting.group)
        .bind(&setting.key)
        .bind(setting.value.to_stored())
        .bind(setting.ty.as_str())
        .bind(setting.is_public)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError> {
        let rows = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT setting_group, setting_key, value, value_type, is_public, updated_at
            FROM settings
            WHERE setting_group = $1
            ORDER BY setting_key
            "#,
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(setting_from_row).collect())
    }
}

/// Convert a stored row, treating a value that does not cast to its
/// declared type like an absent key so callers get their default.
pub(crate) fn setting_from_row(row: SettingRow) -> Option<Setting> {
    let full_key = format!("{}.{}", row.setting_group, row.setting_key);
    match Setting::try_from(row) {
        Ok(setting) => Some(setting),
        Err(e) => {
            tracing::warn!("Ignoring unreadable setting {}: {}", full_key, e);
            None
        }
    }
}
