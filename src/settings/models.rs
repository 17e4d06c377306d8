//! Settings model.
//!
//! Values are stored as text and cast according to their declared type on
//! read. Writes go back through the same cast so a stored value always
//! round-trips.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use super::SettingsError;

/// Declared type of a stored setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Integer,
    Decimal,
    Boolean,
    Json,
    Array,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Integer => "integer",
            SettingType::Decimal => "decimal",
            SettingType::Boolean => "boolean",
            SettingType::Json => "json",
            SettingType::Array => "array",
        }
    }
}

impl FromStr for SettingType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(SettingType::String),
            "integer" | "int" => Ok(SettingType::Integer),
            "decimal" | "float" => Ok(SettingType::Decimal),
            "boolean" | "bool" => Ok(SettingType::Boolean),
            "json" => Ok(SettingType::Json),
            "array" => Ok(SettingType::Array),
            other => Err(SettingsError::UnknownType(other.to_string())),
        }
    }
}

/// A setting value after casting by its declared type
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Json(serde_json::Value),
}

impl SettingValue {
    /// Cast raw stored text according to `ty`.
    pub fn cast(raw: &str, ty: SettingType) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            value: raw.to_string(),
            ty: ty.as_str(),
        };

        match ty {
            SettingType::String => Ok(SettingValue::String(raw.to_string())),
            SettingType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(SettingValue::Integer)
                .map_err(|_| invalid()),
            SettingType::Decimal => Decimal::from_str(raw.trim())
                .map(SettingValue::Decimal)
                .map_err(|_| invalid()),
            SettingType::Boolean => parse_bool(raw).map(SettingValue::Boolean).ok_or_else(invalid),
            SettingType::Json => serde_json::from_str(raw)
                .map(SettingValue::Json)
                .map_err(|_| invalid()),
            SettingType::Array => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value @ serde_json::Value::Array(_)) => Ok(SettingValue::Json(value)),
                _ => Err(invalid()),
            },
        }
    }

    /// Text representation written back to storage
    pub fn to_stored(&self) -> String {
        match self {
            SettingValue::String(s) => s.clone(),
            SettingValue::Integer(i) => i.to_string(),
            SettingValue::Decimal(d) => d.normalize().to_string(),
            SettingValue::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            SettingValue::Json(v) => v.to_string(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// A typed configuration entry, unique by `(group, key)`
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub group: String,
    pub key: String,
    pub value: SettingValue,
    pub ty: SettingType,
    pub is_public: bool,
}

impl Setting {
    /// Build a setting from a full dotted key such as `pricing.umzug.base_price`.
    pub fn new(full_key: &str, value: SettingValue, ty: SettingType) -> Self {
        let (group, key) = split_key(full_key);
        Self {
            group: group.to_string(),
            key: key.to_string(),
            value,
            ty,
            is_public: false,
        }
    }

    pub fn full_key(&self) -> String {
        format!("{}.{}", self.group, self.key)
    }
}

/// Split a full key at its first dot into `(group, key)`.
///
/// A key without a dot lands in the `general` group.
pub fn split_key(full_key: &str) -> (&str, &str) {
    match full_key.split_once('.') {
        Some((group, key)) => (group, key),
        None => ("general", full_key),
    }
}

/// Row from the `settings` table
#[derive(Debug, Clone, FromRow)]
pub struct SettingRow {
    pub setting_group: String,
    pub setting_key: String,
    pub value: String,
    pub value_type: String,
    pub is_public: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<SettingRow> for Setting {
    type Error = SettingsError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        let ty: SettingType = row.value_type.parse()?;
        let value = SettingValue::cast(&row.value, ty)?;
        Ok(Setting {
            group: row.setting_group,
            key: row.setting_key,
            value,
            ty,
            is_public: row.is_public,
        })
    }
}

/// Conversion from a cast setting value into a caller's type.
///
/// Returns `None` when the stored value cannot represent `Self`; callers
/// then fall back to their default.
pub trait FromSettingValue: Sized {
    fn from_setting_value(value: &SettingValue) -> Option<Self>;
}

impl FromSettingValue for Decimal {
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Decimal(d) => Some(*d),
            SettingValue::Integer(i) => Some(Decimal::from(*i)),
            SettingValue::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

impl FromSettingValue for i64 {
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Integer(i) => Some(*i),
            SettingValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromSettingValue for bool {
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Boolean(b) => Some(*b),
            SettingValue::Integer(i) => Some(*i != 0),
            SettingValue::String(s) => parse_bool(s),
            _ => None,
        }
    }
}

impl FromSettingValue for String {
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::String(s) => Some(s.clone()),
            other => Some(other.to_stored()),
        }
    }
}

impl FromSettingValue for serde_json::Value {
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Json(v) => Some(v.clone()),
            SettingValue::String(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cast_by_declared_type() {
        assert_eq!(
            SettingValue::cast("150.50", SettingType::Decimal).unwrap(),
            SettingValue::Decimal(dec!(150.50))
        );
        assert_eq!(
            SettingValue::cast(" 42 ", SettingType::Integer).unwrap(),
            SettingValue::Integer(42)
        );
        assert_eq!(
            SettingValue::cast("yes", SettingType::Boolean).unwrap(),
            SettingValue::Boolean(true)
        );
        assert_eq!(
            SettingValue::cast("[1,2]", SettingType::Array).unwrap(),
            SettingValue::Json(serde_json::json!([1, 2]))
        );
    }

    #[test]
    fn test_cast_rejects_mismatched_text() {
        assert!(SettingValue::cast("abc", SettingType::Decimal).is_err());
        assert!(SettingValue::cast("maybe", SettingType::Boolean).is_err());
        assert!(SettingValue::cast("{\"a\":1}", SettingType::Array).is_err());
    }

    #[test]
    fn test_stored_text_round_trips() {
        let value = SettingValue::Decimal(dec!(0.10));
        let stored = value.to_stored();
        assert_eq!(
            SettingValue::cast(&stored, SettingType::Decimal).unwrap(),
            value
        );
        assert_eq!(SettingValue::Boolean(false).to_stored(), "0");
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("pricing.umzug.base_price"), ("pricing", "umzug.base_price"));
        assert_eq!(split_key("general.calculator_enabled"), ("general", "calculator_enabled"));
        assert_eq!(split_key("orphan"), ("general", "orphan"));
    }

    #[test]
    fn test_row_conversion() {
        let row = SettingRow {
            setting_group: "pricing".to_string(),
            setting_key: "umzug.base_price".to_string(),
            value: "150".to_string(),
            value_type: "decimal".to_string(),
            is_public: true,
            updated_at: None,
        };
        let setting = Setting::try_from(row).unwrap();
        assert_eq!(setting.full_key(), "pricing.umzug.base_price");
        assert_eq!(setting.value, SettingValue::Decimal(dec!(150)));
    }

    #[test]
    fn test_typed_reads() {
        assert_eq!(
            Decimal::from_setting_value(&SettingValue::Integer(3)),
            Some(dec!(3))
        );
        assert_eq!(bool::from_setting_value(&SettingValue::Integer(0)), Some(false));
        assert_eq!(bool::from_setting_value(&SettingValue::Decimal(dec!(1))), None);
    }
}
