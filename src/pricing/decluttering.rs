//! Decluttering (Entrümpelung) price calculator.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::settings::keys::*;
use crate::settings::{ConfigurationStore, SettingsError};

use super::models::{CalculatorFailure, Metadata, PriceLine, PriceResult, ServiceKey, ValidationError};
use super::rules::{apply_rules, SurchargeRule};
use super::services::{load_rules, parse_details, settings_failure, text_field, validate_structure, ServiceCalculator};

/// Decluttering detail bag as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclutterDetails {
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default, alias = "object_type")]
    pub object_type: Option<Value>,
}

/// Volume tier derived from the size token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VolumeTier {
    Low = 1,
    Medium = 2,
    High = 3,
    Extreme = 4,
}

impl VolumeTier {
    pub fn from_size(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "small" => Some(VolumeTier::Low),
            "medium" => Some(VolumeTier::Medium),
            "large" => Some(VolumeTier::High),
            "very-large" | "very_large" => Some(VolumeTier::Extreme),
            _ => None,
        }
    }

    pub fn factor(&self) -> Decimal {
        Decimal::from(*self as u8)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeTier::Low => "low",
            VolumeTier::Medium => "medium",
            VolumeTier::High => "high",
            VolumeTier::Extreme => "extreme",
        }
    }
}

/// Decluttering rates read from settings
#[derive(Debug, Clone)]
pub struct DeclutterRates {
    pub base_price: Decimal,
    pub price_per_volume: Decimal,
    pub house_surcharge: Decimal,
    pub basement_surcharge: Decimal,
    pub rules: Vec<SurchargeRule>,
}

impl Default for DeclutterRates {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_DECLUTTER_BASE_PRICE,
            price_per_volume: DEFAULT_DECLUTTER_PRICE_PER_VOLUME,
            house_surcharge: DEFAULT_DECLUTTER_HOUSE_SURCHARGE,
            basement_surcharge: DEFAULT_DECLUTTER_BASEMENT_SURCHARGE,
            rules: Vec::new(),
        }
    }
}

impl DeclutterRates {
    pub async fn load(store: &ConfigurationStore) -> Result<Self, SettingsError> {
        Ok(Self {
            base_price: store
                .try_get_value(DECLUTTER_BASE_PRICE, DEFAULT_DECLUTTER_BASE_PRICE)
                .await?,
            price_per_volume: store
                .try_get_value(DECLUTTER_PRICE_PER_VOLUME, DEFAULT_DECLUTTER_PRICE_PER_VOLUME)
                .await?,
            house_surcharge: store
                .try_get_value(DECLUTTER_HOUSE_SURCHARGE, DEFAULT_DECLUTTER_HOUSE_SURCHARGE)
                .await?,
            basement_surcharge: store
                .try_get_value(DECLUTTER_BASEMENT_SURCHARGE, DEFAULT_DECLUTTER_BASEMENT_SURCHARGE)
                .await?,
            rules: load_rules(store, ServiceKey::Entruempelung).await?,
        })
    }

    /// Surcharges implied by the object type. One object type per request
    /// gives at most one line today, but the lines add up if a type ever
    /// implies several.
    fn object_type_surcharges(&self, object_type: &str) -> Vec<PriceLine> {
        let mut lines = Vec::new();
        if object_type == "house" {
            lines.push(PriceLine::surcharge("House clearance surcharge", self.house_surcharge));
        }
        if object_type == "basement" {
            lines.push(PriceLine::surcharge("Basement surcharge", self.basement_surcharge));
        }
        lines
    }
}

/// Price a decluttering job
pub fn price_decluttering(details: &DeclutterDetails, raw: &Value, rates: &DeclutterRates) -> PriceResult {
    let tier = text_field(details.size.as_ref())
        .and_then(|s| VolumeTier::from_size(&s))
        .unwrap_or(VolumeTier::Medium);
    let object_type = text_field(details.object_type.as_ref())
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_else(|| "apartment".to_string());

    let mut metadata = Metadata::new();
    metadata.insert("volume_tier".to_string(), tier.as_str().into());
    metadata.insert("object_type".to_string(), object_type.clone().into());

    let mut lines = vec![
        PriceLine::base("Base price", rates.base_price),
        PriceLine::base(
            format!(
                "Volume ({} × {})",
                tier.factor(),
                rates.price_per_volume.round_dp(2)
            ),
            tier.factor() * rates.price_per_volume,
        ),
    ];
    lines.extend(rates.object_type_surcharges(&object_type));
    lines.extend(apply_rules(&rates.rules, raw));

    PriceResult::from_lines(ServiceKey::Entruempelung.display_name(), lines, metadata)
}

/// Decluttering calculator backed by settings
pub struct DeclutterCalculator {
    store: Arc<ConfigurationStore>,
}

impl DeclutterCalculator {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ServiceCalculator for DeclutterCalculator {
    fn service(&self) -> ServiceKey {
        ServiceKey::Entruempelung
    }

    async fn calculate(&self, details: &Value) -> Result<PriceResult, CalculatorFailure> {
        let parsed: DeclutterDetails = parse_details(ServiceKey::Entruempelung, details)?;
        let rates = DeclutterRates::load(&self.store)
            .await
            .map_err(settings_failure(ServiceKey::Entruempelung))?;
        Ok(price_decluttering(&parsed, details, &rates))
    }

    fn validate(&self, details: &Value) -> Vec<ValidationError> {
        let parsed: DeclutterDetails =
            match validate_structure(ServiceKey::Entruempelung, "declutterDetails", details) {
                Ok(parsed) => parsed,
                Err(errors) => return errors,
            };

        let mut errors = Vec::new();
        if let Some(size) = text_field(parsed.size.as_ref()) {
            if VolumeTier::from_size(&size).is_none() {
                errors.push(ValidationError::new(
                    "declutterDetails.size",
                    "must be one of small, medium, large, very-large",
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::store::testing::store_with;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn price(details: Value) -> PriceResult {
        let parsed: DeclutterDetails = parse_details(ServiceKey::Entruempelung, &details).unwrap();
        price_decluttering(&parsed, &details, &DeclutterRates::default())
    }

    #[test]
    fn test_volume_tiers() {
        assert_eq!(VolumeTier::from_size("small"), Some(VolumeTier::Low));
        assert_eq!(VolumeTier::from_size("Very-Large"), Some(VolumeTier::Extreme));
        assert_eq!(VolumeTier::from_size("gigantic"), None);
        assert_eq!(VolumeTier::High.factor(), dec!(3));
    }

    #[test]
    fn test_total_grows_with_size() {
        for object_type in ["apartment", "house", "basement"] {
            let small = price(json!({ "size": "small", "objectType": object_type })).total;
            let medium = price(json!({ "size": "medium", "objectType": object_type })).total;
            let large = price(json!({ "size": "large", "objectType": object_type })).total;
            assert!(large > medium && medium > small, "object_type={}", object_type);
        }
    }

    #[test]
    fn test_unknown_size_defaults_to_medium() {
        // 100 + 2 × 80
        assert_eq!(price(json!({ "size": "gigantic" })).total, dec!(260));
        assert_eq!(price(json!({})).total, dec!(260));
    }

    #[test]
    fn test_object_type_surcharges() {
        assert_eq!(price(json!({ "size": "small", "objectType": "house" })).total, dec!(330));
        assert_eq!(price(json!({ "size": "small", "object_type": "Basement" })).total, dec!(230));
        assert_eq!(price(json!({ "size": "small", "objectType": "garage" })).total, dec!(180));
    }

    #[tokio::test]
    async fn test_calculator_prices_with_default_settings() {
        let result = DeclutterCalculator::new(Arc::new(store_with(&[])))
            .calculate(&json!({ "size": "very-large", "objectType": "house" }))
            .await
            .unwrap();
        // 100 + 4 × 80 + 150
        assert_eq!(result.total, dec!(570));
        assert_eq!(result.metadata["volume_tier"], "extreme");
    }

    #[test]
    fn test_validate_flags_unknown_size() {
        let calculator = DeclutterCalculator::new(Arc::new(store_with(&[])));
        assert_eq!(calculator.validate(&json!({ "size": "gigantic" })).len(), 1);
        assert!(calculator.validate(&json!({ "size": "large" })).is_empty());
    }
}
