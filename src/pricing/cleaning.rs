//! Cleaning (Putzservice) price calculator.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::settings::keys::*;
use crate::settings::{ConfigurationStore, SettingsError};

use super::models::{CalculatorFailure, Metadata, PriceLine, PriceResult, ServiceKey, ValidationError};
use super::rules::{apply_rules, SurchargeRule};
use super::services::{load_rules, parse_details, settings_failure, text_field, validate_structure, ServiceCalculator};

/// Multiplier used when the size token is missing or unreadable (3 rooms)
pub const DEFAULT_ROOM_MULTIPLIER: Decimal = dec!(2.0);

/// Cleaning detail bag as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningDetails {
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default, alias = "object_type")]
    pub object_type: Option<Value>,
    #[serde(default)]
    pub intensity: Option<Value>,
}

/// How thorough the cleaning is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Normal,
    Deep,
    Construction,
}

impl Intensity {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Intensity::Normal),
            "deep" => Some(Intensity::Deep),
            "construction" => Some(Intensity::Construction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Normal => "normal",
            Intensity::Deep => "deep",
            Intensity::Construction => "construction",
        }
    }
}

/// Room count from a `<n>-room` / `<n>-rooms` token
pub fn parse_room_count(token: &str) -> Option<u32> {
    let token = token.trim().to_ascii_lowercase();
    let count = token
        .strip_suffix("-rooms")
        .or_else(|| token.strip_suffix("-room"))?;
    count.trim().parse::<u32>().ok().filter(|n| *n >= 1)
}

/// `(n - 1) * 0.5 + 1` for `n` rooms; unreadable sizes price as 3 rooms
pub fn room_multiplier(size: Option<&str>) -> Decimal {
    match size.and_then(parse_room_count) {
        Some(n) => Decimal::from(n - 1) * dec!(0.5) + Decimal::ONE,
        None => DEFAULT_ROOM_MULTIPLIER,
    }
}

/// Cleaning rates read from settings
#[derive(Debug, Clone)]
pub struct CleaningRates {
    pub base_price: Decimal,
    pub price_per_room: Decimal,
    pub deep_cleaning_surcharge: Decimal,
    pub construction_cleaning_surcharge: Decimal,
    pub rules: Vec<SurchargeRule>,
}

impl Default for CleaningRates {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_CLEANING_BASE_PRICE,
            price_per_room: DEFAULT_CLEANING_PRICE_PER_ROOM,
            deep_cleaning_surcharge: DEFAULT_CLEANING_DEEP_SURCHARGE,
            construction_cleaning_surcharge: DEFAULT_CLEANING_CONSTRUCTION_SURCHARGE,
            rules: Vec::new(),
        }
    }
}

impl CleaningRates {
    pub async fn load(store: &ConfigurationStore) -> Result<Self, SettingsError> {
        Ok(Self {
            base_price: store
                .try_get_value(CLEANING_BASE_PRICE, DEFAULT_CLEANING_BASE_PRICE)
                .await?,
            price_per_room: store
                .try_get_value(CLEANING_PRICE_PER_ROOM, DEFAULT_CLEANING_PRICE_PER_ROOM)
                .await?,
            deep_cleaning_surcharge: store
                .try_get_value(CLEANING_DEEP_SURCHARGE, DEFAULT_CLEANING_DEEP_SURCHARGE)
                .await?,
            construction_cleaning_surcharge: store
                .try_get_value(
                    CLEANING_CONSTRUCTION_SURCHARGE,
                    DEFAULT_CLEANING_CONSTRUCTION_SURCHARGE,
                )
                .await?,
            rules: load_rules(store, ServiceKey::Putzservice).await?,
        })
    }
}

/// Price a cleaning job
pub fn price_cleaning(details: &CleaningDetails, raw: &Value, rates: &CleaningRates) -> PriceResult {
    let size = text_field(details.size.as_ref());
    let multiplier = room_multiplier(size.as_deref());
    let object_type = text_field(details.object_type.as_ref()).unwrap_or_else(|| "apartment".to_string());
    let intensity = text_field(details.intensity.as_ref())
        .and_then(|t| Intensity::parse(&t))
        .unwrap_or(Intensity::Normal);

    let mut metadata = Metadata::new();
    metadata.insert("room_multiplier".to_string(), multiplier.to_string().into());
    metadata.insert("object_type".to_string(), object_type.into());
    metadata.insert("intensity".to_string(), intensity.as_str().into());

    let mut lines = vec![PriceLine::base("Base price", rates.base_price)];
    lines.push(PriceLine::base(
        format!("Rooms (factor {} × {})", multiplier.normalize(), rates.price_per_room.round_dp(2)),
        multiplier * rates.price_per_room,
    ));

    let intensity_surcharge = match intensity {
        Intensity::Deep => Some(("Deep cleaning surcharge", rates.deep_cleaning_surcharge)),
        Intensity::Construction => Some((
            "Construction cleaning surcharge",
            rates.construction_cleaning_surcharge,
        )),
        Intensity::Normal => None,
    };
    if let Some((label, amount)) = intensity_surcharge {
        lines.push(PriceLine::surcharge(label, amount));
    }

    lines.extend(apply_rules(&rates.rules, raw));

    PriceResult::from_lines(ServiceKey::Putzservice.display_name(), lines, metadata)
}

/// Cleaning calculator backed by settings
pub struct CleaningCalculator {
    store: Arc<ConfigurationStore>,
}

impl CleaningCalculator {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ServiceCalculator for CleaningCalculator {
    fn service(&self) -> ServiceKey {
        ServiceKey::Putzservice
    }

    async fn calculate(&self, details: &Value) -> Result<PriceResult, CalculatorFailure> {
        let parsed: CleaningDetails = parse_details(ServiceKey::Putzservice, details)?;
        let rates = CleaningRates::load(&self.store)
            .await
            .map_err(settings_failure(ServiceKey::Putzservice))?;
        Ok(price_cleaning(&parsed, details, &rates))
    }

    fn validate(&self, details: &Value) -> Vec<ValidationError> {
        let parsed: CleaningDetails =
            match validate_structure(ServiceKey::Putzservice, "cleaningDetails", details) {
                Ok(parsed) => parsed,
                Err(errors) => return errors,
            };

        let mut errors = Vec::new();
        if let Some(size) = text_field(parsed.size.as_ref()) {
            if parse_room_count(&size).is_none() {
                errors.push(ValidationError::new(
                    "cleaningDetails.size",
                    "must look like '2-rooms'",
                ));
            }
        }
        if let Some(intensity) = text_field(parsed.intensity.as_ref()) {
            if Intensity::parse(&intensity).is_none() {
                errors.push(ValidationError::new(
                    "cleaningDetails.intensity",
                    "must be one of normal, deep, construction",
                ));
            }
        }
        errors
    }
}
