//! Setting keys read by the pricing engine and their defaults.
//!
//! Defaults apply whenever a key is missing from storage or its stored
//! value cannot be read as the expected type.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::models::{Setting, SettingType, SettingValue};

pub const MOVING_BASE_PRICE: &str = "pricing.umzug.base_price";
pub const MOVING_PRICE_PER_ROOM: &str = "pricing.umzug.price_per_room";
pub const MOVING_FLOOR_SURCHARGE: &str = "pricing.umzug.floor_surcharge";
pub const MOVING_PRICE_PER_KM: &str = "pricing.umzug.price_per_km";
pub const MOVING_FREE_DISTANCE_KM: &str = "pricing.umzug.free_distance_km";

pub const CLEANING_BASE_PRICE: &str = "pricing.putzservice.base_price";
pub const CLEANING_PRICE_PER_ROOM: &str = "pricing.putzservice.price_per_room";
pub const CLEANING_DEEP_SURCHARGE: &str = "pricing.putzservice.deep_cleaning_surcharge";
pub const CLEANING_CONSTRUCTION_SURCHARGE: &str =
    "pricing.putzservice.construction_cleaning_surcharge";

pub const DECLUTTER_BASE_PRICE: &str = "pricing.entruempelung.base_price";
pub const DECLUTTER_PRICE_PER_VOLUME: &str = "pricing.entruempelung.price_per_volume";
pub const DECLUTTER_HOUSE_SURCHARGE: &str = "pricing.entruempelung.house_surcharge";
pub const DECLUTTER_BASEMENT_SURCHARGE: &str = "pricing.entruempelung.basement_surcharge";

pub const COMBINATION_DISCOUNT_2: &str = "pricing.discounts.combination_2";
pub const COMBINATION_DISCOUNT_3: &str = "pricing.discounts.combination_3";
pub const EXPRESS_SURCHARGE_RATE: &str = "pricing.surcharges.express_rate";
pub const MINIMUM_ORDER_VALUE: &str = "pricing.general.minimum_order_value";

pub const CALCULATOR_ENABLED: &str = "general.calculator_enabled";
pub const VAT_NOTE: &str = "general.vat_note";

pub const DEFAULT_MOVING_BASE_PRICE: Decimal = dec!(150);
pub const DEFAULT_MOVING_PRICE_PER_ROOM: Decimal = dec!(50);
pub const DEFAULT_MOVING_FLOOR_SURCHARGE: Decimal = dec!(25);
pub const DEFAULT_MOVING_PRICE_PER_KM: Decimal = dec!(1.50);
pub const DEFAULT_MOVING_FREE_DISTANCE_KM: Decimal = dec!(20);

pub const DEFAULT_CLEANING_BASE_PRICE: Decimal = dec!(80);
pub const DEFAULT_CLEANING_PRICE_PER_ROOM: Decimal = dec!(30);
pub const DEFAULT_CLEANING_DEEP_SURCHARGE: Decimal = dec!(50);
pub const DEFAULT_CLEANING_CONSTRUCTION_SURCHARGE: Decimal = dec!(100);

pub const DEFAULT_DECLUTTER_BASE_PRICE: Decimal = dec!(100);
pub const DEFAULT_DECLUTTER_PRICE_PER_VOLUME: Decimal = dec!(80);
pub const DEFAULT_DECLUTTER_HOUSE_SURCHARGE: Decimal = dec!(150);
pub const DEFAULT_DECLUTTER_BASEMENT_SURCHARGE: Decimal = dec!(50);

pub const DEFAULT_COMBINATION_DISCOUNT_2: Decimal = dec!(0.10);
pub const DEFAULT_COMBINATION_DISCOUNT_3: Decimal = dec!(0.15);
pub const DEFAULT_EXPRESS_SURCHARGE_RATE: Decimal = dec!(0.20);
pub const DEFAULT_MINIMUM_ORDER_VALUE: Decimal = dec!(100);

pub const DEFAULT_VAT_NOTE: &str = "All prices include 19% VAT.";

/// `pricing.<service>.active`
pub fn active_key(service: &str) -> String {
    format!("pricing.{}.active", service)
}

/// `pricing.<service>.rules`
pub fn rules_key(service: &str) -> String {
    format!("pricing.{}.rules", service)
}

/// The full default settings table, used to seed a fresh store.
pub fn default_settings() -> Vec<Setting> {
    let decimals = [
        (MOVING_BASE_PRICE, DEFAULT_MOVING_BASE_PRICE),
        (MOVING_PRICE_PER_ROOM, DEFAULT_MOVING_PRICE_PER_ROOM),
        (MOVING_FLOOR_SURCHARGE, DEFAULT_MOVING_FLOOR_SURCHARGE),
        (MOVING_PRICE_PER_KM, DEFAULT_MOVING_PRICE_PER_KM),
        (MOVING_FREE_DISTANCE_KM, DEFAULT_MOVING_FREE_DISTANCE_KM),
        (CLEANING_BASE_PRICE, DEFAULT_CLEANING_BASE_PRICE),
        (CLEANING_PRICE_PER_ROOM, DEFAULT_CLEANING_PRICE_PER_ROOM),
        (CLEANING_DEEP_SURCHARGE, DEFAULT_CLEANING_DEEP_SURCHARGE),
        (CLEANING_CONSTRUCTION_SURCHARGE, DEFAULT_CLEANING_CONSTRUCTION_SURCHARGE),
        (DECLUTTER_BASE_PRICE, DEFAULT_DECLUTTER_BASE_PRICE),
        (DECLUTTER_PRICE_PER_VOLUME, DEFAULT_DECLUTTER_PRICE_PER_VOLUME),
        (DECLUTTER_HOUSE_SURCHARGE, DEFAULT_DECLUTTER_HOUSE_SURCHARGE),
        (DECLUTTER_BASEMENT_SURCHARGE, DEFAULT_DECLUTTER_BASEMENT_SURCHARGE),
        (COMBINATION_DISCOUNT_2, DEFAULT_COMBINATION_DISCOUNT_2),
        (COMBINATION_DISCOUNT_3, DEFAULT_COMBINATION_DISCOUNT_3),
        (EXPRESS_SURCHARGE_RATE, DEFAULT_EXPRESS_SURCHARGE_RATE),
        (MINIMUM_ORDER_VALUE, DEFAULT_MINIMUM_ORDER_VALUE),
    ];

    let mut settings: Vec<Setting> = decimals
        .into_iter()
        .map(|(key, value)| Setting::new(key, SettingValue::Decimal(value), SettingType::Decimal))
        .collect();

    for service in ["umzug", "putzservice", "entruempelung"] {
        let mut active = Setting::new(
            &active_key(service),
            SettingValue::Boolean(true),
            SettingType::Boolean,
        );
        active.is_public = true;
        settings.push(active);
        settings.push(Setting::new(
            &rules_key(service),
            SettingValue::Json(serde_json::json!([])),
            SettingType::Json,
        ));
    }

    let mut enabled = Setting::new(
        CALCULATOR_ENABLED,
        SettingValue::Boolean(true),
        SettingType::Boolean,
    );
    enabled.is_public = true;
    settings.push(enabled);

    let mut vat = Setting::new(
        VAT_NOTE,
        SettingValue::String(DEFAULT_VAT_NOTE.to_string()),
        SettingType::String,
    );
    vat.is_public = true;
    settings.push(vat);

    settings
}
