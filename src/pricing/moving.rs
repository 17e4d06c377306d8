//! Moving (Umzug) price calculator.
//!
//! `total = base + rooms * price_per_room + extra_floors * floor_surcharge
//!        + max(0, km - free_km) * price_per_km`
//!
//! The distance term is only present when the lookup succeeded. A failed or
//! timed-out lookup drops the line instead of failing the calculation.

use async_trait::async_trait;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::distance::{lookup_with_timeout, DistanceLookup, DistanceResult};
use crate::settings::keys::*;
use crate::settings::{ConfigurationStore, SettingsError};

use super::calculators::{extra_floors, flag_field, is_non_numeric, normalize_floors, normalize_rooms};
use super::models::{CalculatorFailure, Metadata, PriceLine, PriceResult, ServiceKey, ValidationError};
use super::rules::{apply_rules, SurchargeRule};
use super::services::{load_rules, parse_details, settings_failure, text_field, validate_structure, ServiceCalculator};

/// Default bound on a single distance lookup
pub const DEFAULT_DISTANCE_TIMEOUT: Duration = Duration::from_secs(3);

/// One end of the move
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, alias = "postal_code", alias = "zip")]
    pub postal_code: Option<Value>,
    #[serde(default)]
    pub floor: Option<Value>,
    #[serde(default)]
    pub elevator: Option<Value>,
}

/// Moving detail bag as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingDetails {
    #[serde(default)]
    pub rooms: Option<Value>,
    #[serde(default, alias = "flat_rooms")]
    pub flat_rooms: Option<Value>,
    #[serde(default)]
    pub floors: Option<Value>,
    #[serde(default)]
    pub elevator: Option<Value>,
    #[serde(default, alias = "from_address")]
    pub from_address: Option<Address>,
    #[serde(default, alias = "to_address")]
    pub to_address: Option<Address>,
}

impl MovingDetails {
    /// Floors above the second one that are carried without an elevator.
    ///
    /// The pickup leg uses `fromAddress.floor`, falling back to `floors`.
    /// The delivery leg only counts when `toAddress.floor` is given.
    pub fn chargeable_floors(&self) -> u32 {
        let from = self.from_address.as_ref();
        let pickup_floors = from
            .and_then(|a| a.floor.as_ref())
            .or(self.floors.as_ref());
        let pickup_elevator = flag_field(from.and_then(|a| a.elevator.as_ref()))
            || flag_field(self.elevator.as_ref());

        let mut floors = if pickup_elevator {
            0
        } else {
            extra_floors(normalize_floors(pickup_floors))
        };

        if let Some(to) = &self.to_address {
            if to.floor.is_some() && !flag_field(to.elevator.as_ref()) {
                floors += extra_floors(normalize_floors(to.floor.as_ref()));
            }
        }

        floors
    }

    /// Both postal codes, when the move has two usable addresses
    pub fn postal_codes(&self) -> Option<(String, String)> {
        let from = text_field(self.from_address.as_ref()?.postal_code.as_ref())?;
        let to = text_field(self.to_address.as_ref()?.postal_code.as_ref())?;
        Some((from, to))
    }
}

/// Moving rates read from settings
#[derive(Debug, Clone)]
pub struct MovingRates {
    pub base_price: Decimal,
    pub price_per_room: Decimal,
    pub floor_surcharge: Decimal,
    pub price_per_km: Decimal,
    pub free_distance_km: Decimal,
    pub rules: Vec<SurchargeRule>,
}

impl Default for MovingRates {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_MOVING_BASE_PRICE,
            price_per_room: DEFAULT_MOVING_PRICE_PER_ROOM,
            floor_surcharge: DEFAULT_MOVING_FLOOR_SURCHARGE,
            price_per_km: DEFAULT_MOVING_PRICE_PER_KM,
            free_distance_km: DEFAULT_MOVING_FREE_DISTANCE_KM,
            rules: Vec::new(),
        }
    }
}

impl MovingRates {
    pub async fn load(store: &ConfigurationStore) -> Result<Self, SettingsError> {
        Ok(Self {
            base_price: store.try_get_value(MOVING_BASE_PRICE, DEFAULT_MOVING_BASE_PRICE).await?,
            price_per_room: store
                .try_get_value(MOVING_PRICE_PER_ROOM, DEFAULT_MOVING_PRICE_PER_ROOM)
                .await?,
            floor_surcharge: store
                .try_get_value(MOVING_FLOOR_SURCHARGE, DEFAULT_MOVING_FLOOR_SURCHARGE)
                .await?,
            price_per_km: store
                .try_get_value(MOVING_PRICE_PER_KM, DEFAULT_MOVING_PRICE_PER_KM)
                .await?,
            free_distance_km: store
                .try_get_value(MOVING_FREE_DISTANCE_KM, DEFAULT_MOVING_FREE_DISTANCE_KM)
                .await?,
            rules: load_rules(store, ServiceKey::Umzug).await?,
        })
    }
}

/// Price a move. `raw` is the untyped detail bag the rules are matched on.
pub fn price_moving(
    details: &MovingDetails,
    raw: &Value,
    rates: &MovingRates,
    distance: Option<&DistanceResult>,
) -> PriceResult {
    let rooms = normalize_rooms(details.rooms.as_ref(), details.flat_rooms.as_ref());
    let floors = details.chargeable_floors();

    let mut lines = Vec::new();
    let mut metadata = Metadata::new();
    metadata.insert("rooms".to_string(), rooms.into());
    metadata.insert("extra_floors".to_string(), floors.into());

    if !rates.base_price.is_zero() {
        lines.push(PriceLine::base("Base price", rates.base_price));
    }

    let rooms_amount = Decimal::from(rooms) * rates.price_per_room;
    if !rooms_amount.is_zero() {
        lines.push(PriceLine::base(
            format!("Rooms ({} × {})", rooms, rates.price_per_room.round_dp(2)),
            rooms_amount,
        ));
    }

    let floors_amount = Decimal::from(floors) * rates.floor_surcharge;
    if !floors_amount.is_zero() {
        lines.push(PriceLine::surcharge(
            format!("Floor surcharge ({} floors without elevator)", floors),
            floors_amount,
        ));
    }

    let distance = distance.map(|d| (d, d.usable_km().and_then(Decimal::from_f64)));
    match distance {
        Some((_, Some(km))) => {
            let km = km.round_dp(1);
            metadata.insert("distance_status".to_string(), "ok".into());
            metadata.insert("distance_km".to_string(), km.to_string().into());

            let chargeable = (km - rates.free_distance_km).max(Decimal::ZERO);
            let distance_amount = chargeable * rates.price_per_km;
            if !distance_amount.is_zero() {
                lines.push(PriceLine::surcharge(
                    format!(
                        "Distance surcharge ({} km beyond {} km included)",
                        chargeable, rates.free_distance_km
                    ),
                    distance_amount,
                ));
            }
        }
        Some((result, None)) => {
            metadata.insert("distance_status".to_string(), "unavailable".into());
            let error = match &result.error {
                Some(error) => error.clone(),
                None => "distance out of range".to_string(),
            };
            metadata.insert("distance_error".to_string(), error.into());
        }
        None => {
            metadata.insert("distance_status".to_string(), "not_requested".into());
        }
    }

    lines.extend(apply_rules(&rates.rules, raw));

    PriceResult::from_lines(ServiceKey::Umzug.display_name(), lines, metadata)
}

/// Moving calculator backed by settings and a distance lookup
pub struct MovingCalculator {
    store: Arc<ConfigurationStore>,
    distance: Arc<dyn DistanceLookup>,
    timeout: Duration,
}

impl MovingCalculator {
    pub fn new(store: Arc<ConfigurationStore>, distance: Arc<dyn DistanceLookup>) -> Self {
        Self {
            store,
            distance,
            timeout: DEFAULT_DISTANCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ServiceCalculator for MovingCalculator {
    fn service(&self) -> ServiceKey {
        ServiceKey::Umzug
    }

    async fn calculate(&self, details: &Value) -> Result<PriceResult, CalculatorFailure> {
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, details)?;
        let rates = MovingRates::load(&self.store)
            .await
            .map_err(settings_failure(ServiceKey::Umzug))?;

        let distance = match parsed.postal_codes() {
            Some((from, to)) => {
                Some(lookup_with_timeout(self.distance.as_ref(), &from, &to, self.timeout).await)
            }
            None => None,
        };

        Ok(price_moving(&parsed, details, &rates, distance.as_ref()))
    }

    fn validate(&self, details: &Value) -> Vec<ValidationError> {
        let parsed: MovingDetails =
            match validate_structure(ServiceKey::Umzug, "movingDetails", details) {
                Ok(parsed) => parsed,
                Err(errors) => return errors,
            };

        let mut errors = Vec::new();
        let numeric_fields = [
            ("movingDetails.rooms", parsed.rooms.as_ref()),
            ("movingDetails.flatRooms", parsed.flat_rooms.as_ref()),
            ("movingDetails.floors", parsed.floors.as_ref()),
            (
                "movingDetails.fromAddress.floor",
                parsed.from_address.as_ref().and_then(|a| a.floor.as_ref()),
            ),
            (
                "movingDetails.toAddress.floor",
                parsed.to_address.as_ref().and_then(|a| a.floor.as_ref()),
            ),
        ];
        for (field, value) in numeric_fields {
            if is_non_numeric(value) {
                errors.push(ValidationError::new(field, "must be a number"));
            }
        }

        let addresses = [
            ("movingDetails.fromAddress.postalCode", parsed.from_address.as_ref()),
            ("movingDetails.toAddress.postalCode", parsed.to_address.as_ref()),
        ];
        for (field, address) in addresses {
            if let Some(code) = text_field(address.and_then(|a| a.postal_code.as_ref())) {
                if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
                    errors.push(ValidationError::new(field, "must be a 5-digit postal code"));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::testing::SlowDistanceLookup;
    use crate::distance::{FixedDistanceTable, NoDistanceLookup};
    use crate::settings::store::testing::{store_with, unreachable_store};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn rates() -> MovingRates {
        MovingRates::default()
    }

    fn price(details: Value) -> PriceResult {
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, &details).unwrap();
        price_moving(&parsed, &details, &rates(), None)
    }

    #[test]
    fn test_rooms_and_base_only() {
        // 150 + 3 × 50
        let result = price(json!({ "rooms": 3, "floors": 2 }));
        assert_eq!(result.total, dec!(300.00));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].label, "Base price");
        assert!(result.breakdown[1].label.starts_with("Rooms"));
    }

    #[test]
    fn test_total_non_decreasing_in_rooms() {
        let mut previous = Decimal::ZERO;
        for rooms in 0..12 {
            let total = price(json!({ "rooms": rooms })).total;
            assert!(total >= previous, "rooms={} total={} previous={}", rooms, total, previous);
            previous = total;
        }
    }

    #[test]
    fn test_each_floor_above_second_adds_floor_surcharge() {
        for floors in 3..10 {
            let lower = price(json!({ "rooms": 2, "floors": floors })).total;
            let higher = price(json!({ "rooms": 2, "floors": floors + 1 })).total;
            assert_eq!(higher - lower, DEFAULT_MOVING_FLOOR_SURCHARGE);
        }
    }

    #[test]
    fn test_floor_surcharge_line_order_and_amount() {
        let result = price(json!({ "rooms": 2, "floors": 5 }));
        // 150 + 100 + 3 × 25
        assert_eq!(result.total, dec!(325));
        assert_eq!(result.breakdown.len(), 3);
        assert!(result.breakdown[2].label.starts_with("Floor surcharge"));
    }

    #[test]
    fn test_elevator_skips_pickup_floors() {
        let result = price(json!({ "rooms": 2, "floors": 5, "elevator": true }));
        assert_eq!(result.total, dec!(250));

        let result = price(json!({
            "rooms": 2,
            "fromAddress": { "floor": 5, "elevator": "yes" }
        }));
        assert_eq!(result.total, dec!(250));
    }

    #[test]
    fn test_delivery_leg_counts_when_floor_given() {
        let result = price(json!({
            "rooms": 2,
            "floors": 4,
            "toAddress": { "floor": 3, "elevator": false }
        }));
        // pickup 2 extra + delivery 1 extra
        assert_eq!(result.total, dec!(250) + dec!(3) * DEFAULT_MOVING_FLOOR_SURCHARGE);

        let result = price(json!({
            "rooms": 2,
            "toAddress": { "floor": 6, "elevator": true }
        }));
        assert_eq!(result.total, dec!(250));
    }

    #[test]
    fn test_malformed_numbers_are_clamped() {
        assert_eq!(price(json!({ "rooms": -4, "floors": -3 })).total, dec!(200));
        assert_eq!(price(json!({ "rooms": "lots", "floors": "high" })).total, dec!(200));
        assert_eq!(price(json!({ "flatRooms": "4" })).total, dec!(350));
    }

    #[test]
    fn test_huge_room_count_does_not_lower_total() {
        let ten = price(json!({ "rooms": 10 })).total;
        let huge = price(json!({ "rooms": 1e20 })).total;
        assert_eq!(ten, dec!(650));
        assert!(huge > ten, "rooms=1e20 total={} below rooms=10 total={}", huge, ten);
    }

    #[test]
    fn test_unrepresentable_distance_counts_as_unavailable() {
        let details = json!({ "rooms": 1 });
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, &details).unwrap();
        let lookup = DistanceResult::found(1e300, None);

        let result = price_moving(&parsed, &details, &rates(), Some(&lookup));
        assert_eq!(result.total, dec!(200));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.metadata["distance_status"], "unavailable");
        assert_eq!(result.metadata["distance_error"], "distance out of range");
    }

    #[test]
    fn test_distance_line_beyond_free_km() {
        let details = json!({ "rooms": 1 });
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, &details).unwrap();
        let lookup = DistanceResult::found(50.0, Some(40.0));

        let result = price_moving(&parsed, &details, &rates(), Some(&lookup));
        // 150 + 50 + (50 - 20) × 1.50
        assert_eq!(result.total, dec!(245));
        let last = result.breakdown.last().unwrap();
        assert!(last.label.starts_with("Distance surcharge"));
        assert_eq!(result.metadata["distance_status"], "ok");
    }

    #[test]
    fn test_distance_within_free_km_adds_no_line() {
        let details = json!({ "rooms": 1 });
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, &details).unwrap();
        let lookup = DistanceResult::found(12.0, None);

        let result = price_moving(&parsed, &details, &rates(), Some(&lookup));
        assert_eq!(result.total, dec!(200));
        assert_eq!(result.breakdown.len(), 2);
    }

    #[test]
    fn test_failed_lookup_omits_distance_line() {
        let details = json!({ "rooms": 3, "floors": 2 });
        let parsed: MovingDetails = parse_details(ServiceKey::Umzug, &details).unwrap();
        let lookup = DistanceResult::failed("geocoding failed");

        let result = price_moving(&parsed, &details, &rates(), Some(&lookup));
        assert_eq!(result.total, dec!(300));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.metadata["distance_status"], "unavailable");
        assert_eq!(result.metadata["distance_error"], "geocoding failed");
    }

    #[test]
    fn test_postal_codes_need_both_addresses() {
        let parsed: MovingDetails = parse_details(
            ServiceKey::Umzug,
            &json!({ "fromAddress": { "postalCode": "10115" } }),
        )
        .unwrap();
        assert!(parsed.postal_codes().is_none());

        let parsed: MovingDetails = parse_details(
            ServiceKey::Umzug,
            &json!({ "fromAddress": { "postalCode": 10115 }, "to_address": { "zip": "80331" } }),
        )
        .unwrap();
        assert_eq!(
            parsed.postal_codes(),
            Some(("10115".to_string(), "80331".to_string()))
        );
    }

    #[tokio::test]
    async fn test_calculator_uses_configured_rates_and_lookup() {
        let store = Arc::new(store_with(&[]));
        let lookup = Arc::new(FixedDistanceTable::new().with("10115", "14467", 40.0));
        let calculator = MovingCalculator::new(store, lookup);

        let result = calculator
            .calculate(&json!({
                "rooms": 2,
                "fromAddress": { "postalCode": "10115" },
                "toAddress": { "postalCode": "14467" }
            }))
            .await
            .unwrap();
        // 150 + 100 + 20 × 1.50
        assert_eq!(result.total, dec!(280));
    }

    #[tokio::test]
    async fn test_calculator_survives_unavailable_lookup() {
        let store = Arc::new(store_with(&[]));
        let calculator = MovingCalculator::new(store, Arc::new(NoDistanceLookup));

        let result = calculator
            .calculate(&json!({
                "rooms": 3,
                "floors": 2,
                "fromAddress": { "postalCode": "10115" },
                "toAddress": { "postalCode": "80331" }
            }))
            .await
            .unwrap();
        assert_eq!(result.total, dec!(300));
        assert_eq!(result.breakdown.len(), 2);
    }

    #[tokio::test]
    async fn test_calculator_survives_slow_lookup() {
        let store = Arc::new(store_with(&[]));
        let calculator = MovingCalculator::new(
            store,
            Arc::new(SlowDistanceLookup(Duration::from_secs(5))),
        )
        .with_timeout(Duration::from_millis(20));

        let result = calculator
            .calculate(&json!({
                "rooms": 1,
                "fromAddress": { "postalCode": "10115" },
                "toAddress": { "postalCode": "80331" }
            }))
            .await
            .unwrap();
        assert_eq!(result.total, dec!(200));
        assert_eq!(result.metadata["distance_error"], "timeout");
    }

    #[tokio::test]
    async fn test_calculator_applies_configured_rules() {
        use crate::settings::{SettingType, SettingValue};

        let rules = json!([
            { "label": "Piano transport", "field": "piano", "condition": { "kind": "is_true" }, "amount": "120" }
        ]);
        let store = Arc::new(store_with(&[(
            "pricing.umzug.rules",
            SettingValue::Json(rules),
            SettingType::Json,
        )]));
        let calculator = MovingCalculator::new(store, Arc::new(NoDistanceLookup));

        let result = calculator
            .calculate(&json!({ "rooms": 1, "piano": true }))
            .await
            .unwrap();
        assert_eq!(result.total, dec!(320));
        assert_eq!(result.breakdown.last().unwrap().label, "Piano transport");
    }

    #[tokio::test]
    async fn test_calculator_fails_on_malformed_structure() {
        let store = Arc::new(store_with(&[]));
        let calculator = MovingCalculator::new(store, Arc::new(NoDistanceLookup));

        let result = calculator.calculate(&json!({ "fromAddress": 42 })).await;
        assert!(matches!(result, Err(CalculatorFailure::MalformedDetails { .. })));
    }

    #[tokio::test]
    async fn test_calculator_fails_when_settings_unreachable() {
        let calculator = MovingCalculator::new(Arc::new(unreachable_store()), Arc::new(NoDistanceLookup));
        let result = calculator.calculate(&json!({ "rooms": 1 })).await;
        assert!(matches!(result, Err(CalculatorFailure::Settings { .. })));
    }

    #[test]
    fn test_validate_flags_non_numeric_fields() {
        let calculator = MovingCalculator::new(Arc::new(store_with(&[])), Arc::new(NoDistanceLookup));
        let errors = calculator.validate(&json!({
            "rooms": "three",
            "floors": 2,
            "fromAddress": { "postalCode": "1011" }
        }));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["movingDetails.rooms", "movingDetails.fromAddress.postalCode"]
        );
    }

    #[test]
    fn test_validate_flags_malformed_structure() {
        let calculator = MovingCalculator::new(Arc::new(store_with(&[])), Arc::new(NoDistanceLookup));
        let errors = calculator.validate(&json!([1, 2]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "movingDetails");
    }
}
