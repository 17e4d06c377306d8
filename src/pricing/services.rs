//! Service calculator contract and the helpers shared by its implementations.
//!
//! Calculators read their rates from the [`ConfigurationStore`] and return
//! `Result<PriceResult, CalculatorFailure>`. A failure never aborts a quote;
//! the orchestrator substitutes [`fallback_result`] for that service.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::settings::keys::rules_key;
use crate::settings::{ConfigurationStore, SettingsError};

use super::models::{CalculatorFailure, Metadata, PriceLine, PriceResult, ServiceKey, ValidationError};
use super::rules::{parse_rules, SurchargeRule};

/// Prices one service from its raw detail bag
#[async_trait]
pub trait ServiceCalculator: Send + Sync {
    fn service(&self) -> ServiceKey;

    /// Price `details`. Malformed optional fields are normalized, not
    /// rejected; only an unusable structure or unreadable settings fail.
    async fn calculate(&self, details: &Value) -> Result<PriceResult, CalculatorFailure>;

    /// Field-level problems the caller may want to surface
    fn validate(&self, details: &Value) -> Vec<ValidationError>;
}

/// Pricing calculation error types
#[derive(Debug, Clone)]
pub enum PricingError {
    /// The request itself is unusable (no or unknown services selected)
    Validation(Vec<ValidationError>),
    /// Settings needed for the whole quote could not be read
    Configuration { message: String },
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                write!(f, "Invalid quote request ({})", fields.join(", "))
            }
            PricingError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for PricingError {}

impl From<SettingsError> for PricingError {
    fn from(e: SettingsError) -> Self {
        PricingError::Configuration {
            message: e.to_string(),
        }
    }
}

/// Price substituted when a service calculator fails
pub fn fallback_price(service: ServiceKey) -> Decimal {
    match service {
        ServiceKey::Umzug => dec!(500),
        ServiceKey::Putzservice => dec!(150),
        ServiceKey::Entruempelung => dec!(300),
    }
}

/// Static estimate for a service whose calculator failed
pub fn fallback_result(service: ServiceKey, failure: &CalculatorFailure) -> PriceResult {
    let mut metadata = Metadata::new();
    metadata.insert("fallback".to_string(), Value::Bool(true));
    metadata.insert(
        "fallback_reason".to_string(),
        Value::String(failure.to_string()),
    );

    PriceResult::from_lines(
        service.display_name(),
        vec![PriceLine::base("Base price (estimate)", fallback_price(service))],
        metadata,
    )
}

/// Deserialize a detail bag. `null` means "no details given".
pub fn parse_details<T: DeserializeOwned + Default>(
    service: ServiceKey,
    details: &Value,
) -> Result<T, CalculatorFailure> {
    match details {
        Value::Null => Ok(T::default()),
        Value::Object(_) => {
            serde_json::from_value(details.clone()).map_err(|e| CalculatorFailure::MalformedDetails {
                service,
                message: e.to_string(),
            })
        }
        other => Err(CalculatorFailure::MalformedDetails {
            service,
            message: format!("expected an object, got {}", json_type(other)),
        }),
    }
}

/// Structural validation shared by every calculator
pub fn validate_structure<T: DeserializeOwned + Default>(
    service: ServiceKey,
    field: &str,
    details: &Value,
) -> Result<T, Vec<ValidationError>> {
    parse_details(service, details).map_err(|e| vec![ValidationError::new(field, e.to_string())])
}

/// Lenient text read: strings are trimmed, numbers are formatted
pub fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read the conditional rules configured for `service`
pub async fn load_rules(
    store: &ConfigurationStore,
    service: ServiceKey,
) -> Result<Vec<SurchargeRule>, SettingsError> {
    let key = rules_key(service.as_str());
    let raw: Value = store.try_get_value(&key, Value::Array(Vec::new())).await?;
    Ok(parse_rules(&raw, &key))
}

/// Map a settings read failure onto the calculator failure for `service`
pub fn settings_failure(service: ServiceKey) -> impl FnOnce(SettingsError) -> CalculatorFailure {
    move |e| CalculatorFailure::Settings {
        service,
        message: e.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Probe {
        #[serde(default)]
        size: Option<Value>,
    }

    #[test]
    fn test_pricing_error_display() {
        let err = PricingError::Validation(vec![ValidationError::new(
            "selectedServices",
            "At least one service must be selected",
        )]);
        assert!(err.to_string().contains("selectedServices"));

        let err = PricingError::Configuration {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_fallback_result_is_marked() {
        let failure = CalculatorFailure::MalformedDetails {
            service: ServiceKey::Putzservice,
            message: "bad".to_string(),
        };
        let result = fallback_result(ServiceKey::Putzservice, &failure);
        assert!(result.is_fallback());
        assert_eq!(result.total, dec!(150));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.service_name, "Cleaning");
    }

    #[test]
    fn test_parse_details_accepts_null_and_objects() {
        let probe: Probe = parse_details(ServiceKey::Putzservice, &Value::Null).unwrap();
        assert!(probe.size.is_none());

        let probe: Probe = parse_details(ServiceKey::Putzservice, &json!({ "size": "2-rooms" })).unwrap();
        assert_eq!(probe.size, Some(json!("2-rooms")));
    }

    #[test]
    fn test_parse_details_rejects_non_objects() {
        let result: Result<Probe, _> = parse_details(ServiceKey::Putzservice, &json!("2-rooms"));
        assert!(matches!(result, Err(CalculatorFailure::MalformedDetails { .. })));
    }

    #[test]
    fn test_text_field() {
        assert_eq!(text_field(Some(&json!(" house "))), Some("house".to_string()));
        assert_eq!(text_field(Some(&json!(10115))), Some("10115".to_string()));
        assert_eq!(text_field(Some(&json!(""))), None);
        assert_eq!(text_field(Some(&json!(true))), None);
    }
}
