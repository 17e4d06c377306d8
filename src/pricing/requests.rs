//! Request DTOs for pricing API endpoints.

use serde::Deserialize;
use serde_json::Value;

use super::models::{ServiceKey, Urgency, ValidationError};

/// Request to price a quote
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    #[serde(default, alias = "selected_services")]
    pub selected_services: Vec<String>,
    #[serde(default, alias = "moving_details")]
    pub moving_details: Value,
    #[serde(default, alias = "cleaning_details")]
    pub cleaning_details: Value,
    #[serde(default, alias = "declutter_details")]
    pub declutter_details: Value,
    #[serde(default, alias = "general_info")]
    pub general_info: GeneralInfo,
}

/// Information that applies to the whole request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralInfo {
    #[serde(default)]
    pub urgency: Option<String>,
}

impl QuoteInput {
    /// Selected services in request order, without duplicates.
    ///
    /// # Errors
    /// Per-field errors when nothing or an unknown service is selected.
    pub fn services(&self) -> Result<Vec<ServiceKey>, Vec<ValidationError>> {
        let mut services = Vec::new();
        let mut errors = Vec::new();

        for (index, raw) in self.selected_services.iter().enumerate() {
            match raw.parse::<ServiceKey>() {
                Ok(key) if !services.contains(&key) => services.push(key),
                Ok(_) => {}
                Err(message) => errors.push(ValidationError::new(
                    format!("selectedServices[{}]", index),
                    message,
                )),
            }
        }

        if services.is_empty() && errors.is_empty() {
            errors.push(ValidationError::new(
                "selectedServices",
                "At least one service must be selected",
            ));
        }

        if errors.is_empty() {
            Ok(services)
        } else {
            Err(errors)
        }
    }

    /// Detail bag for `service`
    pub fn details_for(&self, service: ServiceKey) -> &Value {
        match service {
            ServiceKey::Umzug => &self.moving_details,
            ServiceKey::Putzservice => &self.cleaning_details,
            ServiceKey::Entruempelung => &self.declutter_details,
        }
    }

    /// `express` when requested, otherwise `normal`
    pub fn urgency(&self) -> Urgency {
        match self.general_info.urgency.as_deref().map(str::trim) {
            Some(u) if u.eq_ignore_ascii_case("express") => Urgency::Express,
            _ => Urgency::Normal,
        }
    }
}
