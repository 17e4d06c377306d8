//! Value objects produced by the pricing engine.
//!
//! Everything here is constructed fresh per request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::calculators::{round_money, sum_lines};

/// Bookable service, keyed by its German slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKey {
    Umzug,
    Putzservice,
    Entruempelung,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 3] = [
        ServiceKey::Umzug,
        ServiceKey::Putzservice,
        ServiceKey::Entruempelung,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Umzug => "umzug",
            ServiceKey::Putzservice => "putzservice",
            ServiceKey::Entruempelung => "entruempelung",
        }
    }

    /// Name shown on quotes
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKey::Umzug => "Moving",
            ServiceKey::Putzservice => "Cleaning",
            ServiceKey::Entruempelung => "Decluttering",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "umzug" => Ok(ServiceKey::Umzug),
            "putzservice" => Ok(ServiceKey::Putzservice),
            "entruempelung" | "entrümpelung" => Ok(ServiceKey::Entruempelung),
            other => Err(format!("Unknown service '{}'", other)),
        }
    }
}

/// How soon the customer needs the job done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Express,
}

/// Role of a breakdown line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Base,
    Surcharge,
    Discount,
}

/// One labeled, signed amount on a quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub label: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub kind: LineKind,
}

impl PriceLine {
    /// Amount is rounded to cents on construction
    pub fn new(label: impl Into<String>, amount: Decimal, kind: LineKind) -> Self {
        Self {
            label: label.into(),
            amount: round_money(amount, 2),
            kind,
        }
    }

    pub fn base(label: impl Into<String>, amount: Decimal) -> Self {
        Self::new(label, amount, LineKind::Base)
    }

    pub fn surcharge(label: impl Into<String>, amount: Decimal) -> Self {
        Self::new(label, amount, LineKind::Surcharge)
    }

    /// Discount lines carry a negative amount whatever the sign passed in
    pub fn discount(label: impl Into<String>, amount: Decimal) -> Self {
        Self::new(label, -amount.abs(), LineKind::Discount)
    }
}

/// Free-form details attached to a result (fallback marker, inputs used)
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Priced result of one service, or of a whole quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceResult {
    pub service_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub breakdown: Vec<PriceLine>,
    pub metadata: Metadata,
}

impl PriceResult {
    /// Build a result whose total is the sum of its lines
    pub fn from_lines(service_name: impl Into<String>, breakdown: Vec<PriceLine>, metadata: Metadata) -> Self {
        Self {
            service_name: service_name.into(),
            total: sum_lines(&breakdown),
            breakdown,
            metadata,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.metadata.get("fallback"), Some(serde_json::Value::Bool(true)))
    }
}

/// Orchestrator output: every service result plus the combined breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedQuote {
    pub services: Vec<PriceResult>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub breakdown: Vec<PriceLine>,
}

/// A single field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Why a service calculator could not price its detail bag
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalculatorFailure {
    #[error("Malformed details for {service}: {message}")]
    MalformedDetails { service: ServiceKey, message: String },

    #[error("Settings unavailable for {service}: {message}")]
    Settings { service: ServiceKey, message: String },
}
