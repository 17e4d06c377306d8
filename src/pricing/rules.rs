//! Conditional surcharge rules.
//!
//! Rules live in the `pricing.<service>.rules` setting as a JSON array:
//!
//! ```json
//! [
//!   { "label": "Piano transport", "field": "piano", "condition": { "kind": "is_true" }, "amount": "120" },
//!   { "label": "Large flat", "field": "rooms", "condition": { "kind": "gt", "value": "6" }, "amount": "80" },
//!   { "label": "Loyalty", "field": "customerType", "condition": { "kind": "in", "values": ["returning"] }, "amount": "-25" }
//! ]
//! ```
//!
//! Each rule that matches the service's detail bag adds one line.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::calculators::{flag_field, numeric_field};
use super::models::{LineKind, PriceLine};

/// Predicate over one field of a detail bag
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Gt { value: Decimal },
    Gte { value: Decimal },
    Lt { value: Decimal },
    Lte { value: Decimal },
    Eq { value: Value },
    /// Inclusive on both ends
    Between { min: Decimal, max: Decimal },
    In { values: Vec<Value> },
    IsTrue,
}

impl Condition {
    /// Evaluate against a field value; a missing field never matches.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let field = match field {
            None | Some(Value::Null) => return false,
            Some(v) => v,
        };

        match self {
            Condition::Gt { value } => numeric_field(Some(field)).is_some_and(|n| n > *value),
            Condition::Gte { value } => numeric_field(Some(field)).is_some_and(|n| n >= *value),
            Condition::Lt { value } => numeric_field(Some(field)).is_some_and(|n| n < *value),
            Condition::Lte { value } => numeric_field(Some(field)).is_some_and(|n| n <= *value),
            Condition::Eq { value } => loosely_equal(field, value),
            Condition::Between { min, max } => {
                numeric_field(Some(field)).is_some_and(|n| n >= *min && n <= *max)
            }
            Condition::In { values } => values.iter().any(|v| loosely_equal(field, v)),
            Condition::IsTrue => flag_field(Some(field)),
        }
    }
}

/// Compare numbers numerically and strings case-insensitively
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (numeric_field(Some(a)), numeric_field(Some(b))) {
        return x == y;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => a == b,
    }
}

/// A configured surcharge (or discount, when `amount` is negative)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SurchargeRule {
    pub label: String,
    /// Dotted path into the detail bag, e.g. `fromAddress.floor`
    pub field: String,
    pub condition: Condition,
    pub amount: Decimal,
}

impl SurchargeRule {
    /// The line this rule adds for `details`, if it matches
    pub fn apply(&self, details: &Value) -> Option<PriceLine> {
        if !self.condition.matches(field_at(details, &self.field)) {
            return None;
        }
        let kind = if self.amount < Decimal::ZERO {
            LineKind::Discount
        } else {
            LineKind::Surcharge
        };
        Some(PriceLine::new(self.label.clone(), self.amount, kind))
    }
}

/// Resolve a dotted path inside a JSON object
pub fn field_at<'a>(details: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(details, |current, segment| current.get(segment))
}

/// Parse the rules setting. Unreadable JSON yields no rules.
pub fn parse_rules(raw: &Value, setting_key: &str) -> Vec<SurchargeRule> {
    match raw {
        Value::Null => Vec::new(),
        Value::Array(items) if items.is_empty() => Vec::new(),
        other => match serde_json::from_value::<Vec<SurchargeRule>>(other.clone()) {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Ignoring unreadable surcharge rules in {}: {}", setting_key, e);
                Vec::new()
            }
        },
    }
}

/// Lines added by every rule matching `details`, in rule order
pub fn apply_rules(rules: &[SurchargeRule], details: &Value) -> Vec<PriceLine> {
    rules.iter().filter_map(|rule| rule.apply(details)).collect()
}
