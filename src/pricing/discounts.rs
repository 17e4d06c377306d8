//! Cross-service discounts and surcharges.
//!
//! Every percentage applies to the sum of the individually computed service
//! subtotals, never to another discount or surcharge, so the result does not
//! depend on the order the lines are applied in.

use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::settings::keys::*;
use crate::settings::{ConfigurationStore, SettingsError};

use super::calculators::{as_rate, round_money};
use super::models::{PriceLine, PriceResult, Urgency};

/// Rates used by the composer, as fractions
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountRates {
    pub combination_2: Decimal,
    pub combination_3: Decimal,
    pub express: Decimal,
}

impl Default for DiscountRates {
    fn default() -> Self {
        Self {
            combination_2: DEFAULT_COMBINATION_DISCOUNT_2,
            combination_3: DEFAULT_COMBINATION_DISCOUNT_3,
            express: DEFAULT_EXPRESS_SURCHARGE_RATE,
        }
    }
}

impl DiscountRates {
    pub async fn load(store: &ConfigurationStore) -> Result<Self, SettingsError> {
        Ok(Self {
            combination_2: as_rate(
                store
                    .try_get_value(COMBINATION_DISCOUNT_2, DEFAULT_COMBINATION_DISCOUNT_2)
                    .await?,
            ),
            combination_3: as_rate(
                store
                    .try_get_value(COMBINATION_DISCOUNT_3, DEFAULT_COMBINATION_DISCOUNT_3)
                    .await?,
            ),
            express: as_rate(
                store
                    .try_get_value(EXPRESS_SURCHARGE_RATE, DEFAULT_EXPRESS_SURCHARGE_RATE)
                    .await?,
            ),
        })
    }
}

/// Computes combination discounts and the express surcharge
#[derive(Debug, Clone, Default)]
pub struct DiscountComposer {
    rates: DiscountRates,
}

impl DiscountComposer {
    pub fn new(rates: DiscountRates) -> Self {
        Self { rates }
    }

    /// Discount lines first, then surcharge lines.
    pub fn compose(&self, results: &[PriceResult], urgency: Urgency) -> Vec<PriceLine> {
        let subtotal: Decimal = results.iter().map(|r| r.total).sum();
        let distinct: BTreeSet<&str> = results.iter().map(|r| r.service_name.as_str()).collect();

        let mut lines = Vec::new();

        let combination = match distinct.len() {
            0 | 1 => None,
            2 => Some(self.rates.combination_2),
            _ => Some(self.rates.combination_3),
        };
        if let Some(rate) = combination.filter(|r| !r.is_zero()) {
            lines.push(PriceLine::discount(
                format!(
                    "Combination discount ({} services, {}%)",
                    distinct.len(),
                    percent(rate)
                ),
                round_money(subtotal * rate, 2),
            ));
        }

        if urgency == Urgency::Express && !self.rates.express.is_zero() {
            lines.push(PriceLine::surcharge(
                format!("Express surcharge ({}%)", percent(self.rates.express)),
                round_money(subtotal * self.rates.express, 2),
            ));
        }

        lines
    }
}

fn percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}
