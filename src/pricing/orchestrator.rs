//! Quote orchestration.
//!
//! Runs the calculator of every selected service, composes cross-service
//! discounts and surcharges, and raises the total to the minimum order value.
//! A failing calculator is replaced by its fallback estimate; only an
//! invalid selection or unreadable quote-wide settings fail the quote.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::distance::DistanceLookup;
use crate::settings::keys::*;
use crate::settings::{ConfigurationStore, SettingsError};

use super::calculators::{round_money, sum_lines};
use super::cleaning::CleaningCalculator;
use super::decluttering::DeclutterCalculator;
use super::discounts::{DiscountComposer, DiscountRates};
use super::models::{
    AggregatedQuote, CalculatorFailure, LineKind, PriceLine, PriceResult, ServiceKey,
    ValidationError,
};
use super::moving::{MovingCalculator, DEFAULT_DISTANCE_TIMEOUT};
use super::requests::QuoteInput;
use super::services::{fallback_result, PricingError, ServiceCalculator};

/// Quote-wide settings, read once per quote
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub discounts: DiscountRates,
    pub minimum_order_value: Decimal,
}

impl PricingPolicy {
    pub async fn load(store: &ConfigurationStore) -> Result<Self, SettingsError> {
        Ok(Self {
            discounts: DiscountRates::load(store).await?,
            minimum_order_value: store
                .try_get_value(MINIMUM_ORDER_VALUE, DEFAULT_MINIMUM_ORDER_VALUE)
                .await?
                .max(Decimal::ZERO),
        })
    }
}

/// Entry point of the pricing engine
pub struct PricingOrchestrator {
    store: Arc<ConfigurationStore>,
    calculators: BTreeMap<ServiceKey, Arc<dyn ServiceCalculator>>,
}

impl PricingOrchestrator {
    /// Orchestrator with the three standard calculators
    pub fn new(store: Arc<ConfigurationStore>, distance: Arc<dyn DistanceLookup>) -> Self {
        Self::with_distance_timeout(store, distance, DEFAULT_DISTANCE_TIMEOUT)
    }

    pub fn with_distance_timeout(
        store: Arc<ConfigurationStore>,
        distance: Arc<dyn DistanceLookup>,
        timeout: Duration,
    ) -> Self {
        let orchestrator = Self {
            store: store.clone(),
            calculators: BTreeMap::new(),
        };
        orchestrator
            .with_calculator(Arc::new(
                MovingCalculator::new(store.clone(), distance).with_timeout(timeout),
            ))
            .with_calculator(Arc::new(CleaningCalculator::new(store.clone())))
            .with_calculator(Arc::new(DeclutterCalculator::new(store)))
    }

    /// Register (or replace) the calculator for its service
    pub fn with_calculator(mut self, calculator: Arc<dyn ServiceCalculator>) -> Self {
        self.calculators.insert(calculator.service(), calculator);
        self
    }

    /// Every per-field problem with `input`: selection first, then each
    /// selected service's detail bag.
    pub fn validate(&self, input: &QuoteInput) -> Vec<ValidationError> {
        match input.services() {
            Err(errors) => errors,
            Ok(services) => services
                .into_iter()
                .filter_map(|service| self.calculators.get(&service).map(|c| (service, c)))
                .flat_map(|(service, calculator)| calculator.validate(input.details_for(service)))
                .collect(),
        }
    }

    /// Price a quote.
    ///
    /// # Errors
    /// `PricingError::Validation` when no or unknown services are selected,
    /// `PricingError::Configuration` when quote-wide settings are unreadable.
    pub async fn calculate_price(&self, input: &QuoteInput) -> Result<AggregatedQuote, PricingError> {
        let services = input.services().map_err(PricingError::Validation)?;
        let policy = PricingPolicy::load(&self.store).await?;

        let mut results = Vec::with_capacity(services.len());
        for service in services {
            results.push(self.price_service(service, input).await);
        }

        let mut breakdown: Vec<PriceLine> = results
            .iter()
            .flat_map(|result| {
                result.breakdown.iter().map(move |line| PriceLine {
                    label: format!("{}: {}", result.service_name, line.label),
                    amount: line.amount,
                    kind: line.kind,
                })
            })
            .collect();

        let composer = DiscountComposer::new(policy.discounts);
        breakdown.extend(composer.compose(&results, input.urgency()));

        let mut total = sum_lines(&breakdown);
        if total < policy.minimum_order_value {
            let adjustment = policy.minimum_order_value - total;
            debug!(
                "Quote total {} below minimum order value {}, adding {}",
                total, policy.minimum_order_value, adjustment
            );
            breakdown.push(PriceLine::new(
                "Minimum order value adjustment",
                adjustment,
                LineKind::Surcharge,
            ));
            total = sum_lines(&breakdown);
        }

        Ok(AggregatedQuote {
            services: results,
            total: round_money(total, 2),
            breakdown,
        })
    }

    async fn price_service(&self, service: ServiceKey, input: &QuoteInput) -> PriceResult {
        let outcome = match self.calculators.get(&service) {
            Some(calculator) => calculator.calculate(input.details_for(service)).await,
            None => Err(CalculatorFailure::MalformedDetails {
                service,
                message: "no calculator registered".to_string(),
            }),
        };

        match outcome {
            Ok(result) => result,
            Err(failure) => {
                warn!("Using fallback price for {}: {}", service, failure);
                fallback_result(service, &failure)
            }
        }
    }
}
