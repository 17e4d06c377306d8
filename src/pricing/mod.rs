//! Pricing engine module.
//!
//! Quotes moving, cleaning and decluttering jobs from structured customer
//! input. Each service has its own calculator; the orchestrator combines
//! their results with cross-service discounts and a minimum order value.

pub mod calculators;
pub mod catalog;
pub mod cleaning;
pub mod decluttering;
pub mod discounts;
pub mod models;
pub mod moving;
pub mod orchestrator;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod rules;
pub mod services;

// Re-export commonly used items
pub use calculators::{round_money, sum_lines};
pub use models::{
    AggregatedQuote, CalculatorFailure, LineKind, PriceLine, PriceResult, ServiceKey, Urgency,
    ValidationError,
};
pub use orchestrator::PricingOrchestrator;
pub use requests::QuoteInput;
pub use routes::router;
pub use services::{PricingError, ServiceCalculator};
