//! Response DTOs for pricing API endpoints.

use rust_decimal::Decimal;
use serde::Serialize;

use super::models::{AggregatedQuote, PriceLine, PriceResult, ValidationError};

/// Currency every quote is priced in
pub const CURRENCY: &str = "EUR";

/// Success envelope: `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Priced quote
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub services: Vec<PriceResult>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_cost: Decimal,
    pub currency: &'static str,
    pub breakdown: Vec<PriceLine>,
    pub vat_note: String,
}

impl QuoteResponse {
    pub fn new(quote: AggregatedQuote, vat_note: String) -> Self {
        Self {
            services: quote.services,
            total_cost: quote.total,
            currency: CURRENCY,
            breakdown: quote.breakdown,
            vat_note,
        }
    }
}

/// One entry of the service catalog
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    pub active: bool,
}

/// Whether the calculator is offered
#[derive(Debug, Serialize)]
pub struct EnabledResponse {
    pub enabled: bool,
}

/// Result of validating a quote request
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Error envelope: `{ "success": false, "message": ..., "error_code": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}
