//! HTTP handlers for the pricing engine.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::AppState;

use super::catalog::{is_calculator_enabled, list_services, vat_note};
use super::requests::QuoteInput;
use super::responses::{
    ApiResponse, EnabledResponse, QuoteResponse, ServiceCatalogEntry, ValidationResponse,
};

/// Pricing routes, mounted under `/api/pricing`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pricing/calculate", post(calculate))
        .route("/api/pricing/validate", post(validate))
        .route("/api/pricing/services", get(services))
        .route("/api/pricing/enabled", get(enabled))
}

fn body(payload: std::result::Result<Json<QuoteInput>, JsonRejection>) -> Result<QuoteInput> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Price a quote
async fn calculate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuoteInput>, JsonRejection>,
) -> Result<Json<ApiResponse<QuoteResponse>>> {
    let input = body(payload)?;

    if !is_calculator_enabled(&state.store).await {
        return Err(AppError::Disabled);
    }

    let quote = state.orchestrator.calculate_price(&input).await?;
    tracing::info!(
        "Quote calculated: {} service(s), total {}",
        quote.services.len(),
        quote.total
    );

    let note = vat_note(&state.store).await;
    Ok(Json(ApiResponse::ok(QuoteResponse::new(quote, note))))
}

/// Report every per-field problem of a quote request
async fn validate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuoteInput>, JsonRejection>,
) -> Result<Json<ApiResponse<ValidationResponse>>> {
    let input = body(payload)?;
    let errors = state.orchestrator.validate(&input);
    Ok(Json(ApiResponse::ok(ValidationResponse {
        valid: errors.is_empty(),
        errors,
    })))
}

/// Service catalog
async fn services(State(state): State<AppState>) -> Json<ApiResponse<Vec<ServiceCatalogEntry>>> {
    Json(ApiResponse::ok(list_services(&state.store).await))
}

/// Whether the calculator is offered
async fn enabled(State(state): State<AppState>) -> Json<ApiResponse<EnabledResponse>> {
    Json(ApiResponse::ok(EnabledResponse {
        enabled: is_calculator_enabled(&state.store).await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AppCache;
    use crate::distance::NoDistanceLookup;
    use crate::pricing::PricingOrchestrator;
    use crate::settings::keys::CALCULATOR_ENABLED;
    use crate::settings::store::testing::{store_with, unreachable_store};
    use crate::settings::{ConfigurationStore, SettingType, SettingValue};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(store: ConfigurationStore) -> AppState {
        let store = Arc::new(store);
        AppState {
            orchestrator: Arc::new(PricingOrchestrator::new(store.clone(), Arc::new(NoDistanceLookup))),
            store,
            cache: AppCache::new(),
        }
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = crate::app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_calculate_returns_envelope() {
        let (status, body) = send(
            state(store_with(&[])),
            post_json(
                "/api/pricing/calculate",
                json!({
                    "selectedServices": ["umzug", "putzservice"],
                    "movingDetails": { "rooms": 3 },
                    "cleaningDetails": { "size": "3-rooms" }
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total_cost"], "396.00");
        assert_eq!(body["data"]["currency"], "EUR");
        assert_eq!(body["data"]["services"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["services"][0]["total"], "300.00");
    }

    #[tokio::test]
    async fn test_calculate_rejects_empty_selection() {
        let (status, body) = send(
            state(store_with(&[])),
            post_json("/api/pricing/calculate", json!({ "selectedServices": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "selectedServices");
    }

    #[tokio::test]
    async fn test_calculate_reports_calculation_error() {
        let (status, body) = send(
            state(unreachable_store()),
            post_json("/api/pricing/calculate", json!({ "selectedServices": ["umzug"] })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "CALCULATION_ERROR");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_calculate_refused_when_disabled() {
        let store = store_with(&[(CALCULATOR_ENABLED, SettingValue::Boolean(false), SettingType::Boolean)]);
        let (status, body) = send(
            state(store),
            post_json("/api/pricing/calculate", json!({ "selectedServices": ["umzug"] })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error_code"], "CALCULATOR_DISABLED");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let request = Request::post("/api/pricing/calculate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(state(store_with(&[])), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_validate_lists_field_errors() {
        let (status, body) = send(
            state(store_with(&[])),
            post_json(
                "/api/pricing/validate",
                json!({ "selectedServices": ["umzug"], "movingDetails": { "rooms": "lots" } }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["valid"], false);
        assert_eq!(body["data"]["errors"][0]["field"], "movingDetails.rooms");
    }

    #[tokio::test]
    async fn test_services_and_enabled() {
        let (status, body) = send(
            state(store_with(&[])),
            Request::get("/api/pricing/services").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], "umzug");
        assert_eq!(body["data"][0]["base_price"], "150.00");

        let (_, body) = send(
            state(unreachable_store()),
            Request::get("/api/pricing/enabled").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body["data"]["enabled"], true);
    }
}
