//! Service catalog and calculator availability.
//!
//! Both are read-only views over settings; nothing here is computed.

use rust_decimal::Decimal;

use crate::settings::keys::*;
use crate::settings::ConfigurationStore;

use super::calculators::round_money;
use super::models::ServiceKey;
use super::responses::ServiceCatalogEntry;

fn description(service: ServiceKey) -> &'static str {
    match service {
        ServiceKey::Umzug => "Household moves including loading, transport and unloading",
        ServiceKey::Putzservice => "Regular, deep and post-construction cleaning",
        ServiceKey::Entruempelung => "Clearance of flats, houses and basements",
    }
}

fn base_price_key(service: ServiceKey) -> (&'static str, Decimal) {
    match service {
        ServiceKey::Umzug => (MOVING_BASE_PRICE, DEFAULT_MOVING_BASE_PRICE),
        ServiceKey::Putzservice => (CLEANING_BASE_PRICE, DEFAULT_CLEANING_BASE_PRICE),
        ServiceKey::Entruempelung => (DECLUTTER_BASE_PRICE, DEFAULT_DECLUTTER_BASE_PRICE),
    }
}

/// The static service catalog with base prices and active flags from settings
pub async fn list_services(store: &ConfigurationStore) -> Vec<ServiceCatalogEntry> {
    let mut entries = Vec::with_capacity(ServiceKey::ALL.len());
    for service in ServiceKey::ALL {
        let (key, default) = base_price_key(service);
        entries.push(ServiceCatalogEntry {
            id: service.as_str(),
            name: service.display_name(),
            description: description(service),
            base_price: round_money(store.get_value(key, default).await, 2),
            active: store.get_value(&active_key(service.as_str()), true).await,
        });
    }
    entries
}

/// Whether the price calculator is offered. Read failures count as enabled.
pub async fn is_calculator_enabled(store: &ConfigurationStore) -> bool {
    store.get_value(CALCULATOR_ENABLED, true).await
}

/// Note shown next to every quote total
pub async fn vat_note(store: &ConfigurationStore) -> String {
    store.get_value(VAT_NOTE, DEFAULT_VAT_NOTE.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::store::testing::{store_with, unreachable_store};
    use crate::settings::{SettingType, SettingValue};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_catalog_reflects_settings() {
        let store = store_with(&[
            (CLEANING_BASE_PRICE, SettingValue::Decimal(dec!(95)), SettingType::Decimal),
            ("pricing.entruempelung.active", SettingValue::Boolean(false), SettingType::Boolean),
        ]);
        let services = list_services(&store).await;

        assert_eq!(services.len(), 3);
        assert_eq!(services[0].id, "umzug");
        assert_eq!(services[0].base_price, dec!(150));
        assert_eq!(services[1].base_price, dec!(95));
        assert!(services[1].active);
        assert!(!services[2].active);
    }

    #[tokio::test]
    async fn test_enabled_flag() {
        let store = store_with(&[(CALCULATOR_ENABLED, SettingValue::Boolean(false), SettingType::Boolean)]);
        assert!(!is_calculator_enabled(&store).await);
        assert!(is_calculator_enabled(&store_with(&[])).await);
    }

    #[tokio::test]
    async fn test_enabled_defaults_to_true_when_unreachable() {
        assert!(is_calculator_enabled(&unreachable_store()).await);
        assert_eq!(vat_note(&unreachable_store()).await, DEFAULT_VAT_NOTE);
    }
}
