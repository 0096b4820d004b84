use async_trait::async_trait;
use fipe_comparador::cache::{CacheTtlConfig, FipeCache};
use fipe_comparador::client::{
    FipeApi, FipeBrand, FipeModel, FipeYear, RawFipeVehicle, UpstreamError,
};
use fipe_comparador::models::vehicle::{DataSource, VehicleClass};
use fipe_comparador::services::normalizer_service::VehicleNormalizer;
use fipe_comparador::services::rate_governor::RateGovernor;
use fipe_comparador::services::search_service::{ResultSource, SearchFilters, SearchService};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

// Doble que simula un upstream completamente caído
struct FailingFipe;

#[async_trait]
impl FipeApi for FailingFipe {
    async fn fetch_brands(&self, _class: VehicleClass) -> Result<Vec<FipeBrand>, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }

    async fn fetch_models(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
    ) -> Result<Vec<FipeModel>, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }

    async fn fetch_years(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
        _model_id: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }

    async fn fetch_detail(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
        _model_id: &str,
        _year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }

    async fn fetch_years_by_code(
        &self,
        _class: VehicleClass,
        _fipe_code: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }

    async fn fetch_detail_by_code(
        &self,
        _class: VehicleClass,
        _fipe_code: &str,
        _year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        Err(UpstreamError::UnexpectedPayload("fuera de servicio".to_string()))
    }
}

// Doble con respuestas fijas, sin red
struct StaticFipe;

#[async_trait]
impl FipeApi for StaticFipe {
    async fn fetch_brands(&self, _class: VehicleClass) -> Result<Vec<FipeBrand>, UpstreamError> {
        Ok(vec![
            FipeBrand {
                code: "59".to_string(),
                name: "Toyota".to_string(),
            },
            FipeBrand {
                code: "21".to_string(),
                name: "Fiat".to_string(),
            },
        ])
    }

    async fn fetch_models(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
    ) -> Result<Vec<FipeModel>, UpstreamError> {
        Ok(vec![
            FipeModel {
                code: "4828".to_string(),
                name: "Corolla XEi 2.0 16V".to_string(),
            },
            FipeModel {
                code: "4829".to_string(),
                name: "Corolla Cross XRE 2.0 CVT".to_string(),
            },
        ])
    }

    async fn fetch_years(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
        _model_id: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        Ok(vec![
            FipeYear {
                code: "2023-1".to_string(),
                name: "2023 Gasolina".to_string(),
            },
            FipeYear {
                code: "2022-1".to_string(),
                name: "2022 Gasolina".to_string(),
            },
        ])
    }

    async fn fetch_detail(
        &self,
        _class: VehicleClass,
        _brand_id: &str,
        _model_id: &str,
        _year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        Ok(RawFipeVehicle {
            brand: Some("Toyota".to_string()),
            model: Some("Corolla XEi 2.0 16V".to_string()),
            model_year: Some(2023),
            fuel: Some("Gasolina".to_string()),
            price: Some("R$ 120.000,00".to_string()),
            code_fipe: Some("002104-2".to_string()),
            ..Default::default()
        })
    }

    async fn fetch_years_by_code(
        &self,
        _class: VehicleClass,
        _fipe_code: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        Ok(vec![FipeYear {
            code: "2023-1".to_string(),
            name: "2023 Gasolina".to_string(),
        }])
    }

    async fn fetch_detail_by_code(
        &self,
        _class: VehicleClass,
        _fipe_code: &str,
        _year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        self.fetch_detail(VehicleClass::Cars, "", "", "").await
    }
}

fn service(client: Arc<dyn FipeApi>, max_calls: u32) -> SearchService {
    SearchService::new(
        client,
        Arc::new(FipeCache::new()),
        Arc::new(RateGovernor::new(max_calls, Duration::from_secs(60))),
        Arc::new(VehicleNormalizer::new(Some(42))),
        CacheTtlConfig::default(),
        Duration::ZERO,
    )
}

fn make_filters(make: &str) -> SearchFilters {
    SearchFilters {
        make: Some(make.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_total_upstream_failure_falls_back_gracefully() {
    let service = service(Arc::new(FailingFipe), 10);

    let outcome = service.search(&make_filters("Toyota")).await;

    assert_eq!(outcome.source, ResultSource::Fallback);
    assert!(!outcome.vehicles.is_empty());
    for vehicle in &outcome.vehicles {
        assert_eq!(vehicle.data_source, DataSource::Fallback);
    }
}

#[tokio::test]
async fn test_no_filters_returns_curated_list_without_upstream_calls() {
    // con el upstream caído la lista curada igual responde: no hace llamadas
    let service = service(Arc::new(FailingFipe), 10);

    let outcome = service.search(&SearchFilters::default()).await;

    assert_eq!(outcome.source, ResultSource::Curated);
    assert!(!outcome.vehicles.is_empty());
    for vehicle in &outcome.vehicles {
        assert_eq!(vehicle.data_source, DataSource::Estimated);
    }
}

#[tokio::test]
async fn test_make_and_model_search_returns_live_records() {
    let service = service(Arc::new(StaticFipe), 20);

    let filters = SearchFilters {
        make: Some("Toyota".to_string()),
        model: Some("Corolla XEi".to_string()),
        ..Default::default()
    };
    let outcome = service.search(&filters).await;

    assert_eq!(outcome.source, ResultSource::FipeApi);
    assert_eq!(outcome.vehicles.len(), 2); // dos años disponibles
    let first = &outcome.vehicles[0];
    assert_eq!(first.id, "002104-2");
    assert_eq!(first.brand, "Toyota");
    assert_eq!(first.price_amount, Decimal::from(120_000));
    assert_eq!(first.data_source, DataSource::Live);
}

#[tokio::test]
async fn test_second_search_is_served_from_cache() {
    let service = service(Arc::new(StaticFipe), 20);
    let filters = SearchFilters {
        make: Some("Toyota".to_string()),
        model: Some("Corolla XEi".to_string()),
        ..Default::default()
    };

    let first = service.search(&filters).await;
    assert_eq!(first.source, ResultSource::FipeApi);

    let second = service.search(&filters).await;
    assert_eq!(second.source, ResultSource::Cache);
    for vehicle in &second.vehicles {
        assert_eq!(vehicle.data_source, DataSource::Cached);
    }
}

#[tokio::test]
async fn test_fuzzy_substring_match_resolves_brand() {
    let service = service(Arc::new(StaticFipe), 20);

    let outcome = service.search(&make_filters("toyo")).await;

    assert_eq!(outcome.source, ResultSource::FipeApi);
    assert!(!outcome.vehicles.is_empty());
    assert!(outcome.message.contains("Toyota"));
}

#[tokio::test]
async fn test_unknown_brand_falls_back() {
    let service = service(Arc::new(StaticFipe), 20);

    let outcome = service.search(&make_filters("Lada")).await;

    assert_eq!(outcome.source, ResultSource::Fallback);
    assert!(!outcome.vehicles.is_empty());
}

#[tokio::test]
async fn test_governor_denial_falls_back_without_retry() {
    // cupo cero: la primera llamada obligatoria ya es denegada
    let service = service(Arc::new(StaticFipe), 0);

    let outcome = service.search(&make_filters("Toyota")).await;

    assert_eq!(outcome.source, ResultSource::Fallback);
    for vehicle in &outcome.vehicles {
        assert_eq!(vehicle.data_source, DataSource::Fallback);
    }
}

#[tokio::test]
async fn test_search_by_code_hits_cache_on_repeat() {
    let service = service(Arc::new(StaticFipe), 20);
    let filters = SearchFilters {
        fipe_code: Some("002104-2".to_string()),
        ..Default::default()
    };

    let first = service.search(&filters).await;
    assert_eq!(first.source, ResultSource::FipeApi);
    assert_eq!(first.vehicles.len(), 1);

    let second = service.search(&filters).await;
    assert_eq!(second.source, ResultSource::Cache);
    assert_eq!(second.vehicles[0].data_source, DataSource::Cached);
}

#[tokio::test]
async fn test_market_stats_fall_back_when_upstream_is_down() {
    let service = service(Arc::new(FailingFipe), 10);

    let (stats, source) = service.market_stats(VehicleClass::Cars).await;

    assert_eq!(source, ResultSource::Fallback);
    assert!(stats["total_brands"].is_number());
}

#[tokio::test]
async fn test_market_stats_are_cached() {
    let service = service(Arc::new(StaticFipe), 20);

    let (_, first_source) = service.market_stats(VehicleClass::Cars).await;
    assert_eq!(first_source, ResultSource::FipeApi);

    let (stats, second_source) = service.market_stats(VehicleClass::Cars).await;
    assert_eq!(second_source, ResultSource::Cache);
    assert_eq!(stats["total_brands"], serde_json::json!(2));
}
