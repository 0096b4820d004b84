//! API de vehículos FIPE
//!
//! Este módulo contiene los handlers de búsqueda, comparación y
//! administración del cache. La búsqueda nunca responde error por fallos
//! del upstream: degrada a datos de respaldo con `success: true` y deja
//! la procedencia en el campo `source` para que el frontend pueda
//! señalizar datos degradados.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::dto::car_dto::{
    ClassQuery, CompareRequest, CompareResponse, ComparisonMeta, MakesResponse, SearchQuery,
    SearchResponse,
};
use crate::services::scoring_service::ScoringService;
use crate::services::search_service::SearchFilters;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Crear el router de vehículos
pub fn create_cars_router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_cars))
        .route("/makes", get(get_makes))
        .route("/fipe/:fipe_code", get(get_by_fipe_code))
        .route("/compare", post(compare_cars))
        .route("/stats/brazil", get(market_stats))
        .route("/cache/stats", get(cache_stats))
        .route("/cache", delete(clear_cache))
}

/// GET /api/cars/search - Búsqueda inteligente con filtros
async fn search_cars(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    log::info!("🔍 GET /api/cars/search con filtros: {:?}", query);

    let filters = query.into_filters();
    let outcome = state.search_service.search(&filters).await;

    Json(SearchResponse {
        success: true,
        total: outcome.vehicles.len(),
        data: outcome.vehicles,
        source: outcome.source,
        message: outcome.message,
    })
}

/// GET /api/cars/makes - Lista de marcas (cacheada)
async fn get_makes(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<Json<MakesResponse>, AppError> {
    log::info!("🏷️ GET /api/cars/makes ({:?})", query.vehicle_class);

    let (brands, source) = state.search_service.brands(query.vehicle_class).await?;

    Ok(Json(MakesResponse {
        success: true,
        total: brands.len(),
        data: brands,
        source,
        message: "Marcas obtenidas exitosamente".to_string(),
    }))
}

/// GET /api/cars/fipe/:fipe_code - Búsqueda directa por código FIPE
async fn get_by_fipe_code(
    State(state): State<AppState>,
    Path(fipe_code): Path<String>,
    Query(query): Query<ClassQuery>,
) -> Json<SearchResponse> {
    log::info!("🔎 GET /api/cars/fipe/{}", fipe_code);

    let filters = SearchFilters {
        fipe_code: Some(fipe_code),
        vehicle_class: query.vehicle_class,
        ..Default::default()
    };
    let outcome = state.search_service.search(&filters).await;

    Json(SearchResponse {
        success: true,
        total: outcome.vehicles.len(),
        data: outcome.vehicles,
        source: outcome.source,
        message: outcome.message,
    })
}

/// POST /api/cars/compare - Comparar 2-3 vehículos y determinar ganador
async fn compare_cars(
    State(_state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, AppError> {
    log::info!("⚖️ POST /api/cars/compare con {} vehículos", request.cars.len());

    request
        .validate()
        .map_err(|error| AppError::Validation(error.to_string()))?;

    let outcome = ScoringService::score(&request.cars)?;

    Ok(Json(CompareResponse {
        success: true,
        cars: request.cars,
        winner: outcome.winner,
        comparison: ComparisonMeta {
            criteria: ScoringService::criteria(),
            scores: outcome.breakdowns,
            timestamp: Utc::now(),
        },
    }))
}

/// GET /api/cars/stats/brazil - Estadísticas del mercado brasileño
async fn market_stats(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Json<serde_json::Value> {
    log::info!("📊 GET /api/cars/stats/brazil");

    let (stats, source) = state.search_service.market_stats(query.vehicle_class).await;

    Json(json!({
        "success": true,
        "data": stats,
        "source": source,
        "message": "Estadísticas del mercado brasileño",
    }))
}

/// GET /api/cars/cache/stats - Contadores del cache TTL
async fn cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.cache.stats().await;
    let entries = state.cache.size().await;
    let remaining = state.governor.remaining().await;

    Json(json!({
        "success": true,
        "data": {
            "entries": entries,
            "counters": stats,
            "upstream_calls_remaining": remaining,
        },
    }))
}

/// DELETE /api/cars/cache - Limpiar el cache (administrativo)
async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.cache.clear().await;
    log::info!("🗑️ Cache limpiado por petición administrativa");

    Json(json!({
        "success": true,
        "message": "Cache limpiado exitosamente",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
