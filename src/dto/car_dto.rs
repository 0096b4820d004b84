//! DTOs de la API de vehículos

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::client::FipeBrand;
use crate::models::comparison::ScoreBreakdown;
use crate::models::vehicle::{FuelType, Transmission, VehicleClass, VehicleRecord};
use crate::services::search_service::{ResultSource, SearchFilters};

// Query de búsqueda inteligente
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub fipe_code: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "type", default)]
    pub vehicle_class: VehicleClass,
}

impl SearchQuery {
    pub fn into_filters(self) -> SearchFilters {
        SearchFilters {
            make: self.make,
            model: self.model,
            year: self.year,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            fipe_code: self.fipe_code,
            limit: self.limit,
            vehicle_class: self.vehicle_class,
        }
    }
}

// Query que solo selecciona la clase de vehículo
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassQuery {
    #[serde(rename = "type", default)]
    pub vehicle_class: VehicleClass,
}

// Response de búsqueda
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: Vec<VehicleRecord>,
    pub total: usize,
    pub source: ResultSource,
    pub message: String,
}

// Response de marcas
#[derive(Debug, Serialize)]
pub struct MakesResponse {
    pub success: bool,
    pub data: Vec<FipeBrand>,
    pub total: usize,
    pub source: ResultSource,
    pub message: String,
}

// Request de comparación
#[derive(Debug, Deserialize, Validate)]
pub struct CompareRequest {
    #[validate(length(
        min = 2,
        max = 3,
        message = "se requieren entre 2 y 3 vehículos para comparar"
    ))]
    pub cars: Vec<VehicleRecord>,
}

// Response de comparación
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub cars: Vec<VehicleRecord>,
    pub winner: VehicleRecord,
    pub comparison: ComparisonMeta,
}

#[derive(Debug, Serialize)]
pub struct ComparisonMeta {
    pub criteria: Value,
    pub scores: Vec<ScoreBreakdown>,
    pub timestamp: DateTime<Utc>,
}
