//! Modelo canónico de vehículo
//!
//! Este módulo define el registro canónico que produce el normalizador a
//! partir de los datos heterogéneos de FIPE. El motor de comparación asume
//! que todos los sub-objetos están siempre completos: el normalizador nunca
//! entrega registros parciales.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Clase de vehículo soportada por la tabla FIPE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Cars,
    Motorcycles,
    Trucks,
}

impl VehicleClass {
    /// Segmento de URL que usa la API FIPE para esta clase
    pub fn as_segment(&self) -> &'static str {
        match self {
            VehicleClass::Cars => "cars",
            VehicleClass::Motorcycles => "motorcycles",
            VehicleClass::Trucks => "trucks",
        }
    }
}

/// Tipo de combustible canónico
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Gasoline,
    Ethanol,
    Diesel,
    Flex,
    Electric,
    Hybrid,
}

/// Tipo de transmisión
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
}

/// Origen de fabricación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Domestic,
    Imported,
}

/// Procedencia del dato; los tests y el frontend la usan para distinguir
/// datos frescos de estimaciones y respaldos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cached,
    Estimated,
    Fallback,
}

/// Motor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSpec {
    pub power_hp: f64,
    pub torque_nm: f64,
    pub cylinders: u8,
    pub displacement_liters: f64,
}

/// Desempeño
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSpec {
    pub max_speed_kmh: f64,
    pub accel_0_100_s: f64,
}

/// Consumo en km por litro
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionSpec {
    pub city_kmpl: f64,
    pub highway_kmpl: f64,
}

/// Registro canónico de vehículo, post-normalización
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Estable por código FIPE, o sintético cuando el código no existe
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Monto en reales; `price_display` siempre se deriva de este valor
    pub price_amount: Decimal,
    pub price_display: String,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub engine: EngineSpec,
    pub performance: PerformanceSpec,
    pub consumption: ConsumptionSpec,
    pub doors: u8,
    pub seats: u8,
    /// Orden = relevancia
    pub features: Vec<String>,
    pub origin: Origin,
    pub data_source: DataSource,
}

impl VehicleRecord {
    /// Marcar la procedencia del registro
    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }
}

/// Rango plausible de años de modelo (1950 hasta año actual + 1)
pub fn plausible_year_bounds() -> (i32, i32) {
    (1950, Utc::now().year() + 1)
}

/// Acotar un año de modelo al rango plausible.
/// FIPE codifica los cero kilómetro como año 32000.
pub fn clamp_model_year(year: i32) -> i32 {
    let (min_year, max_year) = plausible_year_bounds();
    year.clamp(min_year, max_year)
}
