//! Orquestador de búsqueda inteligente
//!
//! Este módulo decide qué llamadas hacer al upstream FIPE y en qué orden:
//! código FIPE directo, drill-down marca → modelo → año, o lista curada de
//! marcas populares. Es el único componente que escribe al cache, para
//! mantener la política de cacheo centralizada.
//!
//! Contrato de degradación: si el upstream falla o el governor deniega en
//! un paso obligatorio, la búsqueda responde igual con datos sintéticos de
//! respaldo y `success: true`. Los fallos dentro del fan-out por modelo se
//! aíslan: se registran y se omiten sin abortar el resto.

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cache::{CacheTtlConfig, FipeCache};
use crate::client::{FipeApi, FipeBrand, FipeModel, FipeYear, UpstreamError};
use crate::models::vehicle::{
    ConsumptionSpec, DataSource, EngineSpec, FuelType, Origin, PerformanceSpec, Transmission,
    VehicleClass, VehicleRecord,
};
use crate::services::normalizer_service::{brand_origin, NormalizationError, VehicleNormalizer};
use crate::services::rate_governor::RateGovernor;
use crate::utils::errors::AppError;
use crate::utils::price::format_price_brl;

const DEFAULT_MODEL_LIMIT: usize = 10;
const DEFAULT_VERSION_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;

/// Marcas populares con un modelo representativo cada una; se usan cuando
/// la búsqueda llega sin filtros identificadores
const POPULAR_BRAND_MODELS: &[(&str, &str)] = &[
    ("Volkswagen", "Gol 1.0"),
    ("Chevrolet", "Onix 1.0"),
    ("Fiat", "Argo 1.0"),
    ("Ford", "Ka 1.5"),
    ("Toyota", "Corolla 2.0"),
    ("Honda", "Civic 2.0"),
    ("Hyundai", "HB20 1.0"),
    ("Nissan", "Versa 1.6"),
    ("Renault", "Kwid 1.0"),
    ("Peugeot", "208 1.6"),
];

/// Filtros de búsqueda; todos opcionales salvo la clase de vehículo
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub fipe_code: Option<String>,
    pub limit: Option<usize>,
    pub vehicle_class: VehicleClass,
}

/// Procedencia del conjunto de resultados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    FipeApi,
    Cache,
    Curated,
    Fallback,
}

/// Resultado de una búsqueda
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub vehicles: Vec<VehicleRecord>,
    pub source: ResultSource,
    pub message: String,
}

/// Fallos internos del orquestador; nunca llegan crudos al caller de
/// `search`, que los convierte en respaldo
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("límite de llamadas al upstream alcanzado")]
    RateLimited,

    #[error("marca '{0}' no encontrada en FIPE")]
    BrandNotFound(String),

    #[error("modelo '{0}' no encontrado para la marca")]
    ModelNotFound(String),

    #[error("sin años disponibles para el vehículo")]
    NoYearsAvailable,

    #[error("ningún vehículo pudo ser obtenido")]
    NoResults,
}

impl From<SearchError> for AppError {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::RateLimited => AppError::RateLimitExceeded,
            SearchError::BrandNotFound(make) => {
                AppError::NotFound(format!("Marca '{}' no encontrada", make))
            }
            SearchError::ModelNotFound(model) => {
                AppError::NotFound(format!("Modelo '{}' no encontrado", model))
            }
            other => AppError::ExternalApi(other.to_string()),
        }
    }
}

/// Orquestador de búsqueda con sus colaboradores inyectados
pub struct SearchService {
    client: Arc<dyn FipeApi>,
    cache: Arc<FipeCache>,
    governor: Arc<RateGovernor>,
    normalizer: Arc<VehicleNormalizer>,
    ttl: CacheTtlConfig,
    request_delay: Duration,
}

impl SearchService {
    pub fn new(
        client: Arc<dyn FipeApi>,
        cache: Arc<FipeCache>,
        governor: Arc<RateGovernor>,
        normalizer: Arc<VehicleNormalizer>,
        ttl: CacheTtlConfig,
        request_delay: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            governor,
            normalizer,
            ttl,
            request_delay,
        }
    }

    /// Búsqueda inteligente; primer filtro identificador que matchea gana.
    /// Nunca falla: el error total degrada a datos de respaldo.
    pub async fn search(&self, filters: &SearchFilters) -> SearchOutcome {
        info!("🔍 Iniciando búsqueda inteligente con filtros: {:?}", filters);

        let fipe_code = filters.fipe_code.as_deref().map(str::trim);
        let make = filters.make.as_deref().map(str::trim);
        let model = filters.model.as_deref().map(str::trim);

        let result = match (fipe_code, make, model) {
            (Some(code), _, _) if !code.is_empty() => {
                self.search_by_code(filters.vehicle_class, code).await
            }
            (_, Some(make), Some(model)) if !make.is_empty() && !model.is_empty() => {
                self.search_by_make_model(filters, make, model).await
            }
            (_, Some(make), _) if !make.is_empty() => self.search_by_make(filters, make).await,
            _ => return self.popular_brands(filters),
        };

        match result {
            Ok(mut outcome) => {
                outcome.vehicles = apply_post_filters(outcome.vehicles, filters);
                outcome
            }
            Err(error) => {
                warn!("🛡️ Búsqueda degradada a respaldo: {}", error);
                self.fallback_outcome(filters)
            }
        }
    }

    /// Lista de marcas (con cache); usada por el endpoint de marcas y las
    /// estadísticas de mercado
    pub async fn brands(
        &self,
        class: VehicleClass,
    ) -> Result<(Vec<FipeBrand>, ResultSource), SearchError> {
        let key = FipeCache::brands_key(class);
        if let Some(brands) = self.cache.get::<Vec<FipeBrand>>(&key).await {
            return Ok((brands, ResultSource::Cache));
        }

        self.acquire().await?;
        let brands = self.client.fetch_brands(class).await?;
        self.cache.set(&key, &brands, self.ttl.brands).await;
        Ok((brands, ResultSource::FipeApi))
    }

    /// Estadísticas agregadas del mercado brasileño; con cache de larga
    /// duración y respaldo estático ante fallo total del upstream
    pub async fn market_stats(&self, class: VehicleClass) -> (Value, ResultSource) {
        let key = FipeCache::stats_key(class);
        if let Some(stats) = self.cache.get::<Value>(&key).await {
            return (stats, ResultSource::Cache);
        }

        match self.brands(class).await {
            Ok((brands, _)) => {
                let stats = build_market_stats(&brands);
                self.cache.set(&key, &stats, self.ttl.stats).await;
                (stats, ResultSource::FipeApi)
            }
            Err(error) => {
                warn!("🛡️ Estadísticas degradadas a respaldo: {}", error);
                (fallback_market_stats(), ResultSource::Fallback)
            }
        }
    }

    // ── Rutas de búsqueda ───────────────────────────────────────────────

    async fn search_by_code(
        &self,
        class: VehicleClass,
        fipe_code: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let key = FipeCache::code_key(class, fipe_code);
        if let Some(vehicles) = self.cache.get::<Vec<VehicleRecord>>(&key).await {
            return Ok(SearchOutcome {
                vehicles: mark_cached(vehicles),
                source: ResultSource::Cache,
                message: format!("Vehículo {} obtenido desde cache", fipe_code),
            });
        }

        self.acquire().await?;
        let years = self.client.fetch_years_by_code(class, fipe_code).await?;
        let year = years.first().ok_or(SearchError::NoYearsAvailable)?;

        self.acquire().await?;
        let raw = self
            .client
            .fetch_detail_by_code(class, fipe_code, &year.code)
            .await?;
        let record = self.normalizer.normalize(&raw, class)?;

        let vehicles = vec![record];
        self.cache.set(&key, &vehicles, self.ttl.detail).await;

        Ok(SearchOutcome {
            vehicles,
            source: ResultSource::FipeApi,
            message: format!("Vehículo con código FIPE {} encontrado", fipe_code),
        })
    }

    async fn search_by_make_model(
        &self,
        filters: &SearchFilters,
        make: &str,
        model_query: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let class = filters.vehicle_class;

        let (brands, _) = self.brands(class).await?;
        let brand = best_match(&brands, make, |brand| brand.name.as_str())
            .ok_or_else(|| SearchError::BrandNotFound(make.to_string()))?
            .clone();

        let models = self.models(class, &brand.code).await?;
        let model = best_match(&models, model_query, |model| model.name.as_str())
            .ok_or_else(|| SearchError::ModelNotFound(model_query.to_string()))?
            .clone();

        let years = self.years(class, &brand.code, &model.code).await?;
        if years.is_empty() {
            return Err(SearchError::NoYearsAvailable);
        }

        // FIPE devuelve los años del más reciente al más antiguo
        let limit = filters.limit.unwrap_or(DEFAULT_VERSION_LIMIT).clamp(1, MAX_LIMIT);
        let mut vehicles = Vec::new();
        for year in years.iter().take(limit) {
            match self
                .vehicle_detail(class, &brand.code, &model.code, &year.code)
                .await
            {
                Ok((record, from_cache)) => {
                    if !from_cache && !self.request_delay.is_zero() {
                        // pausa entre llamadas secuenciales para cuidar el cupo del upstream
                        sleep(self.request_delay).await;
                    }
                    vehicles.push(record);
                }
                Err(SearchError::RateLimited) => {
                    warn!("🚦 Cupo agotado durante el drill-down, corto en {} versiones", vehicles.len());
                    break;
                }
                Err(error) => {
                    warn!("⚠️ Versión {} omitida: {}", year.name, error);
                }
            }
        }

        if vehicles.is_empty() {
            return Err(SearchError::NoResults);
        }

        let message = format!(
            "{} versiones encontradas para {} {}",
            vehicles.len(),
            brand.name,
            model.name
        );
        Ok(outcome_from_records(vehicles, message))
    }

    async fn search_by_make(
        &self,
        filters: &SearchFilters,
        make: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let class = filters.vehicle_class;

        let (brands, _) = self.brands(class).await?;
        let brand = best_match(&brands, make, |brand| brand.name.as_str())
            .ok_or_else(|| SearchError::BrandNotFound(make.to_string()))?
            .clone();

        let models = self.models(class, &brand.code).await?;
        let limit = filters.limit.unwrap_or(DEFAULT_MODEL_LIMIT).clamp(1, MAX_LIMIT);
        let selected: Vec<FipeModel> = models.into_iter().take(limit).collect();

        // fan-out independiente por modelo; un fallo no aborta a los demás
        let fetches = selected
            .iter()
            .map(|model| self.most_recent_detail(class, &brand.code, model));
        let results = join_all(fetches).await;

        let mut vehicles = Vec::new();
        for (model, result) in selected.iter().zip(results) {
            match result {
                Ok(record) => vehicles.push(record),
                Err(error) => warn!("⚠️ Modelo {} omitido: {}", model.name, error),
            }
        }

        if vehicles.is_empty() {
            return Err(SearchError::NoResults);
        }

        let message = format!(
            "{} vehículos encontrados para {}",
            vehicles.len(),
            brand.name
        );
        Ok(outcome_from_records(vehicles, message))
    }

    /// Sin filtros identificadores: lista curada, cero llamadas de detalle
    fn popular_brands(&self, filters: &SearchFilters) -> SearchOutcome {
        let limit = filters.limit.unwrap_or(DEFAULT_MODEL_LIMIT).clamp(1, MAX_LIMIT);
        let vehicles: Vec<VehicleRecord> = POPULAR_BRAND_MODELS
            .iter()
            .take(limit)
            .map(|(brand, model)| {
                self.normalizer
                    .synthesize(brand, model, filters.vehicle_class)
            })
            .collect();

        SearchOutcome {
            vehicles,
            source: ResultSource::Curated,
            message: "Marcas populares en Brasil".to_string(),
        }
    }

    fn fallback_outcome(&self, filters: &SearchFilters) -> SearchOutcome {
        info!("🛡️ Generando datos de respaldo");
        let limit = filters.limit.unwrap_or(DEFAULT_MODEL_LIMIT).clamp(1, MAX_LIMIT);
        SearchOutcome {
            vehicles: fallback_vehicles().into_iter().take(limit).collect(),
            source: ResultSource::Fallback,
            message: "Datos de ejemplo (respaldo)".to_string(),
        }
    }

    // ── Pasos con cache + governor ──────────────────────────────────────

    async fn acquire(&self) -> Result<(), SearchError> {
        if self.governor.try_acquire().await {
            Ok(())
        } else {
            Err(SearchError::RateLimited)
        }
    }

    async fn models(
        &self,
        class: VehicleClass,
        brand_id: &str,
    ) -> Result<Vec<FipeModel>, SearchError> {
        let key = FipeCache::models_key(class, brand_id);
        if let Some(models) = self.cache.get::<Vec<FipeModel>>(&key).await {
            return Ok(models);
        }

        self.acquire().await?;
        let models = self.client.fetch_models(class, brand_id).await?;
        self.cache.set(&key, &models, self.ttl.models).await;
        Ok(models)
    }

    async fn years(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
    ) -> Result<Vec<FipeYear>, SearchError> {
        let key = FipeCache::years_key(class, brand_id, model_id);
        if let Some(years) = self.cache.get::<Vec<FipeYear>>(&key).await {
            return Ok(years);
        }

        self.acquire().await?;
        let years = self.client.fetch_years(class, brand_id, model_id).await?;
        self.cache.set(&key, &years, self.ttl.years).await;
        Ok(years)
    }

    /// Detalle normalizado de un vehículo; el cache guarda el registro ya
    /// canónico y los hits se marcan con procedencia `cached`
    async fn vehicle_detail(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
        year_id: &str,
    ) -> Result<(VehicleRecord, bool), SearchError> {
        let key = FipeCache::detail_key(class, brand_id, model_id, year_id);
        if let Some(record) = self.cache.get::<VehicleRecord>(&key).await {
            return Ok((record.with_data_source(DataSource::Cached), true));
        }

        self.acquire().await?;
        let raw = self
            .client
            .fetch_detail(class, brand_id, model_id, year_id)
            .await?;
        let record = self.normalizer.normalize(&raw, class)?;
        self.cache.set(&key, &record, self.ttl.detail).await;
        Ok((record, false))
    }

    async fn most_recent_detail(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model: &FipeModel,
    ) -> Result<VehicleRecord, SearchError> {
        let years = self.years(class, brand_id, &model.code).await?;
        let year = years.first().ok_or(SearchError::NoYearsAvailable)?;
        let (record, _) = self
            .vehicle_detail(class, brand_id, &model.code, &year.code)
            .await?;
        Ok(record)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Matching difuso de marcas/modelos: primero igualdad exacta sin
/// distinguir mayúsculas, después contención de substring en cualquier
/// dirección con el nombre más corto como desempate determinista.
fn best_match<'a, T>(items: &'a [T], query: &str, name: impl Fn(&T) -> &str) -> Option<&'a T> {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return None;
    }

    if let Some(exact) = items
        .iter()
        .find(|item| name(item).to_lowercase() == query_lower)
    {
        return Some(exact);
    }

    items
        .iter()
        .filter(|item| {
            let candidate = name(item).to_lowercase();
            candidate.contains(&query_lower) || query_lower.contains(&candidate)
        })
        .min_by_key(|item| name(item).len())
}

fn apply_post_filters(vehicles: Vec<VehicleRecord>, filters: &SearchFilters) -> Vec<VehicleRecord> {
    vehicles
        .into_iter()
        .filter(|vehicle| {
            filters.year.map_or(true, |year| vehicle.year == year)
                && filters
                    .fuel_type
                    .map_or(true, |fuel| vehicle.fuel_type == fuel)
                && filters
                    .transmission
                    .map_or(true, |transmission| vehicle.transmission == transmission)
        })
        .collect()
}

fn mark_cached(vehicles: Vec<VehicleRecord>) -> Vec<VehicleRecord> {
    vehicles
        .into_iter()
        .map(|vehicle| vehicle.with_data_source(DataSource::Cached))
        .collect()
}

/// El conjunto completo vino del cache → la procedencia del resultado es cache
fn outcome_from_records(vehicles: Vec<VehicleRecord>, message: String) -> SearchOutcome {
    let source = if vehicles
        .iter()
        .all(|vehicle| vehicle.data_source == DataSource::Cached)
    {
        ResultSource::Cache
    } else {
        ResultSource::FipeApi
    };
    SearchOutcome {
        vehicles,
        source,
        message,
    }
}

fn build_market_stats(brands: &[FipeBrand]) -> Value {
    let popular: Vec<Value> = brands
        .iter()
        .filter(|brand| {
            POPULAR_BRAND_MODELS
                .iter()
                .any(|(name, _)| brand.name.to_lowercase().contains(&name.to_lowercase()))
        })
        .take(10)
        .map(|brand| {
            json!({
                "name": brand.name,
                "code": brand.code,
                "category": brand_origin(&brand.name),
            })
        })
        .collect();

    let domestic = popular
        .iter()
        .filter(|brand| brand["category"] == json!(Origin::Domestic))
        .count();

    json!({
        "total_brands": brands.len(),
        "market_segments": {
            "domestic": domestic,
            "imported": popular.len().saturating_sub(domestic),
        },
        "popular_brands": popular,
        "price_ranges": {
            "economico": "R$ 20.000 - R$ 50.000",
            "medio": "R$ 50.000 - R$ 100.000",
            "premium": "R$ 100.000 - R$ 200.000",
            "luxury": "R$ 200.000+",
        },
        "fuel_types": {
            "flex": "Flexible (Gasolina/Etanol)",
            "gasoline": "Gasolina",
            "diesel": "Diesel",
            "electric": "Eléctrico/Híbrido",
        },
        "coverage": "Brasil - Tabla FIPE oficial",
    })
}

fn fallback_market_stats() -> Value {
    json!({
        "total_brands": 50,
        "market_segments": { "domestic": 4, "imported": 10 },
        "popular_brands": [],
        "coverage": "Brasil - Tabla FIPE oficial",
    })
}

/// Respaldo sintético fijo; se entrega con `success: true` cuando el
/// upstream está caído por completo
fn fallback_vehicles() -> Vec<VehicleRecord> {
    vec![
        VehicleRecord {
            id: "fallback_1".to_string(),
            brand: "Volkswagen".to_string(),
            model: "Gol 1.0".to_string(),
            year: 2023,
            price_amount: Decimal::from(45_000),
            price_display: format_price_brl(Decimal::from(45_000)),
            fuel_type: FuelType::Flex,
            transmission: Transmission::Manual,
            engine: EngineSpec {
                power_hp: 80.0,
                torque_nm: 110.0,
                cylinders: 3,
                displacement_liters: 1.0,
            },
            performance: PerformanceSpec {
                max_speed_kmh: 170.0,
                accel_0_100_s: 12.5,
            },
            consumption: ConsumptionSpec {
                city_kmpl: 12.0,
                highway_kmpl: 15.0,
            },
            doors: 4,
            seats: 5,
            features: vec![
                "Dirección hidráulica".to_string(),
                "Vidrios eléctricos".to_string(),
            ],
            origin: Origin::Domestic,
            data_source: DataSource::Fallback,
        },
        VehicleRecord {
            id: "fallback_2".to_string(),
            brand: "Chevrolet".to_string(),
            model: "Onix 1.0".to_string(),
            year: 2023,
            price_amount: Decimal::from(48_000),
            price_display: format_price_brl(Decimal::from(48_000)),
            fuel_type: FuelType::Flex,
            transmission: Transmission::Manual,
            engine: EngineSpec {
                power_hp: 82.0,
                torque_nm: 112.0,
                cylinders: 3,
                displacement_liters: 1.0,
            },
            performance: PerformanceSpec {
                max_speed_kmh: 175.0,
                accel_0_100_s: 12.8,
            },
            consumption: ConsumptionSpec {
                city_kmpl: 13.0,
                highway_kmpl: 16.0,
            },
            doors: 4,
            seats: 5,
            features: vec![
                "Aire acondicionado".to_string(),
                "Central multimedia".to_string(),
            ],
            origin: Origin::Domestic,
            data_source: DataSource::Fallback,
        },
        VehicleRecord {
            id: "fallback_3".to_string(),
            brand: "Hyundai".to_string(),
            model: "HB20 1.0".to_string(),
            year: 2022,
            price_amount: Decimal::from(52_000),
            price_display: format_price_brl(Decimal::from(52_000)),
            fuel_type: FuelType::Flex,
            transmission: Transmission::Automatic,
            engine: EngineSpec {
                power_hp: 80.0,
                torque_nm: 105.0,
                cylinders: 3,
                displacement_liters: 1.0,
            },
            performance: PerformanceSpec {
                max_speed_kmh: 172.0,
                accel_0_100_s: 13.1,
            },
            consumption: ConsumptionSpec {
                city_kmpl: 12.5,
                highway_kmpl: 15.5,
            },
            doors: 4,
            seats: 5,
            features: vec![
                "Aire acondicionado".to_string(),
                "Cámara de reversa".to_string(),
            ],
            origin: Origin::Imported,
            data_source: DataSource::Fallback,
        },
    ]
}
