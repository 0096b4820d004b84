//! Normalizador y enriquecedor de datos de vehículos
//!
//! Este módulo convierte los registros heterogéneos de FIPE (campos
//! faltantes, precios localizados, combustibles en portugués) en el
//! registro canónico `VehicleRecord`. Los datos ausentes se estiman con
//! heurísticas por nombre de modelo y edad del vehículo, acotadas a
//! rangos realistas; el registro resultante nunca queda parcial.
//!
//! La aleatoriedad de las estimaciones sale de un `StdRng` sembrable vía
//! configuración, de modo que los tests fijan la secuencia completa.

use chrono::{Datelike, Utc};
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::client::RawFipeVehicle;
use crate::models::vehicle::{
    clamp_model_year, ConsumptionSpec, DataSource, EngineSpec, FuelType, Origin, PerformanceSpec,
    Transmission, VehicleClass, VehicleRecord,
};
use crate::utils::price::{format_price_brl, parse_price_brl};

lazy_static! {
    static ref DISPLACEMENT: Regex = Regex::new(r"\b([1-9])\.([0-9])\b").unwrap();
}

/// Combustibles tal como aparecen en FIPE, en minúsculas
const FUEL_LOOKUP: &[(&str, FuelType)] = &[
    ("gasolina", FuelType::Gasoline),
    ("gas", FuelType::Gasoline),
    ("álcool", FuelType::Ethanol),
    ("alcool", FuelType::Ethanol),
    ("etanol", FuelType::Ethanol),
    ("diesel", FuelType::Diesel),
    ("flex", FuelType::Flex),
    ("elétrico", FuelType::Electric),
    ("eletrico", FuelType::Electric),
    ("híbrido", FuelType::Hybrid),
    ("hibrido", FuelType::Hybrid),
];

/// Fabricantes con producción nacional en Brasil
const DOMESTIC_BRANDS: &[&str] = &[
    "volkswagen",
    "chevrolet",
    "gm",
    "fiat",
    "ford",
    "renault",
    "gurgel",
    "troller",
    "agrale",
];

/// Precio base por marca para síntesis sin datos del upstream
const BRAND_BASE_PRICES: &[(&str, f64)] = &[
    ("volkswagen", 55_000.0),
    ("chevrolet", 50_000.0),
    ("fiat", 45_000.0),
    ("ford", 48_000.0),
    ("toyota", 65_000.0),
    ("honda", 60_000.0),
    ("hyundai", 55_000.0),
    ("nissan", 58_000.0),
    ("renault", 47_000.0),
    ("peugeot", 52_000.0),
];

/// Error del normalizador: solo aparece cuando el registro crudo no tiene
/// ni marca ni modelo identificables. Todo lo demás se degrada a estimación.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("registro sin marca ni modelo identificable")]
    MissingIdentity,
}

/// Normalizador con RNG sembrable para las estimaciones
pub struct VehicleNormalizer {
    rng: Mutex<StdRng>,
}

impl VehicleNormalizer {
    /// Crear el normalizador; con semilla la secuencia de estimaciones es fija
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Convertir un registro crudo de FIPE al registro canónico.
    /// Nunca retorna registros parciales: los campos ausentes se estiman.
    pub fn normalize(
        &self,
        raw: &RawFipeVehicle,
        class: VehicleClass,
    ) -> Result<VehicleRecord, NormalizationError> {
        let brand = raw
            .brand
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let model = raw
            .model
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if brand.is_none() && model.is_none() {
            return Err(NormalizationError::MissingIdentity);
        }

        let brand = brand.unwrap_or("Marca no informada").to_string();
        let model = model.unwrap_or("Modelo no informado").to_string();

        let mut estimated = false;

        let price_amount = match raw.price.as_deref().and_then(parse_price_brl) {
            Some(value) => value,
            None => {
                debug!("💱 Precio no parseable para {} {}, usando 0", brand, model);
                estimated = true;
                Decimal::ZERO
            }
        };
        let price_display = format_price_brl(price_amount);

        let current_year = Utc::now().year();
        let year = match raw.model_year {
            Some(year) => {
                let clamped = clamp_model_year(year);
                if clamped != year {
                    // FIPE codifica los cero kilómetro como año 32000
                    estimated = true;
                }
                clamped
            }
            None => {
                estimated = true;
                current_year
            }
        };

        let fuel_type = raw
            .fuel
            .as_deref()
            .map(normalize_fuel)
            .unwrap_or(FuelType::Flex);

        let transmission = self.estimate_transmission(&model);
        let engine = self.estimate_engine(&model, year, fuel_type, class);
        let performance = self.estimate_performance(&engine);
        let consumption = self.estimate_consumption(fuel_type, year);
        let doors = self.estimate_doors(&model, class);
        let seats = self.estimate_seats(&model, class);

        let id = match raw.code_fipe.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => format!("sintetico_{}", Uuid::new_v4().simple()),
        };

        Ok(VehicleRecord {
            id,
            origin: brand_origin(&brand),
            features: features_for(&price_amount),
            brand,
            model,
            year,
            price_amount,
            price_display,
            fuel_type,
            transmission,
            engine,
            performance,
            consumption,
            doors,
            seats,
            data_source: if estimated {
                DataSource::Estimated
            } else {
                DataSource::Live
            },
        })
    }

    /// Construir un registro plausible sin consultar el upstream.
    /// Usado por la lista de marcas populares y por los respaldos.
    pub fn synthesize(&self, brand: &str, model: &str, class: VehicleClass) -> VehicleRecord {
        let current_year = Utc::now().year();
        let offset: i32 = self.rng().gen_range(0..6);
        let year = current_year - offset;
        let fuel_type = FuelType::Flex;

        let price_amount = self.estimate_price(brand, model, year);
        let engine = self.estimate_engine(model, year, fuel_type, class);
        let performance = self.estimate_performance(&engine);
        let consumption = self.estimate_consumption(fuel_type, year);
        let doors = self.estimate_doors(model, class);
        let seats = self.estimate_seats(model, class);

        VehicleRecord {
            id: format!("{}_{}", slug(brand), slug(model)),
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            price_display: format_price_brl(price_amount),
            price_amount,
            fuel_type,
            transmission: self.estimate_transmission(model),
            engine,
            performance,
            consumption,
            doors,
            seats,
            features: features_for(&price_amount),
            origin: brand_origin(brand),
            data_source: DataSource::Estimated,
        }
    }

    fn estimate_transmission(&self, model: &str) -> Transmission {
        let lower = model.to_lowercase();
        if lower.contains("cvt") {
            return Transmission::Cvt;
        }
        if lower.contains("aut") {
            return Transmission::Automatic;
        }
        if lower.contains("mec") || lower.contains("manual") {
            return Transmission::Manual;
        }
        // Sin dato en el origen: la flota brasileña reciente es mayormente automática
        if self.rng().gen_bool(0.6) {
            Transmission::Automatic
        } else {
            Transmission::Manual
        }
    }

    fn estimate_engine(
        &self,
        model: &str,
        year: i32,
        fuel: FuelType,
        class: VehicleClass,
    ) -> EngineSpec {
        let lower = model.to_lowercase();
        let displacement = parse_displacement(&lower).unwrap_or(match class {
            VehicleClass::Cars => 1.6,
            VehicleClass::Motorcycles => 0.2,
            VehicleClass::Trucks => 4.0,
        });

        let mut base_power: f64 = match class {
            VehicleClass::Cars => 100.0,
            VehicleClass::Motorcycles => 18.0,
            VehicleClass::Trucks => 180.0,
        };
        if matches!(class, VehicleClass::Cars) {
            if lower.contains("sport") {
                base_power = 150.0;
            } else if lower.contains("turbo") {
                base_power = 130.0;
            }
            if displacement <= 1.0 {
                base_power = base_power.min(85.0);
            } else if displacement >= 2.0 {
                base_power = base_power.max(130.0);
            }
        }

        let current_year = Utc::now().year();
        let age_factor = (1.0 - (current_year - year) as f64 * 0.02).max(0.8);
        let fuel_factor = match fuel {
            FuelType::Diesel => 1.3,
            FuelType::Flex => 1.1,
            FuelType::Electric => 1.2,
            _ => 1.0,
        };

        let (min_power, max_power) = match class {
            VehicleClass::Cars => (50.0, 450.0),
            VehicleClass::Motorcycles => (8.0, 220.0),
            VehicleClass::Trucks => (120.0, 700.0),
        };
        let power_hp = (base_power * age_factor * fuel_factor).clamp(min_power, max_power);

        let cylinders = match class {
            VehicleClass::Motorcycles => {
                if displacement > 0.5 {
                    2
                } else {
                    1
                }
            }
            _ => {
                if displacement <= 1.1 {
                    3
                } else if displacement <= 2.1 {
                    4
                } else if displacement <= 3.1 {
                    6
                } else {
                    8
                }
            }
        };

        EngineSpec {
            torque_nm: power_hp * 1.3,
            power_hp,
            cylinders,
            displacement_liters: displacement,
        }
    }

    fn estimate_performance(&self, engine: &EngineSpec) -> PerformanceSpec {
        let jitter: f64 = self.rng().gen_range(0.0..2.0);
        PerformanceSpec {
            max_speed_kmh: (engine.power_hp * 1.8 + 100.0).clamp(90.0, 330.0),
            accel_0_100_s: (15.0 - engine.power_hp / 20.0 + jitter).clamp(2.5, 30.0),
        }
    }

    fn estimate_consumption(&self, fuel: FuelType, year: i32) -> ConsumptionSpec {
        // Los vehículos más nuevos son más eficientes
        let age_factor = if year > 2015 { 1.2 } else { 1.0 };
        let fuel_factor = match fuel {
            FuelType::Flex => 1.1,
            FuelType::Diesel => 1.3,
            FuelType::Hybrid => 1.6,
            FuelType::Electric => 2.0,
            _ => 1.0,
        };
        let base = 10.0 * age_factor * fuel_factor;

        let city_jitter: f64 = self.rng().gen_range(0.0..3.0);
        let highway_jitter: f64 = self.rng().gen_range(0.0..5.0);
        ConsumptionSpec {
            city_kmpl: (base + city_jitter).clamp(4.0, 35.0),
            highway_kmpl: (base + 2.0 + highway_jitter).clamp(5.0, 40.0),
        }
    }

    fn estimate_doors(&self, model: &str, class: VehicleClass) -> u8 {
        match class {
            VehicleClass::Motorcycles | VehicleClass::Trucks => 2,
            VehicleClass::Cars => {
                let lower = model.to_lowercase();
                if lower.contains("2p") || lower.contains("conversivel") {
                    2
                } else if lower.contains("4p") || lower.contains("sedan") {
                    4
                } else if self.rng().gen_bool(0.3) {
                    2
                } else {
                    4
                }
            }
        }
    }

    fn estimate_seats(&self, model: &str, class: VehicleClass) -> u8 {
        match class {
            VehicleClass::Motorcycles => 2,
            VehicleClass::Trucks => 3,
            VehicleClass::Cars => {
                let lower = model.to_lowercase();
                if lower.contains("van") || lower.contains("kombi") {
                    7
                } else {
                    5
                }
            }
        }
    }

    fn estimate_price(&self, brand: &str, model: &str, year: i32) -> Decimal {
        let lower_brand = brand.to_lowercase();
        let mut base = 45_000.0;
        for (name, price) in BRAND_BASE_PRICES {
            if lower_brand.contains(name) {
                base = *price;
                break;
            }
        }

        let lower_model = model.to_lowercase();
        if lower_model.contains("sport") {
            base *= 1.3;
        }
        if lower_model.contains("premium") {
            base *= 1.4;
        }

        let age = (Utc::now().year() - year).max(0) as f64;
        let depreciation = (1.0 - age * 0.08).max(0.3);
        let variation: f64 = 1.0 + self.rng().gen_range(-0.1..0.1);

        let value = (base * depreciation * variation).max(5_000.0);
        Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(0)
    }
}

/// Mapear un combustible FIPE al canónico; lo no reconocido cae a flex
pub fn normalize_fuel(label: &str) -> FuelType {
    let lower = label.trim().to_lowercase();
    for (name, fuel) in FUEL_LOOKUP {
        if lower.contains(name) {
            return *fuel;
        }
    }
    FuelType::Flex
}

/// Origen de fabricación según la lista estática de marcas nacionales
pub fn brand_origin(brand: &str) -> Origin {
    let lower = brand.to_lowercase();
    if DOMESTIC_BRANDS.iter().any(|name| lower.contains(name)) {
        Origin::Domestic
    } else {
        Origin::Imported
    }
}

/// Equipamiento por rango de precio, ordenado por relevancia
fn features_for(price: &Decimal) -> Vec<String> {
    let mut features: Vec<String> = [
        "Dirección hidráulica",
        "Vidrios eléctricos",
        "Cierre centralizado",
    ]
    .iter()
    .map(|feature| feature.to_string())
    .collect();

    if *price >= Decimal::from(40_000) {
        features.extend(
            ["Aire acondicionado", "Radio MP3", "Doble airbag"]
                .iter()
                .map(|feature| feature.to_string()),
        );
    }
    if *price >= Decimal::from(80_000) {
        features.extend(
            [
                "Central multimedia",
                "Cámara de reversa",
                "Sensores de estacionamiento",
                "Control de estabilidad",
            ]
            .iter()
            .map(|feature| feature.to_string()),
        );
    }
    features
}

/// Cilindrada declarada en el nombre del modelo (ej. "Onix 1.0 Turbo")
fn parse_displacement(model_lower: &str) -> Option<f64> {
    DISPLACEMENT
        .find(model_lower)
        .and_then(|m| m.as_str().parse().ok())
}

fn slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
