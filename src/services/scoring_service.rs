//! Motor de puntaje para comparación de vehículos
//!
//! Función pura y síncrona: sin I/O, sin aleatoriedad. Dado el mismo
//! input produce siempre el mismo resultado. El único error posible es
//! una cantidad de vehículos fuera de rango.

use num_traits::ToPrimitive;
use serde_json::{json, Value};

use crate::models::comparison::{ComparisonOutcome, ScoreBreakdown};
use crate::models::vehicle::VehicleRecord;
use crate::utils::errors::AppError;

pub const MIN_VEHICLES: usize = 2;
pub const MAX_VEHICLES: usize = 3;

/// Pesos de los criterios; suman 1.0
pub const ACCELERATION_WEIGHT: f64 = 0.30;
pub const ECONOMY_WEIGHT: f64 = 0.25;
pub const RECENCY_WEIGHT: f64 = 0.25;
pub const VALUE_WEIGHT: f64 = 0.20;

/// Motor de puntaje ponderado multi-criterio
pub struct ScoringService;

impl ScoringService {
    /// Comparar 2-3 vehículos y determinar un ganador.
    /// En caso de empate exacto gana el vehículo que aparece primero.
    pub fn score(vehicles: &[VehicleRecord]) -> Result<ComparisonOutcome, AppError> {
        if vehicles.len() < MIN_VEHICLES || vehicles.len() > MAX_VEHICLES {
            return Err(AppError::Validation(format!(
                "la comparación requiere entre {} y {} vehículos, se recibieron {}",
                MIN_VEHICLES,
                MAX_VEHICLES,
                vehicles.len()
            )));
        }

        let breakdowns: Vec<ScoreBreakdown> = vehicles.iter().map(Self::score_vehicle).collect();

        let mut winner_index = 0;
        let mut highest = breakdowns[0].total_score;
        for (index, breakdown) in breakdowns.iter().enumerate().skip(1) {
            // desigualdad estricta: el empate favorece al anterior
            if breakdown.total_score > highest {
                highest = breakdown.total_score;
                winner_index = index;
            }
        }

        Ok(ComparisonOutcome {
            winner: vehicles[winner_index].clone(),
            breakdowns,
        })
    }

    fn score_vehicle(vehicle: &VehicleRecord) -> ScoreBreakdown {
        let price = vehicle.price_amount.to_f64().unwrap_or(0.0);

        // menor tiempo 0-100 = mayor puntaje
        let acceleration_score = clamp_score(100.0 - vehicle.performance.accel_0_100_s * 10.0);
        // mayor km/l promedio = mayor puntaje
        let economy_score = clamp_score(
            (vehicle.consumption.city_kmpl + vehicle.consumption.highway_kmpl) / 2.0 * 5.0,
        );
        // más nuevo = mayor puntaje
        let recency_score = clamp_score((vehicle.year as f64 - 2000.0) / 24.0 * 100.0);
        // menor precio = mayor puntaje, en escala de miles de reales
        let value_score = clamp_score(100.0 - price / 1000.0);

        let total_score = acceleration_score * ACCELERATION_WEIGHT
            + economy_score * ECONOMY_WEIGHT
            + recency_score * RECENCY_WEIGHT
            + value_score * VALUE_WEIGHT;

        ScoreBreakdown {
            vehicle_id: vehicle.id.clone(),
            acceleration_score,
            economy_score,
            recency_score,
            value_score,
            total_score,
        }
    }

    /// Descripción de los criterios y sus pesos para la respuesta HTTP
    pub fn criteria() -> Value {
        json!({
            "acceleration": ACCELERATION_WEIGHT,
            "economy": ECONOMY_WEIGHT,
            "recency": RECENCY_WEIGHT,
            "value": VALUE_WEIGHT,
        })
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
