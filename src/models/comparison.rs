//! Modelos de comparación de vehículos

use serde::{Deserialize, Serialize};

use super::vehicle::VehicleRecord;

/// Puntajes por criterio para un vehículo, todos en [0, 100]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub vehicle_id: String,
    pub acceleration_score: f64,
    pub economy_score: f64,
    pub recency_score: f64,
    pub value_score: f64,
    pub total_score: f64,
}

/// Resultado de una comparación; vive solo durante la respuesta
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonOutcome {
    pub breakdowns: Vec<ScoreBreakdown>,
    pub winner: VehicleRecord,
}
