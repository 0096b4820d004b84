//! API endpoints
//!
//! Este módulo contiene los endpoints de la API.

pub mod cars;

use axum::Router;

use crate::state::AppState;

/// Crear el router principal de la API
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/api/cars", cars::create_cars_router())
}
