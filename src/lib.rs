//! Comparador de Vehículos FIPE
//!
//! Backend que busca precios de vehículos brasileños en la tabla FIPE,
//! normaliza los datos heterogéneos del upstream y compara 2-3 vehículos
//! con un puntaje ponderado multi-criterio.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
