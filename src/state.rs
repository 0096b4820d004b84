//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El cache y el governor son singletons a
//! nivel proceso, construidos explícitamente al arranque e inyectados en
//! el orquestador — nada de estado global implícito.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheTtlConfig, FipeCache};
use crate::client::{FipeApi, FipeClient};
use crate::config::environment::EnvironmentConfig;
use crate::services::normalizer_service::VehicleNormalizer;
use crate::services::rate_governor::RateGovernor;
use crate::services::search_service::SearchService;
use crate::utils::errors::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub cache: Arc<FipeCache>,
    pub governor: Arc<RateGovernor>,
    pub search_service: Arc<SearchService>,
}

impl AppState {
    /// Construir el estado con el cliente FIPE real
    pub fn new(config: EnvironmentConfig) -> Result<Self, AppError> {
        let client = FipeClient::new(&config)
            .map_err(|error| AppError::Internal(format!("cliente FIPE: {}", error)))?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Construir el estado con un cliente inyectado (dobles en tests)
    pub fn with_client(config: EnvironmentConfig, client: Arc<dyn FipeApi>) -> Self {
        let cache = Arc::new(FipeCache::new());
        let governor = Arc::new(RateGovernor::from_environment(&config));
        let normalizer = Arc::new(VehicleNormalizer::new(config.estimation_seed));

        let search_service = Arc::new(SearchService::new(
            client,
            cache.clone(),
            governor.clone(),
            normalizer,
            CacheTtlConfig::from_environment(&config),
            Duration::from_millis(config.request_delay_ms),
        ));

        Self {
            config,
            cache,
            governor,
            search_service,
        }
    }
}
