//! Configuración del cache

use std::time::Duration;

use crate::config::environment::EnvironmentConfig;

/// TTLs por tipo de operación
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    pub brands: Duration,
    pub models: Duration,
    pub years: Duration,
    pub detail: Duration,
    pub stats: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            brands: Duration::from_secs(7200),
            models: Duration::from_secs(3600),
            years: Duration::from_secs(3600),
            detail: Duration::from_secs(3600),
            stats: Duration::from_secs(21600),
        }
    }
}

impl CacheTtlConfig {
    /// Construir los TTLs desde la configuración del entorno
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        Self {
            brands: Duration::from_secs(config.cache_ttl_brands_secs),
            models: Duration::from_secs(config.cache_ttl_models_secs),
            years: Duration::from_secs(config.cache_ttl_models_secs),
            detail: Duration::from_secs(config.cache_ttl_detail_secs),
            stats: Duration::from_secs(config.cache_ttl_stats_secs),
        }
    }
}
