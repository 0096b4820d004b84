//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todos los valores tienen defaults razonables para desarrollo; en producción
//! se sobreescriben vía variables de entorno.

use std::env;
use std::str::FromStr;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    // Upstream FIPE
    pub fipe_base_url: String,
    pub request_timeout_secs: u64,
    /// Pausa entre llamadas secuenciales al upstream (drill-down marca → modelo → año)
    pub request_delay_ms: u64,
    // Rate limiting hacia el upstream
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    // TTLs del cache en memoria
    pub cache_ttl_brands_secs: u64,
    pub cache_ttl_models_secs: u64,
    pub cache_ttl_detail_secs: u64,
    pub cache_ttl_stats_secs: u64,
    /// Semilla para las estimaciones de datos faltantes; fija la secuencia en tests
    pub estimation_seed: Option<u64>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            fipe_base_url: "https://parallelum.com.br/fipe/api/v2".to_string(),
            request_timeout_secs: 10,
            request_delay_ms: 300,
            rate_limit_requests: 10,
            rate_limit_window_secs: 60,
            cache_ttl_brands_secs: 7200, // las marcas cambian poco
            cache_ttl_models_secs: 3600,
            cache_ttl_detail_secs: 3600,
            cache_ttl_stats_secs: 21600,
            estimation_seed: None,
        }
    }
}

impl EnvironmentConfig {
    /// Leer configuración desde variables de entorno con defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            fipe_base_url: env::var("FIPE_BASE_URL").unwrap_or(defaults.fipe_base_url),
            request_timeout_secs: env_or("FIPE_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            request_delay_ms: env_or("FIPE_REQUEST_DELAY_MS", defaults.request_delay_ms),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            cache_ttl_brands_secs: env_or("CACHE_TTL_BRANDS", defaults.cache_ttl_brands_secs),
            cache_ttl_models_secs: env_or("CACHE_TTL_MODELS", defaults.cache_ttl_models_secs),
            cache_ttl_detail_secs: env_or("CACHE_TTL_DETAIL", defaults.cache_ttl_detail_secs),
            cache_ttl_stats_secs: env_or("CACHE_TTL_STATS", defaults.cache_ttl_stats_secs),
            estimation_seed: env::var("ESTIMATION_SEED")
                .ok()
                .and_then(|seed| seed.parse().ok()),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
