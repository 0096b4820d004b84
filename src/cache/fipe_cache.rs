//! Cache TTL en memoria para datos FIPE
//!
//! Única fuente de "¿ya preguntamos esto hace poco?". Las entradas expiran
//! de forma perezosa: un `get` sobre una entrada vencida la elimina y cuenta
//! como miss, sin hilos de limpieza de fondo. Las operaciones nunca fallan.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::vehicle::VehicleClass;

/// Entrada del cache con expiración absoluta
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Estadísticas del cache
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct FipeCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries_created: u64,
    pub entries_expired: u64,
}

/// Cache TTL en memoria
///
/// Sin límite de tamaño ni LRU: el universo de marcas/modelos/años de FIPE
/// acota el espacio de claves.
pub struct FipeCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<FipeCacheStats>,
}

impl Default for FipeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FipeCache {
    /// Crear un cache vacío
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(FipeCacheStats::default()),
        }
    }

    /// Obtener un valor del cache; una entrada vencida se elimina y cuenta como miss
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        let cached = entries
            .get(key)
            .map(|entry| (entry.expires_at, entry.value.clone()));

        match cached {
            Some((expires_at, _)) if now >= expires_at => {
                entries.remove(key);
                stats.entries_expired += 1;
                stats.misses += 1;
                debug!("⏰ Cache MISS (expirado) para clave: {}", key);
                None
            }
            Some((_, value)) => {
                stats.hits += 1;
                debug!("📥 Cache HIT para clave: {}", key);
                match serde_json::from_value(value) {
                    Ok(deserialized) => Some(deserialized),
                    Err(e) => {
                        warn!("⚠️ Payload de cache inválido para clave {}: {}", key, e);
                        entries.remove(key);
                        None
                    }
                }
            }
            None => {
                stats.misses += 1;
                debug!("❌ Cache MISS para clave: {}", key);
                None
            }
        }
    }

    /// Guardar un valor con TTL; un fallo de serialización se registra y se ignora
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠️ No se pudo serializar el valor para clave {}: {}", key, e);
                return;
            }
        };

        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: payload,
                expires_at: Instant::now() + ttl,
            },
        );
        stats.entries_created += 1;
        debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl.as_secs());
    }

    /// Limpiar todo el cache
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        info!("🧹 Cache limpiado completamente");
    }

    /// Tamaño actual del cache
    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Obtener estadísticas del cache
    pub async fn stats(&self) -> FipeCacheStats {
        self.stats.read().await.clone()
    }

    // Claves deterministas por operación

    fn make_key(prefix: &str, identifier: &str) -> String {
        format!("fipe:{}:{}", prefix, identifier)
    }

    pub fn brands_key(class: VehicleClass) -> String {
        Self::make_key("brands", class.as_segment())
    }

    pub fn models_key(class: VehicleClass, brand_id: &str) -> String {
        Self::make_key("models", &format!("{}:{}", class.as_segment(), brand_id))
    }

    pub fn years_key(class: VehicleClass, brand_id: &str, model_id: &str) -> String {
        Self::make_key(
            "years",
            &format!("{}:{}:{}", class.as_segment(), brand_id, model_id),
        )
    }

    pub fn detail_key(class: VehicleClass, brand_id: &str, model_id: &str, year_id: &str) -> String {
        Self::make_key(
            "detail",
            &format!("{}:{}:{}:{}", class.as_segment(), brand_id, model_id, year_id),
        )
    }

    pub fn code_key(class: VehicleClass, fipe_code: &str) -> String {
        Self::make_key("code", &format!("{}:{}", class.as_segment(), fipe_code))
    }

    pub fn stats_key(class: VehicleClass) -> String {
        Self::make_key("market_stats", class.as_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        total: u32,
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let cache = FipeCache::new();
        let payload = Payload {
            name: "marcas".to_string(),
            total: 87,
        };

        cache.set("clave", &payload, Duration::from_secs(60)).await;

        let cached: Option<Payload> = cache.get("clave").await;
        assert_eq!(cached, Some(payload));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries_created, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_acts_as_miss() {
        let cache = FipeCache::new();
        let payload = Payload {
            name: "modelos".to_string(),
            total: 12,
        };

        cache.set("clave", &payload, Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let cached: Option<Payload> = cache.get("clave").await;
        assert_eq!(cached, None);
        assert_eq!(cache.size().await, 0); // evicción perezosa

        let stats = cache.stats().await;
        assert_eq!(stats.entries_expired, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_miss() {
        let cache = FipeCache::new();
        let cached: Option<Payload> = cache.get("inexistente").await;
        assert_eq!(cached, None);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let cache = FipeCache::new();
        cache.set("a", &1u32, Duration::from_secs(60)).await;
        cache.set("b", &2u32, Duration::from_secs(60)).await;
        assert_eq!(cache.size().await, 2);

        cache.clear().await;
        assert_eq!(cache.size().await, 0);
    }

    #[test]
    fn test_keys_are_deterministic() {
        assert_eq!(
            FipeCache::brands_key(VehicleClass::Cars),
            "fipe:brands:cars"
        );
        assert_eq!(
            FipeCache::detail_key(VehicleClass::Cars, "59", "4828", "2023-1"),
            "fipe:detail:cars:59:4828:2023-1"
        );
    }
}
