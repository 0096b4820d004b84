//! Governor de llamadas al upstream FIPE
//!
//! Contador de ventana fija a nivel proceso. Cuando se agota el cupo el
//! caller no debe reintentar en forma síncrona: la respuesta correcta es
//! caer al cache o a datos sintéticos. Es una frontera de backpressure,
//! no una cola.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::environment::EnvironmentConfig;

struct WindowState {
    started_at: Instant,
    calls: u32,
}

/// Contador de ventana fija para llamadas al upstream
pub struct RateGovernor {
    window: RwLock<WindowState>,
    max_calls: u32,
    window_duration: Duration,
}

impl RateGovernor {
    /// Crear un governor con límite y ventana explícitos
    pub fn new(max_calls: u32, window_duration: Duration) -> Self {
        Self {
            window: RwLock::new(WindowState {
                started_at: Instant::now(),
                calls: 0,
            }),
            max_calls,
            window_duration,
        }
    }

    /// Crear el governor desde la configuración del entorno
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        Self::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Pedir permiso para una llamada al upstream.
    /// La ventana se rearma en forma perezosa cuando ya venció.
    pub async fn try_acquire(&self) -> bool {
        let mut window = self.window.write().await;
        let now = Instant::now();

        if now.duration_since(window.started_at) >= self.window_duration {
            window.started_at = now;
            window.calls = 0;
            debug!("🔄 Ventana de rate limiting rearmada");
        }

        if window.calls >= self.max_calls {
            warn!(
                "🚦 Límite de llamadas FIPE alcanzado ({}/{})",
                window.calls, self.max_calls
            );
            return false;
        }

        window.calls += 1;
        true
    }

    /// Llamadas restantes en la ventana actual
    pub async fn remaining(&self) -> u32 {
        let window = self.window.read().await;
        if Instant::now().duration_since(window.started_at) >= self.window_duration {
            return self.max_calls;
        }
        self.max_calls.saturating_sub(window.calls)
    }
}
