use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use fipe_comparador::api;
use fipe_comparador::config::environment::EnvironmentConfig;
use fipe_comparador::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use fipe_comparador::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚗 Comparador de Vehículos FIPE - Backend");
    info!("=========================================");

    let config = EnvironmentConfig::from_env();

    let cors = if config.is_production() {
        cors_middleware_with_origins(config.cors_origins.clone())
    } else {
        cors_middleware()
    };

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Error inicializando el estado: {}", e);
            return Err(anyhow::anyhow!("Error de inicialización: {}", e));
        }
    };

    let app = Router::new()
        .route("/health", get(health_endpoint))
        .merge(api::create_api_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Health check");
    info!("🚗 Endpoints de vehículos:");
    info!("   GET    /api/cars/search - Búsqueda inteligente con filtros");
    info!("   GET    /api/cars/makes - Lista de marcas FIPE");
    info!("   GET    /api/cars/fipe/:fipe_code - Búsqueda por código FIPE");
    info!("   POST   /api/cars/compare - Comparar 2-3 vehículos");
    info!("📊 Endpoints de estadísticas:");
    info!("   GET    /api/cars/stats/brazil - Estadísticas del mercado brasileño");
    info!("🧹 Endpoints administrativos:");
    info!("   GET    /api/cars/cache/stats - Estadísticas del cache");
    info!("   DELETE /api/cars/cache - Limpiar cache");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Endpoint de health check
async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "service": "fipe-comparador",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
