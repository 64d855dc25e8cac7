mod config;
mod controllers;
mod database;
mod dto;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use config::environment::EnvironmentConfig;
use database::DatabaseConnection;
use middleware::cors::{cors_middleware, cors_middleware_with_origins};
use services::notification_service::TracingNotifier;
use services::pricing_service::{DistanceClient, RateCardPricing};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Truck Marketplace - API de bookings y visibilidad");
    info!("====================================================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };
    let pool = db_connection.pool().clone();

    // Servicios colaboradores
    let pricing = Arc::new(RateCardPricing::new(DistanceClient::new(
        config.distance_api_key.clone(),
    )));
    let notifier = Arc::new(TracingNotifier);

    let cors = if config.is_production() && !config.cors_origins.is_empty() {
        cors_middleware_with_origins(config.cors_origins.clone())
    } else {
        cors_middleware()
    };

    let app_state = AppState::new(pool, config.clone(), pricing, notifier);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/trucks", routes::truck_routes::create_truck_router())
        .nest("/api/bookings", routes::booking_routes::create_booking_router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚛 Endpoints - Trucks:");
    info!("   GET    /api/trucks - Búsqueda del marketplace");
    info!("   GET    /api/trucks/:id - Detalle de truck");
    info!("   GET    /api/trucks/:id/bookings - Bookings del truck");
    info!("   DELETE /api/trucks/:id - Eliminar truck");
    info!("📦 Endpoints - Bookings:");
    info!("   POST   /api/bookings - Crear booking");
    info!("   GET    /api/bookings - Listar bookings");
    info!("   GET    /api/bookings/:id - Obtener booking");
    info!("   GET    /api/bookings/:id/history - Historial de estados");
    info!("   GET    /api/bookings/:id/actions - Transiciones legales");
    info!("   PATCH  /api/bookings/:id/status - Transicionar estado");
    info!("   DELETE /api/bookings/:id - Eliminar booking");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check simple
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "truck-marketplace",
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
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "truck-marketplace");
    }
}
