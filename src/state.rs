//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::services::notification_service::NotificationSink;
use crate::services::pricing_service::PricingOracle;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub pricing: Arc<dyn PricingOracle>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: EnvironmentConfig,
        pricing: Arc<dyn PricingOracle>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pool,
            config,
            pricing,
            notifier,
        }
    }
}
