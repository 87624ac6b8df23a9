use std::sync::Arc;

use shapecloud_fleet::BrokerClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: shapecloud_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Broker management client used to publish trigger messages.
    pub broker: Arc<BrokerClient>,
}
