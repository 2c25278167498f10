//! Task server implementation
//!
//! Wraps the restart coordinator and task store behind the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::storage::SharedTaskStore;

use super::api::create_router;
use super::config::ServerConfig;
use super::restart::RestartCoordinator;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Restart coordinator
    pub coordinator: Arc<RestartCoordinator>,

    /// Task store
    pub store: SharedTaskStore,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: ServerConfig,
}

// ============================================================================
// Task Server
// ============================================================================

/// HTTP server for task operations
pub struct TaskServer {
    config: ServerConfig,
    state: AppState,
}

impl TaskServer {
    /// Create a new task server
    pub fn new(
        config: ServerConfig,
        coordinator: Arc<RestartCoordinator>,
        store: SharedTaskStore,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let state = AppState {
            coordinator,
            store,
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting task server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting task server on {} (with graceful shutdown)", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Task server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            restart_timeout_secs: self.config.restart_timeout_secs,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub restart_timeout_secs: Option<u64>,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        let timeout = match self.restart_timeout_secs {
            Some(secs) => format!("{}s", secs),
            None => "none".to_string(),
        };
        format!(
            "Task Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Restart Timeout: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            timeout,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::service::JobRestarter;
    use crate::crawler::CrawlJobRegistry;
    use crate::scheduler::CronRegistry;
    use crate::storage::InMemoryTaskStore;
    use std::time::Duration;

    fn coordinator(store: SharedTaskStore) -> Arc<RestartCoordinator> {
        let engine = Arc::new(CrawlJobRegistry::default());
        let cron = Arc::new(CronRegistry::new(engine.clone(), Duration::from_secs(3600)).unwrap());
        let restarter = Arc::new(JobRestarter::new(cron.clone(), engine.clone()));
        Arc::new(RestartCoordinator::new(store, restarter, cron, engine))
    }

    fn server(config: ServerConfig) -> Result<TaskServer, ServerError> {
        let store: SharedTaskStore = Arc::new(InMemoryTaskStore::new());
        TaskServer::new(config, coordinator(store.clone()), store)
    }

    #[test]
    fn test_server_creation() {
        assert!(server(ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_server_rejects_invalid_config() {
        let config = ServerConfig {
            restart_timeout_secs: Some(0),
            ..ServerConfig::default()
        };
        assert!(matches!(server(config), Err(ServerError::ConfigError(_))));
    }

    #[test]
    fn test_server_info() {
        let config = ServerConfig::builder()
            .enable_cors(false)
            .restart_timeout_secs(15)
            .build()
            .unwrap();

        let info = server(config).unwrap().info();
        assert!(!info.cors_enabled);
        assert_eq!(info.restart_timeout_secs, Some(15));
        assert!(info.display().contains("Restart Timeout: 15s"));
    }

    #[test]
    fn test_app_state_components() {
        let state = server(ServerConfig::default()).unwrap().state();
        assert_eq!(state.coordinator.lock().held_count(), 0);
    }
}
