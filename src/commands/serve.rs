use anyhow::{Context, Result};

use taskhub::app::App;
use taskhub::config::Config;
use taskhub::metrics;

/// Command-line overrides for the server configuration
pub struct ServeParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub restart_timeout: Option<u64>,
    pub enable_cors: bool,
}

/// Start the task server
pub async fn serve(mut config: Config, params: ServeParams) -> Result<()> {
    let ServeParams {
        host,
        port,
        restart_timeout,
        enable_cors,
    } = params;

    if host.is_some() || port.is_some() {
        let host = host.unwrap_or_else(|| config.server.bind_address.ip().to_string());
        let port = port.unwrap_or(config.server.bind_address.port());
        config.server.bind_address = format!("{host}:{port}")
            .parse()
            .context("Invalid bind address")?;
    }
    if restart_timeout.is_some() {
        config.server.restart_timeout_secs = restart_timeout;
    }
    config.server.enable_cors = config.server.enable_cors && enable_cors;
    config.validate()?;

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    let app = App::open(&config).context("Failed to initialize task store")?;
    let server = app.server(&config)?;

    println!("{}", server.info().display());
    println!("  Database: {}", config.database.sqlite_path.display());
    println!("  Cron Tick: {}s", config.scheduler.tick_interval_secs);
    println!();
    println!("API Endpoints:");
    println!("  POST /api/tasks/{{id}}/restart - Restart a stopped recurring task");
    println!("  GET  /api/tasks/{{id}}         - Get task by ID");
    println!("  GET  /api/health              - Health check");
    println!("  GET  /metrics                 - Prometheus metrics endpoint");
    println!();
    println!("Task server listening on http://{}", config.server.bind_address);
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    app.shutdown().await;
    println!("Task server stopped.");
    Ok(())
}
