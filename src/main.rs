use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ServeParams, TaskCommand};
use taskhub::config::Config;

#[derive(Parser)]
#[command(
    name = "taskhub",
    version,
    about = "Task management service for recurring crawl jobs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Path to a TOML config file (defaults to TASKHUB_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the task HTTP server
    Serve {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Deadline for a single restart request in seconds
        #[arg(long)]
        restart_timeout: Option<u64>,

        /// Disable CORS
        #[arg(long, default_value = "false")]
        no_cors: bool,
    },

    /// Manage stored tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!("taskhub starting");

    match cli.command {
        Commands::Serve {
            host,
            port,
            restart_timeout,
            no_cors,
        } => {
            tracing::info!(
                host = ?host,
                port = ?port,
                restart_timeout = ?restart_timeout,
                "Starting serve command"
            );
            commands::serve(
                config,
                ServeParams {
                    host,
                    port,
                    restart_timeout,
                    enable_cors: !no_cors,
                },
            )
            .await?;
        }

        Commands::Task { command } => {
            commands::task(&config, command).await?;
        }
    }

    tracing::info!("taskhub completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("taskhub=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("taskhub={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
