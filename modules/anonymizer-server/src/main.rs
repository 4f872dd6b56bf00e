use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use anonymizer_server::routes;

#[derive(Parser)]
#[command(name = "anonymizer-server", about = "Mobility data anonymizer backend")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/anonymizer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting anonymizer-server");

    let cli = Cli::parse();

    let config_path = cli.config.canonicalize().with_context(|| {
        format!(
            "Config file not found: {}. Create one or specify --config <path>",
            cli.config.display()
        )
    })?;

    tracing::info!(config = %config_path.display(), "Loading config");

    let file_config = Arc::new(anonymizer_core::file_config::load_config(&config_path)?);

    // Secrets and deployment overrides from env vars
    let config = anonymizer_core::AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(file_config.database.max_connections)
        .acquire_timeout(Duration::from_secs(file_config.database.acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = file_config.database.max_connections,
        "Connected to database"
    );

    let migrations = anonymizer_server::schema::apply(&pool).await?;
    tracing::info!(migrations, "Migrations complete");

    let addr = file_config.bind_address(config.host_override.as_deref(), config.port_override);
    let deps = Arc::new(anonymizer_core::ServerDeps::new(pool, config, file_config));
    let app = routes::build_router(deps);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Anonymizer API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
