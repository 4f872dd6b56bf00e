//! Applies the anonymizer schema and exits. Reads DATABASE_URL the same way
//! the server does, so a deployment can migrate before the API starts.

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use anonymizer_server::schema;

#[derive(Parser)]
#[command(name = "run-migrations", about = "Apply anonymizer schema migrations")]
struct Cli {
    /// List embedded migrations without connecting
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.list {
        for migration in schema::MIGRATOR.iter() {
            tracing::info!(version = migration.version, description = %migration.description, "Embedded migration");
        }
        return Ok(());
    }

    let config = anonymizer_core::AppConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let count = schema::apply(&pool)
        .await
        .context("Failed to apply anonymizer migrations")?;
    tracing::info!(migrations = count, "Anonymizer schema up to date");

    Ok(())
}
