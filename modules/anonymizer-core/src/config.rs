use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; listen address,
/// CORS origins and pool sizing live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Deployment overrides for FileConfig.server
    pub host_override: Option<String>,
    pub port_override: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            host_override: std::env::var("HOST").ok().filter(|h| !h.is_empty()),
            port_override: std::env::var("PORT").ok().and_then(|p| p.parse().ok()),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(11).collect();
            format!("{}...({} chars)", head, val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        if let Some(host) = &self.host_override {
            tracing::info!("  HOST: {}", host);
        }
        if let Some(port) = self.port_override {
            tracing::info!("  PORT: {}", port);
        }
    }
}
