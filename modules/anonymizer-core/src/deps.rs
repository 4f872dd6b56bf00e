use crate::config::AppConfig;
use crate::file_config::FileConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// Central dependency container passed to the HTTP handlers.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub config: AppConfig,
    pub file_config: Arc<FileConfig>,
}

impl ServerDeps {
    pub fn new(db_pool: PgPool, config: AppConfig, file_config: Arc<FileConfig>) -> Self {
        Self {
            db_pool,
            config,
            file_config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db_pool
    }
}
