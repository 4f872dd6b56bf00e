//! Anonymizer schema migrations, embedded at compile time.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the user and IoT tables up to date. Returns the number of
/// migrations the schema now carries.
pub async fn apply(pool: &PgPool) -> Result<usize, MigrateError> {
    MIGRATOR.run(pool).await?;
    Ok(MIGRATOR.iter().count())
}
