//! PostgreSQL pool construction and shared store error type

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Embedded schema migrations, applied at startup
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect to PostgreSQL and apply pending migrations
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    MIGRATOR.run(&pool).await.map_err(StoreError::Migration)?;

    Ok(pool)
}

/// Map a sqlx error, turning unique-constraint violations into conflicts
pub(crate) fn map_constraint_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(format!("{} already exists", what));
        }
    }
    StoreError::Database(err)
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(sqlx::migrate::MigrateError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record not found")]
    NotFound,
}
