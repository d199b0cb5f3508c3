//! Database connection pool and migration utilities.
//!
//! Provides functions for creating a PostgreSQL connection pool
//! and running database migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

/// Creates a PostgreSQL connection pool with configured settings.
///
/// # Configuration
/// - Maximum connections: 5
/// - Acquire timeout: 3 seconds
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Runs all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_values() {
        assert!(MAX_CONNECTIONS > 0);
        assert!(MAX_CONNECTIONS <= 20);
        assert!(ACQUIRE_TIMEOUT.as_secs() >= 1);
        assert!(ACQUIRE_TIMEOUT.as_secs() <= 30);
    }
}
