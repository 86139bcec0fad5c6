//! MySQL connection pool
//!
//! All database access goes through this module.
//! The pool is created once at startup and connects lazily, so the
//! server can start while the database is still unreachable.

use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::AppError;

/// Database connection pool wrapper.
///
/// At most `max_connections` connections are open at once; further
/// requests wait in the pool's queue until one is released or
/// `acquire_timeout_seconds` elapses.
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Build the pool without opening a connection.
    ///
    /// # Errors
    /// Returns error if the connection options are invalid
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, AppError> {
        if config.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .database(&config.name);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_lazy_with(options);

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "Database pool configured"
        );

        Ok(Self { pool })
    }

    /// Shared pool handle for route modules that run queries
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round-trip a trivial query to check the database is reachable
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Currently open and idle connection counts
    pub fn connections(&self) -> (u32, u32) {
        (self.pool.size(), self.pool.num_idle() as u32)
    }
}
