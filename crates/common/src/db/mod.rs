//! Database layer for ForumPulse
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection management for the SQLite store
//! - Idempotent schema creation

pub mod models;
mod repository;

pub use repository::{
    CommunitySummary, OverallStats, Repository, Scope, SentimentCounts, SentimentExtremes,
    UpsertOutcome,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{PostColumn, PostEntity};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use sqlx::sqlite::SqliteConnectOptions;
use std::time::Duration;
use tracing::{debug, info};

/// Database connection wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Open (creating if needed) the store described by `config` and make
    /// sure the schema exists
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(path = %config.path.display(), "Opening database...");

        // An in-memory SQLite database lives and dies with its connection,
        // so the pool must never hold more than one.
        let max_connections = if config.is_in_memory() {
            1
        } else {
            config.max_connections
        };

        let mut opts = ConnectOptions::new(config.url());
        opts.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(config.sqlx_logging)
            .map_sqlx_sqlite_opts(|opts: SqliteConnectOptions| {
                opts.create_if_missing(true)
                    .busy_timeout(Duration::from_secs(5))
            });

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to open {}: {}", config.path.display(), e),
            })?;

        let pool = Self { conn };
        pool.ensure_schema().await?;

        info!("Database ready");

        Ok(pool)
    }

    /// Throwaway in-memory store, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    /// Create the posts table and its indexes if they are missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let table = schema
            .create_table_from_entity(PostEntity)
            .if_not_exists()
            .to_owned();
        self.conn.execute(backend.build(&table)).await?;

        let score_index = Index::create()
            .if_not_exists()
            .name("idx_posts_score")
            .table(PostEntity)
            .col(PostColumn::Score)
            .to_owned();
        self.conn.execute(backend.build(&score_index)).await?;

        debug!("Schema ensured");
        Ok(())
    }

    /// Get the connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(Into::into)
    }
}
