//! # salon-db
//!
//! Database layer for the booking backend. Manages:
//! - **PostgreSQL** — accounts, catalog, appointments, analytics aggregates
//! - **Object storage** — S3-compatible bucket behind the image CDN

pub mod postgres;
pub mod repository;
pub mod storage;

use anyhow::Result;
use sqlx::PgPool;

/// Shared database state passed through Axum extractors.
#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    /// Connect to PostgreSQL.
    pub async fn connect(config: &salon_common::config::AppConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pg = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;

        tracing::info!("Connected to PostgreSQL");

        Ok(Self { pg })
    }

    /// Build a pool that connects on first use (tests, CLI commands).
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pg = sqlx::postgres::PgPoolOptions::new().connect_lazy(url)?;
        Ok(Self { pg })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}
