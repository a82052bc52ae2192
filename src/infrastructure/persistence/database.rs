use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared SQLite pool with the detections schema applied
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // Floats are stored as REAL (IEEE 754 double), so values round-trip exactly
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS detections (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                pair TEXT NOT NULL,
                price REAL NOT NULL,
                interval TEXT NOT NULL,
                pct_over REAL NOT NULL,
                vol_ratio REAL NOT NULL,
                usd_per_min REAL NOT NULL,
                rsi REAL,
                vpm_avg_usd REAL NOT NULL,
                macd_hist REAL,
                source TEXT NOT NULL,
                universe TEXT NOT NULL,
                ingested_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create detections table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_detections_pair_time
            ON detections (pair, ts);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create detections index")?;

        info!("Database schema initialized");
        Ok(())
    }
}
