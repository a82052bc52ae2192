use crate::domain::detection::Detection;
use crate::domain::errors::SinkError;
use crate::domain::ports::StorageSink;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::sinks::row::{DetectionRow, now_millis};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

/// Writes detections into the `detections` table.
///
/// Inserts are `OR IGNORE` on the id, so a detection re-dispatched after a
/// restart does not produce a second row.
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<DetectionRow>, SinkError> {
        let row = sqlx::query_as::<_, DetectionRow>(
            r#"
            SELECT id, ts, pair, price, interval, pct_over, vol_ratio, usd_per_min,
                   rsi, vpm_avg_usd, macd_hist, source, universe, ingested_at
            FROM detections WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_pair(&self, pair: &str) -> Result<Vec<DetectionRow>, SinkError> {
        let rows = sqlx::query_as::<_, DetectionRow>(
            r#"
            SELECT id, ts, pair, price, interval, pct_over, vol_ratio, usd_per_min,
                   rsi, vpm_avg_usd, macd_hist, source, universe, ingested_at
            FROM detections WHERE pair = ? ORDER BY ts ASC
            "#,
        )
        .bind(pair)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64, SinkError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM detections")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl StorageSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn persist(&self, detection: &Detection) -> Result<(), SinkError> {
        let row = DetectionRow::from_detection(detection, now_millis());

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO detections
                (id, ts, pair, price, interval, pct_over, vol_ratio, usd_per_min,
                 rsi, vpm_avg_usd, macd_hist, source, universe, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(row.ts)
        .bind(&row.pair)
        .bind(row.price)
        .bind(&row.interval)
        .bind(row.pct_over)
        .bind(row.vol_ratio)
        .bind(row.usd_per_min)
        .bind(row.rsi)
        .bind(row.vpm_avg_usd)
        .bind(row.macd_hist)
        .bind(&row.source)
        .bind(&row.universe)
        .bind(row.ingested_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("SqliteSink: {} already stored", detection.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::sample_detection;

    #[tokio::test]
    async fn test_duplicate_id_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&format!("sqlite://{}/scanner.db", dir.path().display()))
            .await
            .unwrap();
        let sink = SqliteSink::new(&db);
        let detection = sample_detection("BTC-USD", 0);

        sink.persist(&detection).await.unwrap();
        sink.persist(&detection).await.unwrap();

        assert_eq!(sink.count().await.unwrap(), 1);
        let stored = sink.find_by_id(detection.id.as_str()).await.unwrap();
        assert!(stored.is_some());
    }
}
