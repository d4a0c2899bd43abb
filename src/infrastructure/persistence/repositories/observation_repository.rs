use crate::domain::errors::StoreError;
use crate::domain::market::Observation;
use crate::domain::repositories::ObservationRepository;
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::debug;

/// SQLite-backed observation history.
///
/// Writes go through `write_lock` so there is never more than one writer in
/// flight; reads use the pool directly and run alongside the writer (WAL).
pub struct SqliteObservationRepository {
    pool: SqlitePool,
    auxiliary_arity: usize,
    write_lock: Mutex<()>,
}

impl SqliteObservationRepository {
    pub fn new(pool: SqlitePool, auxiliary_arity: usize) -> Self {
        Self {
            pool,
            auxiliary_arity,
            write_lock: Mutex::new(()),
        }
    }

    fn map_rows(&self, rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Observation>, StoreError> {
        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(|e| StoreError::io("decode", e))?;
            let timestamp: i64 = row
                .try_get("timestamp")
                .map_err(|e| StoreError::io("decode", e))?;
            let primary_value: f64 = row
                .try_get("primary_value")
                .map_err(|e| StoreError::io("decode", e))?;
            let auxiliary_json: String = row
                .try_get("auxiliary_json")
                .map_err(|e| StoreError::io("decode", e))?;

            let auxiliary_values: Vec<f64> =
                serde_json::from_str(&auxiliary_json).map_err(|e| StoreError::Corrupt {
                    row_id: id,
                    reason: format!("auxiliary_json: {}", e),
                })?;
            let timestamp = DateTime::from_timestamp(timestamp, 0).ok_or(StoreError::Corrupt {
                row_id: id,
                reason: format!("timestamp out of range: {}", timestamp),
            })?;

            let observation = Observation::new(timestamp, primary_value, auxiliary_values)
                .map_err(|e| StoreError::Corrupt {
                    row_id: id,
                    reason: e.to_string(),
                })?;
            observations.push(observation);
        }
        Ok(observations)
    }
}

#[async_trait]
impl ObservationRepository for SqliteObservationRepository {
    async fn append(&self, observation: &Observation) -> Result<(), StoreError> {
        if observation.arity() != self.auxiliary_arity {
            return Err(StoreError::ArityMismatch {
                expected: self.auxiliary_arity,
                actual: observation.arity(),
            });
        }

        let auxiliary_json = serde_json::to_string(observation.auxiliary_values())
            .map_err(|e| StoreError::io("encode", e))?;

        let _guard = self.write_lock.lock().await;

        let latest: Option<i64> =
            sqlx::query_scalar("SELECT timestamp FROM observations ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::io("append", e))?;
        if let Some(latest) = latest
            && latest > observation.timestamp().timestamp()
        {
            return Err(StoreError::OutOfOrder {
                latest: DateTime::from_timestamp(latest, 0).unwrap_or_default(),
                offered: observation.timestamp(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO observations (timestamp, primary_value, auxiliary_json)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(observation.timestamp().timestamp())
        .bind(observation.primary_value())
        .bind(auxiliary_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::io("append", e))?;

        debug!(
            "Persisted observation {} price={:.4}",
            observation.timestamp(),
            observation.primary_value()
        );
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<Observation>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, primary_value, auxiliary_json FROM (
                SELECT id, timestamp, primary_value, auxiliary_json
                FROM observations
                ORDER BY id DESC
                LIMIT ?
            )
            ORDER BY id ASC
            "#,
        )
        .bind(i64::try_from(n).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::io("recent", e))?;

        self.map_rows(rows)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM observations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::io("count", e))?;
        let count: i64 = row.try_get("count").map_err(|e| StoreError::io("count", e))?;
        Ok(count as usize)
    }

    async fn latest(&self) -> Result<Option<Observation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, primary_value, auxiliary_json
            FROM observations
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::io("latest", e))?;

        Ok(self.map_rows(rows)?.pop())
    }
}
