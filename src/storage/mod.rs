//! Alert and order audit persistence.
//!
//! Optional: the gateway runs fully without a database, it just loses the
//! audit trail. Connection failures at startup degrade to disabled.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;

/// Postgres-backed store for gateway audit events
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the audit table when missing
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gateway_events (
                id BIGSERIAL PRIMARY KEY,
                kind TEXT NOT NULL,
                detail TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record one audit event; `detail` is serialized JSON
    pub async fn record_event(&self, kind: &str, detail: serde_json::Value) -> Result<()> {
        sqlx::query("INSERT INTO gateway_events (kind, detail) VALUES ($1, $2)")
            .bind(kind)
            .bind(detail.to_string())
            .execute(&self.pool)
            .await?;
        debug!(kind, "audit event recorded");
        Ok(())
    }

    /// Cheap connectivity probe
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
