//! Database connection management and schema bootstrap

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the account and transaction tables if they do not exist.
    ///
    /// `transaction_history` deliberately carries no foreign keys into
    /// `accounts`: the sentinel counterparty 0 (deposits and withdrawals)
    /// never references a real row.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                account_no   BIGSERIAL PRIMARY KEY,
                name         VARCHAR(100) NOT NULL,
                phone_num    VARCHAR(15) NOT NULL,
                email        VARCHAR(254),
                pin          INTEGER NOT NULL,
                balance      DECIMAL(15,2) NOT NULL DEFAULT 0.00,
                account_type VARCHAR(20) NOT NULL,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transaction_history (
                id               BIGSERIAL PRIMARY KEY,
                from_account     BIGINT NOT NULL,
                to_account       BIGINT NOT NULL,
                amount           DECIMAL(15,2) NOT NULL,
                remark           TEXT NOT NULL,
                transaction_date DATE NOT NULL,
                transaction_time TIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_from ON transaction_history (from_account)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_to ON transaction_history (to_account)",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("schema bootstrap complete");
        Ok(())
    }
}
