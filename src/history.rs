//! Transaction log store
//!
//! Append-only record of every balance-affecting event. Rows are written
//! exactly once, inside the same unit of work as the balance mutations they
//! describe, and are never updated or deleted afterwards. Summing the
//! entries that reference an account, signed by direction, reproduces that
//! account's balance delta history.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

/// Sentinel counterparty for deposits (no source) and withdrawals (no
/// destination).
pub const EXTERNAL_ACCOUNT: i64 = 0;

/// One immutable row of `transaction_history`
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub from_account: i64,
    pub to_account: i64,
    pub amount: Decimal,
    pub remark: String,
    pub transaction_date: NaiveDate,
    pub transaction_time: NaiveTime,
}

impl TransactionRecord {
    pub fn is_deposit(&self) -> bool {
        self.from_account == EXTERNAL_ACCOUNT
    }

    pub fn is_withdrawal(&self) -> bool {
        self.to_account == EXTERNAL_ACCOUNT
    }
}

/// Repository over the `transaction_history` table
pub struct TransactionLog;

impl TransactionLog {
    /// Append one log entry and return its sequence number.
    ///
    /// Takes the open transaction handle of the enclosing unit of work so
    /// the entry commits or rolls back together with the balance writes.
    pub async fn append(
        conn: &mut PgConnection,
        from_account: i64,
        to_account: i64,
        amount: Decimal,
        remark: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO transaction_history
               (from_account, to_account, amount, remark, transaction_date, transaction_time)
               VALUES ($1, $2, $3, $4, CURRENT_DATE, LOCALTIME)
               RETURNING id"#,
        )
        .bind(from_account)
        .bind(to_account)
        .bind(amount)
        .bind(remark)
        .fetch_one(conn)
        .await?;

        Ok(row.0)
    }

    /// Most recent entries touching an account, newest first
    pub async fn recent(
        pool: &PgPool,
        account_no: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let records: Vec<TransactionRecord> = sqlx::query_as(
            r#"SELECT id, from_account, to_account, amount, remark,
                      transaction_date, transaction_time
               FROM transaction_history
               WHERE from_account = $1 OR to_account = $1
               ORDER BY transaction_date DESC, transaction_time DESC, id DESC
               LIMIT $2"#,
        )
        .bind(account_no)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Number of entries between a pair of counterparties, either direction
    pub async fn count_between(
        pool: &PgPool,
        a: i64,
        b: i64,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM transaction_history
               WHERE (from_account = $1 AND to_account = $2)
                  OR (from_account = $2 AND to_account = $1)"#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(pool)
        .await?;

        Ok(row.0)
    }
}
