//! Account ledger store
//!
//! Owns every read and write of the `accounts` table. Reads return `None`
//! when the account number is absent so callers can tell "account missing"
//! apart from "account has zero balance". The balance write takes an open
//! transaction handle: balances change only inside a transfer-engine unit of
//! work, never standalone.

use super::models::{AccountType, NewAccount, Profile};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};

/// Repository over the `accounts` table
pub struct AccountStore;

impl AccountStore {
    /// Whether an account with this number exists
    pub async fn exists(pool: &PgPool, account_no: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE account_no = $1")
            .bind(account_no)
            .fetch_optional(pool)
            .await?;

        Ok(row.is_some())
    }

    /// Current balance, or `None` if the account does not exist
    pub async fn balance_of(pool: &PgPool, account_no: i64) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE account_no = $1")
            .bind(account_no)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.get("balance")))
    }

    /// Profile fields, or `None` if the account does not exist
    pub async fn profile_of(pool: &PgPool, account_no: i64) -> Result<Option<Profile>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT account_no, name, phone_num, email, account_type, created_at
               FROM accounts WHERE account_no = $1"#,
        )
        .bind(account_no)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| Profile {
            account_no: r.get("account_no"),
            name: r.get("name"),
            phone_num: r.get("phone_num"),
            email: r.get("email"),
            account_type: AccountType::from(r.get::<String, _>("account_type").as_str()),
            created_at: r.get("created_at"),
        }))
    }

    /// Overwrite an account's balance.
    ///
    /// Only callable with an open transaction handle; the caller must hold
    /// the row lock and write the matching transaction-log entry in the same
    /// unit of work.
    pub async fn set_balance(
        conn: &mut PgConnection,
        account_no: i64,
        balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET balance = $1 WHERE account_no = $2")
            .bind(balance)
            .bind(account_no)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Open a new account and return its assigned number
    pub async fn open(pool: &PgPool, new_account: &NewAccount) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"INSERT INTO accounts (name, phone_num, email, pin, balance, account_type)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING account_no"#,
        )
        .bind(&new_account.name)
        .bind(&new_account.phone_num)
        .bind(&new_account.email)
        .bind(new_account.pin)
        .bind(new_account.initial_balance)
        .bind(new_account.account_type.as_str())
        .fetch_one(pool)
        .await?;

        Ok(row.get("account_no"))
    }

    /// Compare a candidate PIN against the stored one.
    ///
    /// `None` means the account does not exist; `Some(false)` is a wrong PIN.
    pub async fn verify_pin(
        pool: &PgPool,
        account_no: i64,
        pin: i32,
    ) -> Result<Option<bool>, sqlx::Error> {
        let row = sqlx::query("SELECT pin FROM accounts WHERE account_no = $1")
            .bind(account_no)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.get::<i32, _>("pin") == pin))
    }

    pub async fn change_pin(pool: &PgPool, account_no: i64, pin: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET pin = $1 WHERE account_no = $2")
            .bind(pin)
            .bind(account_no)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn update_contact(
        pool: &PgPool,
        account_no: i64,
        name: &str,
        phone_num: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET name = $1, phone_num = $2 WHERE account_no = $3")
            .bind(name)
            .bind(phone_num)
            .bind(account_no)
            .execute(pool)
            .await?;

        Ok(())
    }
}
