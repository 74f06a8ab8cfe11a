//! Funds transfer engine
//!
//! Moves money between two account balance rows and appends the matching
//! transaction-log entry as one atomic unit of work. Correctness rests on
//! three rules:
//!
//! 1. Both balance rows are locked `FOR UPDATE` in ascending account-number
//!    order. The fixed global order means two concurrent transfers over the
//!    same pair always request locks in the same relative order, so no cycle
//!    of waiters can form.
//! 2. The sufficient-funds check reads the balance after the lock is held,
//!    so the value cannot change underneath the unit of work.
//! 3. Balance writes and the log insert share one transaction; any failure
//!    anywhere rolls the whole unit back with no partial effect visible.
//!
//! Isolation is READ COMMITTED: the explicit row locks enforce the only
//! cross-account invariant that matters (conservation), so stricter
//! serialization buys nothing here.
//!
//! Deposits and withdrawals are degenerate transfers with the external
//! sentinel on one side; they lock only the single real account.

use crate::account::AccountStore;
use crate::audit::{AuditEvent, AuditTrail};
use crate::db::Database;
use crate::history::{EXTERNAL_ACCOUNT, TransactionLog};
use crate::money;
use rust_decimal::Decimal;
use sqlx::Row;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Postgres "lock_not_available", raised when `lock_timeout` expires
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Which side of a transfer an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferParty {
    From,
    To,
}

impl fmt::Display for TransferParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferParty::From => write!(f, "from"),
            TransferParty::To => write!(f, "to"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    /// Terminal business outcome, not a system failure
    #[error("{side} account {account_no} does not exist")]
    AccountNotFound {
        side: TransferParty,
        account_no: i64,
    },

    /// Terminal business outcome; no partial debit ever occurs
    #[error("insufficient balance in the from account")]
    InsufficientFunds,

    /// The bounded lock wait expired; the caller may resubmit
    #[error("lock wait timed out; the transfer may be retried")]
    LockTimeout,

    /// Any other backing-store failure; not automatically retried
    #[error("storage error: {0}")]
    Storage(sqlx::Error),

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("source and destination accounts are the same")]
    SameAccount,
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some(PG_LOCK_NOT_AVAILABLE) {
                return TransferError::LockTimeout;
            }
        }
        TransferError::Storage(e)
    }
}

impl TransferError {
    /// Only lock timeouts are worth resubmitting
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::LockTimeout)
    }
}

/// One side of a movement: a real account row or the external world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counterparty {
    Account(i64),
    External,
}

impl Counterparty {
    /// Identifier written into the transaction log
    fn record_id(&self) -> i64 {
        match self {
            Counterparty::Account(no) => *no,
            Counterparty::External => EXTERNAL_ACCOUNT,
        }
    }
}

/// Lower account number first; the sole deadlock-prevention invariant.
/// Every code path that locks both rows must go through this ordering.
fn lock_order(a: i64, b: i64) -> (i64, i64) {
    if a < b { (a, b) } else { (b, a) }
}

/// The transfer/ledger orchestrator
pub struct TransferEngine {
    db: Arc<Database>,
    audit: Arc<dyn AuditTrail>,
    lock_wait_ms: u64,
}

impl TransferEngine {
    pub fn new(db: Arc<Database>, audit: Arc<dyn AuditTrail>, lock_wait_ms: u64) -> Self {
        Self {
            db,
            audit,
            lock_wait_ms,
        }
    }

    /// Move `amount` between two real accounts
    pub async fn transfer(
        &self,
        from_account: i64,
        to_account: i64,
        amount: Decimal,
        remark: &str,
    ) -> Result<(), TransferError> {
        if from_account == to_account {
            return Err(TransferError::SameAccount);
        }
        self.execute(
            Counterparty::Account(from_account),
            Counterparty::Account(to_account),
            amount,
            remark,
        )
        .await
    }

    /// Credit an account from outside the ledger
    pub async fn deposit(
        &self,
        to_account: i64,
        amount: Decimal,
        remark: &str,
    ) -> Result<(), TransferError> {
        self.execute(
            Counterparty::External,
            Counterparty::Account(to_account),
            amount,
            remark,
        )
        .await
    }

    /// Debit an account toward outside the ledger
    pub async fn withdraw(
        &self,
        from_account: i64,
        amount: Decimal,
        remark: &str,
    ) -> Result<(), TransferError> {
        self.execute(
            Counterparty::Account(from_account),
            Counterparty::External,
            amount,
            remark,
        )
        .await
    }

    async fn execute(
        &self,
        from: Counterparty,
        to: Counterparty,
        amount: Decimal,
        remark: &str,
    ) -> Result<(), TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        // quantize to the column scale up front so in-memory arithmetic
        // matches what the store persists
        let amount = money::quantize(amount);

        let mut tx = self.db.pool().begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        // SET does not take bind parameters
        let lock_stmt = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_wait_ms);
        sqlx::query(&lock_stmt).execute(&mut *tx).await?;

        // collect the real sides and lock them in ascending-number order
        let mut sides: Vec<(TransferParty, i64)> = Vec::with_capacity(2);
        if let Counterparty::Account(no) = from {
            sides.push((TransferParty::From, no));
        }
        if let Counterparty::Account(no) = to {
            sides.push((TransferParty::To, no));
        }
        if sides.len() == 2 {
            let (first, _) = lock_order(sides[0].1, sides[1].1);
            if sides[0].1 != first {
                sides.swap(0, 1);
            }
        }

        let mut from_balance: Option<Decimal> = None;
        let mut to_balance: Option<Decimal> = None;
        for (side, account_no) in sides {
            let row = sqlx::query("SELECT balance FROM accounts WHERE account_no = $1 FOR UPDATE")
                .bind(account_no)
                .fetch_optional(&mut *tx)
                .await?;

            let Some(row) = row else {
                tx.rollback().await.ok();
                return Err(TransferError::AccountNotFound { side, account_no });
            };
            match side {
                TransferParty::From => from_balance = Some(row.get("balance")),
                TransferParty::To => to_balance = Some(row.get("balance")),
            }
        }

        if let Some(balance) = from_balance {
            if balance < amount {
                tx.rollback().await.ok();
                tracing::info!(
                    from = from.record_id(),
                    to = to.record_id(),
                    amount = %amount,
                    "transfer rejected: insufficient funds"
                );
                return Err(TransferError::InsufficientFunds);
            }
        }

        if let (Counterparty::Account(no), Some(balance)) = (from, from_balance) {
            AccountStore::set_balance(&mut tx, no, balance - amount).await?;
        }
        if let (Counterparty::Account(no), Some(balance)) = (to, to_balance) {
            AccountStore::set_balance(&mut tx, no, balance + amount).await?;
        }

        let entry_id =
            TransactionLog::append(&mut tx, from.record_id(), to.record_id(), amount, remark)
                .await?;

        tx.commit().await?;

        tracing::info!(
            entry_id,
            from = from.record_id(),
            to = to.record_id(),
            amount = %amount,
            "transfer committed"
        );

        // the unit of work is already durable; a secondary audit failure is
        // reported, not propagated
        let event = AuditEvent {
            from_account: from.record_id(),
            to_account: to.record_id(),
            amount,
            remark: remark.to_string(),
        };
        if let Err(e) = self.audit.record(&event).await {
            tracing::warn!(error = %e, "audit trail rejected a committed transfer");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_is_ascending() {
        assert_eq!(lock_order(1, 2), (1, 2));
        assert_eq!(lock_order(2, 1), (1, 2));
        assert_eq!(lock_order(7, 7), (7, 7));
    }

    #[test]
    fn test_lock_order_is_symmetric() {
        // both directions of the same pair must agree, otherwise two
        // opposite transfers could form a waiter cycle
        for (a, b) in [(3, 9), (9, 3), (1, i64::MAX), (i64::MAX, 1)] {
            let (x, y) = lock_order(a, b);
            assert_eq!((x, y), lock_order(b, a));
            assert!(x <= y);
        }
    }

    #[test]
    fn test_external_record_id_is_sentinel() {
        assert_eq!(Counterparty::External.record_id(), EXTERNAL_ACCOUNT);
        assert_eq!(Counterparty::Account(42).record_id(), 42);
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(TransferError::LockTimeout.is_retryable());
        assert!(!TransferError::InsufficientFunds.is_retryable());
        assert!(
            !TransferError::AccountNotFound {
                side: TransferParty::To,
                account_no: 1
            }
            .is_retryable()
        );
        assert!(!TransferError::Storage(sqlx::Error::PoolClosed).is_retryable());
    }
}
