//! Swappable audit-trail strategies
//!
//! The relational transaction log (written inside the transfer unit of work)
//! is always the authoritative record. An [`AuditTrail`] is the secondary
//! strategy layered on top: either nothing at all, or the hash-chained
//! ledger with its stronger tamper-evidence proof. The engine hands events
//! over only after a successful commit, so a rolled-back transfer can never
//! leave a phantom audit entry.

pub mod hashchain;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use hashchain::HashChain;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit chain lock is poisoned")]
    ChainPoisoned,
}

/// A committed balance-affecting event, as handed to the audit trail
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub from_account: i64,
    pub to_account: i64,
    pub amount: Decimal,
    pub remark: String,
}

#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Record a committed transfer
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// No secondary record; the relational transaction log stands alone
#[derive(Debug, Default)]
pub struct PlainAudit;

#[async_trait]
impl AuditTrail for PlainAudit {
    async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
