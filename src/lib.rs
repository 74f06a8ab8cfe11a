//! bankline - single-user banking core
//!
//! A console bank over a small PostgreSQL store. The heart of the crate is
//! the transfer/ledger engine; everything else is storage access and glue.
//!
//! # Modules
//!
//! - [`money`] - Exact-decimal normalization and display formatting
//! - [`db`] - Connection pool and schema bootstrap
//! - [`account`] - Account profiles and the account ledger store
//! - [`history`] - Append-only transaction log store
//! - [`engine`] - Funds transfer engine (ordered row locks, atomic unit of work)
//! - [`audit`] - Swappable audit-trail strategies (plain log / hash chain)
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup

pub mod account;
pub mod audit;
pub mod config;
pub mod db;
pub mod engine;
pub mod history;
pub mod logging;
pub mod money;

// Convenient re-exports at crate root
pub use account::{AccountStore, AccountType, NewAccount, Profile};
pub use audit::{AuditEvent, AuditTrail, HashChain, PlainAudit};
pub use config::{AppConfig, AuditBackend};
pub use db::Database;
pub use engine::{TransferEngine, TransferError, TransferParty};
pub use history::{EXTERNAL_ACCOUNT, TransactionLog, TransactionRecord};
pub use money::MoneyError;
