//! Bank account storage: profile models and the account ledger store

pub mod models;
pub mod store;

pub use models::{AccountType, NewAccount, Profile};
pub use store::AccountStore;
