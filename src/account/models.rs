//! Data models for bank accounts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Account category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[default]
    Savings,
    Current,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Current => "CURRENT",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CURRENT" => Ok(AccountType::Current),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

impl From<&str> for AccountType {
    /// Lenient mapping for stored column values
    fn from(v: &str) -> Self {
        match v.to_uppercase().as_str() {
            "CURRENT" => AccountType::Current,
            _ => AccountType::Savings, // Default fallback
        }
    }
}

/// Account profile row, balance excluded (balances are read and written only
/// through the transfer path)
#[derive(Debug, Clone)]
pub struct Profile {
    pub account_no: i64,
    pub name: String,
    pub phone_num: String,
    pub email: Option<String>,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

/// Parameters for opening a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub phone_num: String,
    pub email: Option<String>,
    pub pin: i32,
    pub initial_balance: Decimal,
    pub account_type: AccountType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_from_str() {
        assert_eq!("savings".parse::<AccountType>(), Ok(AccountType::Savings));
        assert_eq!("CURRENT".parse::<AccountType>(), Ok(AccountType::Current));
        assert_eq!(" Savings ".parse::<AccountType>(), Ok(AccountType::Savings));
        assert!("checking".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_account_type_column_fallback() {
        assert_eq!(AccountType::from("CURRENT"), AccountType::Current);
        assert_eq!(AccountType::from("SAVINGS"), AccountType::Savings);
        assert_eq!(AccountType::from("garbage"), AccountType::Savings);
    }

    #[test]
    fn test_account_type_display_matches_column() {
        assert_eq!(AccountType::Savings.to_string(), "SAVINGS");
        assert_eq!(AccountType::Current.to_string(), "CURRENT");
    }
}
