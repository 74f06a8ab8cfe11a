//! bankline - single-user banking console
//!
//! Menu loops and input parsing around the transfer engine. This layer only
//! reads input, prints outcomes, and reports success flags; every balance
//! mutation goes through [`TransferEngine`].

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use bankline::account::{AccountStore, AccountType, NewAccount};
use bankline::audit::{AuditTrail, HashChain, PlainAudit};
use bankline::config::{AppConfig, AuditBackend};
use bankline::db::Database;
use bankline::engine::{TransferEngine, TransferError};
use bankline::history::{EXTERNAL_ACCOUNT, TransactionLog};
use bankline::logging::init_logging;
use bankline::money;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

// ============================================================
// INPUT HELPERS
// ============================================================

fn prompt(label: &str) -> String {
    print!("{}", label);
    io::stdout().flush().ok();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

fn prompt_i64(label: &str) -> Option<i64> {
    match prompt(label).parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid input! Please enter a number.");
            None
        }
    }
}

fn prompt_i32(label: &str) -> Option<i32> {
    match prompt(label).parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid input! Please enter a number.");
            None
        }
    }
}

/// Amount input boundary: parsed as exact decimal, never through floats
fn prompt_amount(label: &str) -> Option<Decimal> {
    match money::normalize_str(&prompt(label)) {
        Ok(v) => Some(v),
        Err(e) => {
            println!("Invalid amount: {}", e);
            None
        }
    }
}

fn pin_in_range(pin: i32) -> bool {
    (1000..=999_999).contains(&pin)
}

// ============================================================
// OUTCOME PRINTING
// ============================================================

/// Map an engine outcome to one human-readable line; true on success.
/// Business outcomes are ordinary messages, only storage failures are errors.
fn report_outcome(result: Result<(), TransferError>, verb: &str) -> bool {
    match result {
        Ok(()) => {
            println!("{} successful!", verb);
            true
        }
        Err(TransferError::InsufficientFunds) => {
            println!("Insufficient balance in the from account.");
            false
        }
        Err(TransferError::AccountNotFound { side, account_no }) => {
            println!("The {} account {} does not exist!", side, account_no);
            false
        }
        Err(TransferError::LockTimeout) => {
            println!("{} failed due to a lock timeout. Please try again.", verb);
            false
        }
        Err(TransferError::SameAccount) => {
            println!("Cannot transfer to yourself!");
            false
        }
        Err(TransferError::InvalidAmount) => {
            println!("Amount must be positive!");
            false
        }
        Err(TransferError::Storage(e)) => {
            tracing::error!(error = %e, "storage failure during {}", verb);
            println!("Database error during {}: {}", verb.to_lowercase(), e);
            false
        }
    }
}

// ============================================================
// ACCOUNT SCREENS
// ============================================================

async fn open_account_screen(db: &Database) {
    println!("\n=== OPEN NEW ACCOUNT ===");
    let name = prompt("ENTER YOUR NAME: ");
    let phone_num = prompt("ENTER YOUR PHONE NUMBER: ");
    let email_input = prompt("ENTER YOUR EMAIL (optional): ");
    let email = if email_input.is_empty() {
        None
    } else {
        Some(email_input)
    };

    let Some(pin) = prompt_i32("ENTER YOUR PIN (4-6 digits): ") else {
        return;
    };
    if !pin_in_range(pin) {
        println!("PIN must be 4-6 digits!");
        return;
    }

    let Some(initial_balance) = prompt_amount("ENTER INITIAL DEPOSIT AMOUNT: ") else {
        return;
    };
    if initial_balance < Decimal::ZERO {
        println!("Balance cannot be negative!");
        return;
    }

    let account_type: AccountType = match prompt("ENTER ACCOUNT TYPE (SAVINGS/CURRENT): ").parse() {
        Ok(t) => t,
        Err(_) => {
            println!("Account type must be SAVINGS or CURRENT!");
            return;
        }
    };

    let new_account = NewAccount {
        name,
        phone_num,
        email,
        pin,
        initial_balance: money::quantize(initial_balance),
        account_type,
    };
    match AccountStore::open(db.pool(), &new_account).await {
        Ok(account_no) => {
            println!("\nAccount opened successfully!");
            println!("Your account number is: {}", account_no);
            println!("Please remember this number for future login.");
        }
        Err(e) => {
            tracing::error!(error = %e, "account creation failed");
            println!("Error creating account: {}", e);
        }
    }
}

async fn account_details_screen(db: &Database, account_no: i64) {
    let profile = match AccountStore::profile_of(db.pool(), account_no).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            println!("Account not found!");
            return;
        }
        Err(e) => {
            println!("Error fetching account details: {}", e);
            return;
        }
    };
    let balance = match AccountStore::balance_of(db.pool(), account_no).await {
        Ok(Some(b)) => b,
        _ => {
            println!("Error fetching balance!");
            return;
        }
    };

    println!("\nACCOUNT DETAILS:");
    println!("-----------------");
    println!("Account Number: {}", profile.account_no);
    println!("Name: {}", profile.name);
    println!("Phone Number: {}", profile.phone_num);
    println!("Email: {}", profile.email.as_deref().unwrap_or("-"));
    println!("Account Type: {}", profile.account_type);
    println!("Opened: {}", profile.created_at.format("%Y-%m-%d"));
    println!("Balance: {}", money::format_amount(balance));
}

async fn history_screen(db: &Database, account_no: i64, limit: i64) {
    println!("\n=== Transaction History ===");
    let records = match TransactionLog::recent(db.pool(), account_no, limit).await {
        Ok(r) => r,
        Err(e) => {
            println!("Error fetching history: {}", e);
            return;
        }
    };

    if records.is_empty() {
        println!("No transactions found.");
        return;
    }
    for record in records {
        let from = if record.from_account == EXTERNAL_ACCOUNT {
            "EXTERNAL".to_string()
        } else {
            record.from_account.to_string()
        };
        let to = if record.to_account == EXTERNAL_ACCOUNT {
            "EXTERNAL".to_string()
        } else {
            record.to_account.to_string()
        };
        println!(
            "\nDate: {} Time: {}",
            record.transaction_date, record.transaction_time
        );
        println!(
            "From: {} To: {} Amount: {}",
            from,
            to,
            money::format_amount(record.amount)
        );
        println!("Remark: {}", record.remark);
    }
}

fn chain_info_screen(chain: &HashChain) {
    println!("\n=== AUDIT CHAIN INFORMATION ===");
    let info = match chain.info() {
        Ok(i) => i,
        Err(e) => {
            println!("Error reading chain: {}", e);
            return;
        }
    };
    println!("Total Blocks: {}", info.blocks);
    println!("Pending Transactions: {}", info.pending);
    println!("Folded Transactions: {}", info.total_transactions);
    println!("Chain Valid: {}", info.valid);

    if prompt("View full chain? (Y/N): ").eq_ignore_ascii_case("y") {
        let blocks = match chain.blocks() {
            Ok(b) => b,
            Err(e) => {
                println!("Error reading chain: {}", e);
                return;
            }
        };
        for block in blocks {
            println!("\nBlock #{}:", block.index);
            println!("  Hash: {}...", &block.hash()[..20]);
            println!("  Previous Hash: {}...", &block.previous_hash[..block.previous_hash.len().min(20)]);
            println!("  Proof: {}", block.proof);
            println!("  Transactions: {}", block.transactions.len());
            println!("  Timestamp: {}", block.timestamp);
        }
    }
}

// ============================================================
// MONEY-MOVING SCREENS
// ============================================================

async fn transfer_screen(engine: &TransferEngine, account_no: i64) -> bool {
    let Some(to_account) = prompt_i64("ENTER THE ACCOUNT NUMBER TO TRANSFER MONEY: ") else {
        return false;
    };
    let Some(amount) = prompt_amount("ENTER THE AMOUNT TO TRANSFER: ") else {
        return false;
    };
    if amount <= Decimal::ZERO {
        println!("Amount must be positive!");
        return false;
    }
    if to_account == account_no {
        println!("Cannot transfer to yourself!");
        return false;
    }
    let remark = prompt("ENTER REMARK FOR TRANSACTION: ");

    report_outcome(
        engine.transfer(account_no, to_account, amount, &remark).await,
        "Transfer",
    )
}

async fn deposit_screen(engine: &TransferEngine, account_no: i64) -> bool {
    let Some(amount) = prompt_amount("ENTER THE AMOUNT TO DEPOSIT: ") else {
        return false;
    };
    if amount <= Decimal::ZERO {
        println!("Amount must be positive!");
        return false;
    }
    report_outcome(engine.deposit(account_no, amount, "Deposit").await, "Deposit")
}

async fn withdraw_screen(engine: &TransferEngine, account_no: i64) -> bool {
    let Some(amount) = prompt_amount("ENTER THE AMOUNT TO WITHDRAW: ") else {
        return false;
    };
    if amount <= Decimal::ZERO {
        println!("Amount must be positive!");
        return false;
    }
    report_outcome(
        engine.withdraw(account_no, amount, "Withdrawal").await,
        "Withdrawal",
    )
}

// ============================================================
// SESSION MENU
// ============================================================

async fn session_menu(
    db: &Database,
    engine: &TransferEngine,
    chain: Option<&HashChain>,
    config: &AppConfig,
    account_no: i64,
) {
    println!("\nWelcome to login page");

    loop {
        println!("\n1. Check account details");
        println!("2. Transfer money");
        println!("3. Deposit money");
        println!("4. Withdraw money");
        println!("5. Change PIN");
        println!("6. Update personal info");
        println!("7. Check transaction history");
        if chain.is_some() {
            println!("8. View audit chain info");
        }
        println!("9. Logout");

        match prompt("ENTER YOUR CHOICE: ").as_str() {
            "1" => account_details_screen(db, account_no).await,
            "2" => {
                if transfer_screen(engine, account_no).await {
                    println!("TRANSFER COMPLETE!");
                }
            }
            "3" => {
                deposit_screen(engine, account_no).await;
            }
            "4" => {
                withdraw_screen(engine, account_no).await;
            }
            "5" => {
                let Some(new_pin) = prompt_i32("ENTER YOUR NEW PIN (4-6 digits): ") else {
                    continue;
                };
                if !pin_in_range(new_pin) {
                    println!("PIN must be 4-6 digits!");
                    continue;
                }
                match AccountStore::change_pin(db.pool(), account_no, new_pin).await {
                    Ok(()) => println!("PIN CHANGED SUCCESSFULLY!"),
                    Err(e) => println!("Error changing PIN: {}", e),
                }
            }
            "6" => {
                if prompt("DO YOU WANT TO UPDATE YOUR PERSONAL INFO (Y/N): ")
                    .eq_ignore_ascii_case("y")
                {
                    let new_name = prompt("ENTER YOUR NEW NAME: ");
                    let new_phone = prompt("ENTER YOUR NEW PHONE NUMBER: ");
                    match AccountStore::update_contact(db.pool(), account_no, &new_name, &new_phone)
                        .await
                    {
                        Ok(()) => println!("PERSONAL INFO UPDATED SUCCESSFULLY!"),
                        Err(e) => println!("Error updating info: {}", e),
                    }
                }
            }
            "7" => history_screen(db, account_no, config.transfer.history_limit).await,
            "8" if chain.is_some() => {
                if let Some(chain) = chain {
                    chain_info_screen(chain);
                }
            }
            "9" => {
                println!("LOGGED OUT SUCCESSFULLY!");
                break;
            }
            _ => println!("INVALID CHOICE!"),
        }
    }
}

async fn login_screen(
    db: &Database,
    engine: &TransferEngine,
    chain: Option<&HashChain>,
    config: &AppConfig,
) {
    println!("\n=== LOGIN ===");
    let Some(account_no) = prompt_i64("ENTER YOUR ACCOUNT NUMBER: ") else {
        return;
    };
    let Some(pin) = prompt_i32("ENTER YOUR PIN: ") else {
        return;
    };

    match AccountStore::verify_pin(db.pool(), account_no, pin).await {
        Ok(None) => println!("Account not found!"),
        Ok(Some(false)) => println!("Invalid PIN!"),
        Ok(Some(true)) => {
            println!("\nLogin successful!");
            session_menu(db, engine, chain, config, account_no).await;
        }
        Err(e) => println!("Error during login: {}", e),
    }
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(&get_env());
    let _guard = init_logging(&config);

    let db = Arc::new(
        Database::connect(&config.database_url)
            .await
            .context("connect to PostgreSQL")?,
    );
    db.init_schema().await.context("bootstrap schema")?;

    let chain: Option<Arc<HashChain>> = match config.audit.backend {
        AuditBackend::HashChain => Some(Arc::new(HashChain::new(
            config.audit.difficulty,
            config.audit.mine_on_commit,
        ))),
        AuditBackend::Plain => None,
    };
    let audit: Arc<dyn AuditTrail> = match &chain {
        Some(c) => c.clone(),
        None => Arc::new(PlainAudit),
    };
    let engine = TransferEngine::new(db.clone(), audit, config.transfer.lock_wait_ms);

    loop {
        println!("\n{}", "=".repeat(50));
        println!("WELCOME TO BANK MANAGEMENT SYSTEM");
        println!("{}", "=".repeat(50));

        println!("\n1. OPEN ACCOUNT");
        println!("2. LOGIN ACCOUNT");
        if chain.is_some() {
            println!("3. AUDIT CHAIN INFO");
        }
        println!("4. EXIT");

        match prompt("\nENTER YOUR CHOICE: ").as_str() {
            "1" => open_account_screen(&db).await,
            "2" => login_screen(&db, &engine, chain.as_deref(), &config).await,
            "3" if chain.is_some() => {
                if let Some(chain) = &chain {
                    chain_info_screen(chain);
                }
            }
            "4" => {
                println!("\nTHANK YOU FOR USING BANK MANAGEMENT SYSTEM!");
                println!("GOODBYE!");
                break;
            }
            _ => println!("INVALID CHOICE! Please try again."),
        }
    }

    Ok(())
}
