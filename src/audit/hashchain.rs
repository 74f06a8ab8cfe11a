//! Hash-chained audit ledger
//!
//! An in-memory append-only chain of blocks. Each block references the
//! SHA-256 hash of its predecessor and carries a proof-of-work nonce, so
//! rewriting any folded transaction invalidates every later block. The
//! proof is a tamper-evidence mechanism only: single writer, no peers, no
//! consensus.
//!
//! Pending transactions accumulate in an open set until a mining event folds
//! them into a new block and clears the set. Chain and pending set live
//! behind one internal mutex, which also serializes concurrent miners.

use super::{AuditError, AuditEvent, AuditTrail};
use crate::money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

/// A transfer as folded into the chain.
///
/// The amount is kept in its fixed two-digit display form so the block hash
/// does not depend on decimal scale quirks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub from: i64,
    pub to: i64,
    pub amount: String,
    pub timestamp: DateTime<Utc>,
    pub remark: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub proof: u64,
    pub previous_hash: String,
    pub transactions: Vec<ChainTransaction>,
}

impl Block {
    /// SHA-256 over the canonical JSON encoding (struct fields serialize in
    /// declaration order)
    pub fn hash(&self) -> String {
        let encoded = serde_json::to_string(self).expect("block encoding is infallible");
        hex::encode(Sha256::digest(encoded.as_bytes()))
    }
}

/// Chain-wide counters for the inspection screen
#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub blocks: usize,
    pub pending: usize,
    pub total_transactions: usize,
    pub valid: bool,
}

#[derive(Debug, Default)]
struct ChainState {
    chain: Vec<Block>,
    pending: Vec<ChainTransaction>,
}

/// The hash-chained ledger store
#[derive(Debug)]
pub struct HashChain {
    difficulty: usize,
    mine_on_record: bool,
    state: Mutex<ChainState>,
}

impl HashChain {
    /// Create a chain seeded with its genesis block (proof 1, previous hash
    /// "0", no transactions).
    pub fn new(difficulty: usize, mine_on_record: bool) -> Self {
        let genesis = Block {
            index: 1,
            timestamp: Utc::now(),
            proof: 1,
            previous_hash: "0".to_string(),
            transactions: Vec::new(),
        };

        Self {
            difficulty,
            mine_on_record,
            state: Mutex::new(ChainState {
                chain: vec![genesis],
                pending: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, AuditError> {
        self.state.lock().map_err(|_| AuditError::ChainPoisoned)
    }

    /// Whether `proof` together with the prior block's proof satisfies the
    /// work predicate: the digest of `proof² − previous²` must start with
    /// `difficulty` zero hex digits. Cheap to verify, expensive to find.
    pub fn proof_is_valid(proof: u64, previous_proof: u64, difficulty: usize) -> bool {
        let work = (proof as i128) * (proof as i128)
            - (previous_proof as i128) * (previous_proof as i128);
        let digest = hex::encode(Sha256::digest(work.to_string().as_bytes()));
        digest.as_bytes().iter().take(difficulty).all(|&b| b == b'0')
    }

    fn proof_of_work(previous_proof: u64, difficulty: usize) -> u64 {
        let mut proof: u64 = 1;
        while !Self::proof_is_valid(proof, previous_proof, difficulty) {
            proof += 1;
        }
        proof
    }

    /// Queue a transaction into the open pending set; returns the index of
    /// the block that will fold it.
    pub fn add_transaction(&self, transaction: ChainTransaction) -> Result<u64, AuditError> {
        let mut state = self.lock()?;
        state.pending.push(transaction);
        Ok(state.chain.len() as u64 + 1)
    }

    /// Fold all pending transactions into a new block.
    ///
    /// The mutex is held for the whole mining run, so concurrent miners
    /// serialize; with the default difficulty this costs visible latency on
    /// every mined block.
    pub fn mine(&self) -> Result<Block, AuditError> {
        let mut state = self.lock()?;

        let previous = state
            .chain
            .last()
            .expect("chain always holds the genesis block");
        let proof = Self::proof_of_work(previous.proof, self.difficulty);
        let previous_hash = previous.hash();
        let index = state.chain.len() as u64 + 1;
        let transactions = std::mem::take(&mut state.pending);

        let block = Block {
            index,
            timestamp: Utc::now(),
            proof,
            previous_hash,
            transactions,
        };
        state.chain.push(block.clone());

        tracing::debug!(
            index,
            proof,
            transactions = block.transactions.len(),
            "mined audit block"
        );
        Ok(block)
    }

    /// Re-verify the whole chain end to end
    pub fn is_valid(&self) -> Result<bool, AuditError> {
        let state = self.lock()?;
        Ok(validate_chain(&state.chain, self.difficulty))
    }

    /// Every folded transaction touching an account, oldest first, paired
    /// with the index of its enclosing block
    pub fn history_for(&self, account_no: i64) -> Result<Vec<(u64, ChainTransaction)>, AuditError> {
        let state = self.lock()?;
        let mut history = Vec::new();
        for block in &state.chain {
            for transaction in &block.transactions {
                if transaction.from == account_no || transaction.to == account_no {
                    history.push((block.index, transaction.clone()));
                }
            }
        }
        Ok(history)
    }

    /// Snapshot of all blocks for the inspection screen
    pub fn blocks(&self) -> Result<Vec<Block>, AuditError> {
        Ok(self.lock()?.chain.clone())
    }

    pub fn info(&self) -> Result<ChainInfo, AuditError> {
        let state = self.lock()?;
        Ok(ChainInfo {
            blocks: state.chain.len(),
            pending: state.pending.len(),
            total_transactions: state.chain.iter().map(|b| b.transactions.len()).sum(),
            valid: validate_chain(&state.chain, self.difficulty),
        })
    }
}

/// Replay, for every consecutive block pair, both the previous-hash linkage
/// and the proof-of-work predicate. A mismatch invalidates the chain from
/// that point forward.
pub fn validate_chain(chain: &[Block], difficulty: usize) -> bool {
    chain.windows(2).all(|pair| {
        let (previous, block) = (&pair[0], &pair[1]);
        block.previous_hash == previous.hash()
            && HashChain::proof_is_valid(block.proof, previous.proof, difficulty)
    })
}

#[async_trait]
impl AuditTrail for HashChain {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.add_transaction(ChainTransaction {
            from: event.from_account,
            to: event.to_account,
            amount: money::format_amount(event.amount),
            timestamp: Utc::now(),
            remark: event.remark.clone(),
        })?;

        if self.mine_on_record {
            self.mine()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    // Full difficulty 5 takes seconds per block; 2 keeps the suite fast
    // while exercising the same predicate.
    const TEST_DIFFICULTY: usize = 2;

    fn transaction(from: i64, to: i64, amount: &str) -> ChainTransaction {
        ChainTransaction {
            from,
            to,
            amount: amount.to_string(),
            timestamp: Utc::now(),
            remark: "test".to_string(),
        }
    }

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        let info = chain.info().unwrap();
        assert_eq!(info.blocks, 1);
        assert_eq!(info.pending, 0);
        assert!(info.valid);
    }

    #[test]
    fn test_mine_folds_and_clears_pending() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        chain.add_transaction(transaction(1, 2, "250.75")).unwrap();
        chain.add_transaction(transaction(2, 1, "10.00")).unwrap();
        assert_eq!(chain.info().unwrap().pending, 2);

        let block = chain.mine().unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions.len(), 2);

        let info = chain.info().unwrap();
        assert_eq!(info.blocks, 2);
        assert_eq!(info.pending, 0);
        assert_eq!(info.total_transactions, 2);
    }

    #[test]
    fn test_mined_proof_satisfies_predicate() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        let first = chain.mine().unwrap();
        assert!(HashChain::proof_is_valid(first.proof, 1, TEST_DIFFICULTY));

        let second = chain.mine().unwrap();
        assert!(HashChain::proof_is_valid(
            second.proof,
            first.proof,
            TEST_DIFFICULTY
        ));
    }

    #[test]
    fn test_chain_valid_after_several_blocks() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        for i in 0..3 {
            chain.add_transaction(transaction(i, i + 1, "1.00")).unwrap();
            chain.mine().unwrap();
        }
        assert!(chain.is_valid().unwrap());
    }

    #[test]
    fn test_tampered_transaction_invalidates_chain() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        chain.add_transaction(transaction(1, 2, "250.75")).unwrap();
        chain.mine().unwrap();
        chain.add_transaction(transaction(2, 3, "10.00")).unwrap();
        chain.mine().unwrap();

        let mut blocks = chain.blocks().unwrap();
        assert!(validate_chain(&blocks, TEST_DIFFICULTY));

        // rewrite an amount inside an already-sealed block
        blocks[1].transactions[0].amount = "999999.00".to_string();
        assert!(!validate_chain(&blocks, TEST_DIFFICULTY));
    }

    #[test]
    fn test_bad_proof_invalidates_chain() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        chain.mine().unwrap();

        let mut blocks = chain.blocks().unwrap();
        blocks[1].proof = 0;
        // fix up linkage so only the proof predicate can fail
        blocks[1].previous_hash = blocks[0].hash();
        assert!(!validate_chain(&blocks, TEST_DIFFICULTY));
    }

    #[test]
    fn test_history_filters_by_account() {
        let chain = HashChain::new(TEST_DIFFICULTY, false);
        chain.add_transaction(transaction(1, 2, "5.00")).unwrap();
        chain.add_transaction(transaction(3, 4, "7.00")).unwrap();
        chain.mine().unwrap();
        chain.add_transaction(transaction(2, 1, "3.00")).unwrap();
        chain.mine().unwrap();

        let history = chain.history_for(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0, 2); // block index of the first entry
        assert_eq!(history[1].1.amount, "3.00");

        assert!(chain.history_for(99).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_mines_when_configured() {
        let chain = HashChain::new(TEST_DIFFICULTY, true);
        let event = AuditEvent {
            from_account: 1,
            to_account: 2,
            amount: Decimal::new(25075, 2),
            remark: "rent".to_string(),
        };
        chain.record(&event).await.unwrap();

        let info = chain.info().unwrap();
        assert_eq!(info.blocks, 2);
        assert_eq!(info.pending, 0);
        assert_eq!(info.total_transactions, 1);

        let history = chain.history_for(2).unwrap();
        assert_eq!(history[0].1.amount, "250.75");
    }
}
