use crate::config::LedgerConfig;
use crate::crypto::{zero_hash, CanonicalHasher};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner::mine_block;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use tracing::{debug, info};

use super::state::BalanceSheet;
use super::validation::{validate_block, validate_chain, BlockRejection};

/// Fixed genesis timestamp so that identically configured nodes share a genesis hash.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    /// Content hash, set once mining (or genesis sealing) completes
    pub hash: Option<String>,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        difficulty: u32,
    ) -> Self {
        Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            difficulty,
            hash: None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Digest committing to the ordered transaction list.
    pub fn transactions_root(transactions: &[Transaction]) -> String {
        let mut hasher = Sha256::new();
        for tx in transactions {
            hasher.update(tx.id().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Hash over every field except `hash` itself.
    pub fn content_hash(&self) -> String {
        self.content_hash_with_root(&Self::transactions_root(&self.transactions))
    }

    /// Same as [`content_hash`](Self::content_hash) with a precomputed transactions root.
    pub fn content_hash_with_root(&self, transactions_root: &str) -> String {
        CanonicalHasher::new()
            .field_u64("index", self.index)
            .field_u64("timestamp", self.timestamp)
            .field_str("transactions", transactions_root)
            .field_str("previous_hash", &self.previous_hash)
            .field_u64("nonce", self.nonce)
            .field_u64("difficulty", u64::from(self.difficulty))
            .finalize()
    }

    pub fn hash_str(&self) -> &str {
        self.hash.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub difficulty: u32,
    pub block_reward: i64,
    pub mempool: Mempool,
    /// Confirmed balances at the current tip
    pub state: BalanceSheet,
}

impl Blockchain {
    /// Create a ledger holding only the genesis block.
    pub fn new(config: &LedgerConfig) -> Self {
        let genesis = Self::create_genesis_block(config);
        let state = BalanceSheet::replay(std::slice::from_ref(&genesis));
        Blockchain {
            blocks: vec![genesis],
            difficulty: config.difficulty,
            block_reward: config.block_reward,
            mempool: Mempool::with_capacity_limit(config.max_pending_transactions),
            state,
        }
    }

    /// Genesis funds the faucet and is sealed without a proof-of-work search.
    pub fn create_genesis_block(config: &LedgerConfig) -> Block {
        let transactions = vec![Transaction::coinbase(
            config.faucet_address.clone(),
            config.faucet_allocation,
        )];
        let mut genesis = Block::new(
            0,
            GENESIS_TIMESTAMP,
            transactions,
            zero_hash(),
            config.difficulty,
        );
        genesis.hash = Some(genesis.content_hash());
        genesis
    }

    pub fn last_block(&self) -> &Block {
        // The chain always holds at least genesis.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.last_block().index
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    /// Balance over the confirmed chain plus the pending pool. Unknown addresses are 0.
    pub fn get_balance(&self, address: &str) -> i64 {
        self.state
            .get_balance(address)
            .saturating_add(self.mempool.pending_delta(address))
    }

    /// Admit a transfer into the pending pool and return its identifier.
    pub fn add_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: i64,
    ) -> Result<String, ChainError> {
        let tx = Transaction::new(sender, recipient, amount);
        tx.validate_admission(self.get_balance(sender))?;
        let id = tx.id();
        self.mempool.add_transaction(tx)?;
        debug!(%sender, %recipient, amount, id = %id, "transaction admitted");
        Ok(id)
    }

    /// Unmined block extending the tip: reward first, then every pending transaction.
    pub fn next_candidate(&self, miner_address: &str) -> Block {
        let last = self.last_block();
        let mut transactions = Vec::with_capacity(self.mempool.len() + 1);
        transactions.push(Transaction::coinbase(miner_address, self.block_reward));
        transactions.extend_from_slice(self.mempool.transactions());

        let timestamp = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let previous_hash = last.hash.clone().unwrap_or_else(|| last.content_hash());
        Block::new(last.index + 1, timestamp, transactions, previous_hash, self.difficulty)
    }

    /// Append a block mined from [`next_candidate`](Self::next_candidate) and
    /// drop its transactions from the pending pool.
    pub fn commit_mined(&mut self, block: Block) -> Result<(), ChainError> {
        let outcome = validate_block(&self.state, &block, Some(self.last_block()));
        let next_state = outcome.map_err(|reason| match reason {
            BlockRejection::PreviousHashMismatch { .. } | BlockRejection::IndexMismatch { .. } => {
                ChainError::StaleTip
            }
            other => ChainError::InvalidBlock(other.to_string()),
        })?;
        self.mempool.remove_included(&block.transactions);
        self.blocks.push(block);
        self.state = next_state;
        Ok(())
    }

    /// Mine the pending pool into a new block credited to `miner_address`.
    pub fn mine_block(&mut self, miner_address: &str) -> Result<Block, ChainError> {
        let candidate = self.next_candidate(miner_address);
        let block = mine_block(candidate)?;
        self.commit_mined(block.clone())?;
        info!(
            index = block.index,
            hash = %block.hash_str(),
            nonce = block.nonce,
            transactions = block.transactions.len(),
            "mined block"
        );
        Ok(block)
    }

    /// Append a block received from a peer if it extends the tip.
    /// Clears the pending pool on success.
    pub fn append_block(&mut self, block: Block) -> bool {
        let outcome = validate_block(&self.state, &block, Some(self.last_block()));
        match outcome {
            Ok(next_state) => {
                debug!(index = block.index, hash = %block.hash_str(), "appended peer block");
                self.blocks.push(block);
                self.state = next_state;
                self.mempool.clear();
                true
            }
            Err(reason) => {
                debug!(index = block.index, %reason, "rejected peer block");
                false
            }
        }
    }

    /// Validate `block` against `prev` using the balances of this chain's
    /// prefix before `block.index`.
    pub fn valid_block(&self, block: &Block, prev: Option<&Block>) -> bool {
        let prefix_len = usize::try_from(block.index)
            .unwrap_or(usize::MAX)
            .min(self.blocks.len());
        let prefix_state = if prefix_len == self.blocks.len() {
            Cow::Borrowed(&self.state)
        } else {
            Cow::Owned(BalanceSheet::replay(&self.blocks[..prefix_len]))
        };

        match validate_block(&prefix_state, block, prev) {
            Ok(_) => true,
            Err(reason) => {
                debug!(index = block.index, %reason, "block failed validation");
                false
            }
        }
    }

    /// Validate a candidate chain from scratch.
    pub fn valid_chain(&self, chain: &[Block]) -> bool {
        match validate_chain(chain) {
            Ok(_) => true,
            Err((position, reason)) => {
                debug!(position, %reason, "chain failed validation");
                false
            }
        }
    }

    /// Adopt `candidate` if it is strictly longer and valid. The ledger keeps
    /// its own copy; the pending pool is cleared on adoption.
    pub fn replace_chain(&mut self, candidate: &[Block]) -> bool {
        if candidate.len() <= self.blocks.len() {
            return false;
        }
        match validate_chain(candidate) {
            Ok(state) => {
                info!(
                    old_len = self.blocks.len(),
                    new_len = candidate.len(),
                    "replaced chain with longer valid chain"
                );
                self.blocks = candidate.to_vec();
                self.state = state;
                self.mempool.clear();
                true
            }
            Err((position, reason)) => {
                debug!(position, %reason, "refused replacement chain");
                false
            }
        }
    }
}
