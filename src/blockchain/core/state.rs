use crate::transaction::Transaction;
use std::collections::HashMap;

use super::chain::Block;

/// Balances derived by replaying transactions as signed deltas.
///
/// Coinbase senders are never debited. Addresses never seen read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BalanceSheet {
    pub balances: HashMap<String, i64>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay every transaction of `blocks` in chain order.
    pub fn replay(blocks: &[Block]) -> Self {
        let mut sheet = Self::new();
        for block in blocks {
            sheet.apply_block(block);
        }
        sheet
    }

    pub fn get_balance(&self, address: &str) -> i64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Apply a transaction without any sufficiency check.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        if !tx.is_coinbase() {
            let sender = self.balances.entry(tx.sender.clone()).or_insert(0);
            *sender = sender.saturating_sub(tx.amount);
        }
        let recipient = self.balances.entry(tx.recipient.clone()).or_insert(0);
        *recipient = recipient.saturating_add(tx.amount);
    }

    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply_transaction(tx);
        }
    }

    /// Apply a transaction only if a non-coinbase sender can cover it
    /// with a positive amount. Returns whether it was applied.
    pub fn try_apply(&mut self, tx: &Transaction) -> bool {
        if !tx.is_coinbase() && (tx.amount <= 0 || self.get_balance(&tx.sender) < tx.amount) {
            return false;
        }
        if self.credit_overflows(tx) {
            return false;
        }
        self.apply_transaction(tx);
        true
    }

    /// True when crediting `tx` would take its recipient outside the `i64` range.
    pub fn credit_overflows(&self, tx: &Transaction) -> bool {
        if !tx.is_coinbase() && tx.sender == tx.recipient {
            return false;
        }
        self.get_balance(&tx.recipient).checked_add(tx.amount).is_none()
    }
}
