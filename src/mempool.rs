//! Pending-transaction pool
//!
//! Holds admitted transactions in arrival order until they are mined into a
//! block or discarded by a chain switch. The pool is bounded; admission past
//! the bound fails with [`ChainError::MempoolFull`].

use crate::error::ChainError;
use crate::transaction::Transaction;

/// Default upper bound on pending transactions
pub const DEFAULT_MAX_PENDING: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Mempool {
    transactions: Vec<Transaction>,
    max_size: usize,
}

impl Mempool {
    pub fn new() -> Self {
        Self::with_capacity_limit(DEFAULT_MAX_PENDING)
    }

    pub fn with_capacity_limit(max_size: usize) -> Self {
        Mempool {
            transactions: Vec::new(),
            max_size,
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if self.transactions.len() >= self.max_size {
            return Err(ChainError::MempoolFull(self.max_size));
        }
        self.transactions.push(tx);
        Ok(())
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }

    /// Drop one pending entry for each transaction in `included`.
    ///
    /// Identical transfers share an id, so removal is by occurrence rather
    /// than by id: two pending copies and one included copy leave one behind.
    pub fn remove_included(&mut self, included: &[Transaction]) {
        for tx in included.iter().filter(|tx| !tx.is_coinbase()) {
            if let Some(pos) = self.transactions.iter().position(|p| p == tx) {
                self.transactions.remove(pos);
            }
        }
    }

    /// Net effect of pending transactions on `address`.
    pub fn pending_delta(&self, address: &str) -> i64 {
        let mut delta = 0i64;
        for tx in &self.transactions {
            if !tx.is_coinbase() && tx.sender == address {
                delta = delta.saturating_sub(tx.amount);
            }
            if tx.recipient == address {
                delta = delta.saturating_add(tx.amount);
            }
        }
        delta
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_admission() {
        let mut pool = Mempool::with_capacity_limit(2);
        pool.add_transaction(Transaction::new("a", "b", 1)).unwrap();
        pool.add_transaction(Transaction::new("a", "b", 2)).unwrap();
        assert_eq!(
            pool.add_transaction(Transaction::new("a", "b", 3)),
            Err(ChainError::MempoolFull(2))
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_remove_included_by_occurrence() {
        let mut pool = Mempool::new();
        let tx = Transaction::new("a", "b", 5);
        pool.add_transaction(tx.clone()).unwrap();
        pool.add_transaction(tx.clone()).unwrap();
        pool.add_transaction(Transaction::new("b", "c", 1)).unwrap();

        pool.remove_included(&[Transaction::coinbase("m", 50), tx.clone()]);

        assert_eq!(pool.transactions(), &[tx, Transaction::new("b", "c", 1)]);
    }

    #[test]
    fn test_pending_delta() {
        let mut pool = Mempool::new();
        pool.add_transaction(Transaction::new("a", "b", 5)).unwrap();
        pool.add_transaction(Transaction::new("b", "a", 2)).unwrap();
        assert_eq!(pool.pending_delta("a"), -3);
        assert_eq!(pool.pending_delta("b"), 3);
        assert_eq!(pool.pending_delta("c"), 0);
    }
}
