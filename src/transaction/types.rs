//! Transaction types for PeerLedger

use crate::crypto::CanonicalHasher;

/// Sender value reserved for reward-minting transactions
pub const COINBASE_SENDER: &str = "coinbase";

/// Maximum encoded transaction size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

/// A value transfer between two addresses.
///
/// Transactions carry no signature: the sender identity is trusted as given.
/// Admission rules live in [`validation`](super::validation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: i64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Reward-minting transaction crediting `recipient`
    pub fn coinbase(recipient: impl Into<String>, amount: i64) -> Self {
        Self::new(COINBASE_SENDER, recipient, amount)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Content identifier: equal field values always give the same id.
    pub fn id(&self) -> String {
        CanonicalHasher::new()
            .field_str("sender", &self.sender)
            .field_str("recipient", &self.recipient)
            .field_i64("amount", self.amount)
            .finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_deterministic() {
        let a = Transaction::new("faucet", "alice", 200);
        let b = Transaction {
            amount: 200,
            recipient: "alice".to_string(),
            sender: "faucet".to_string(),
        };
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_id_changes_with_amount() {
        let a = Transaction::new("faucet", "alice", 200);
        let b = Transaction::new("faucet", "alice", 201);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_swapping_parties_changes_id() {
        let a = Transaction::new("alice", "bob", 1);
        let b = Transaction::new("bob", "alice", 1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_coinbase_constructor() {
        let tx = Transaction::coinbase("miner", 50);
        assert!(tx.is_coinbase());
        assert_eq!(tx.recipient, "miner");
        assert!(!Transaction::new("miner", "x", 1).is_coinbase());
    }
}
