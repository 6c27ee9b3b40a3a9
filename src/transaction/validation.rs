//! Admission rules for transactions, separated from type definitions

use crate::error::ChainError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Stateless checks: positive amount and a real (non-coinbase) sender.
    pub fn validate_shape(&self) -> Result<(), ChainError> {
        if self.amount <= 0 {
            return Err(ChainError::InvalidAmount(self.amount));
        }
        if self.is_coinbase() {
            return Err(ChainError::ReservedSender);
        }
        Ok(())
    }

    /// Full admission check against the sender's balance before this transaction.
    pub fn validate_admission(&self, available: i64) -> Result<(), ChainError> {
        self.validate_shape()?;
        if available < self.amount {
            return Err(ChainError::InsufficientBalance {
                address: self.sender.clone(),
                available,
                required: self.amount,
            });
        }
        Ok(())
    }
}
