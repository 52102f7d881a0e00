// Verification context - Dépenses en attente par émetteur
// Principle: Admission counts every pending fee of a sender, not just the new one

use crate::storage::{GasBalance, StorageError};
use crate::types::{FeeTotal, Transaction, UInt256};
use std::collections::HashMap;

/// Caller bugs: the context was asked to account for something it cannot
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Transaction {0} has no sender")]
    SenderUndefined(UInt256),

    #[error("Transaction {0} is not present in the verification context")]
    TransactionNotPresent(UInt256),
}

/// Running fee total per sender for one admission cycle
///
/// Keys are the senders' hex hashes. An entry exists only while its total is
/// non-zero, so a balanced sequence of adds and removes leaves the map empty.
/// Totals are kept in `FeeTotal` and stay exact however many maximal fees pile up.
#[derive(Debug, Default)]
pub struct TransactionVerificationContext {
    sender_fees: HashMap<String, FeeTotal>,
}

impl TransactionVerificationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending fee total for `sender_hex`, zero when absent
    pub fn pending_fee(&self, sender_hex: &str) -> FeeTotal {
        self.sender_fees.get(sender_hex).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.sender_fees.is_empty()
    }

    /// Number of senders with pending spend
    pub fn sender_count(&self) -> usize {
        self.sender_fees.len()
    }

    pub fn add_transaction(&mut self, tx: &Transaction) -> Result<(), VerificationError> {
        let sender = tx.sender().ok_or_else(|| VerificationError::SenderUndefined(tx.hash()))?;
        let fee = tx.total_fee();
        if fee == 0 {
            return Ok(());
        }
        *self.sender_fees.entry(sender.to_hex()).or_insert(0) += fee;
        Ok(())
    }

    /// Whether the sender's balance covers everything pending plus `tx`
    ///
    /// A transaction without sender is never admissible.
    pub async fn check_transaction<S>(&self, tx: &Transaction, storage: &S) -> Result<bool, StorageError>
    where
        S: GasBalance + ?Sized,
    {
        let Some(sender) = tx.sender() else {
            return Ok(false);
        };
        let balance = storage.gas_balance(&sender).await?;
        let required = self.pending_fee(&sender.to_hex()) + tx.total_fee();
        Ok(FeeTotal::from(balance) >= required)
    }

    /// Reverse a previous `add_transaction`; fee-free transactions leave no trace to reverse
    pub fn remove_transaction(&mut self, tx: &Transaction) -> Result<(), VerificationError> {
        let sender = tx.sender().ok_or_else(|| VerificationError::SenderUndefined(tx.hash()))?;
        let fee = tx.total_fee();
        if fee == 0 {
            return Ok(());
        }
        let key = sender.to_hex();
        let total = self
            .sender_fees
            .get_mut(&key)
            .ok_or_else(|| VerificationError::TransactionNotPresent(tx.hash()))?;
        if *total < fee {
            return Err(VerificationError::TransactionNotPresent(tx.hash()));
        }

        *total -= fee;
        if *total == 0 {
            self.sender_fees.remove(&key);
        }
        Ok(())
    }
}
