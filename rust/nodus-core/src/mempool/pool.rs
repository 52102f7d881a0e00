// Memory pool - Transactions en attente, admises selon le solde de l'émetteur
//
// - Keyed by transaction hash, bounded by a capacity
// - One lock covers the balance check and the insertion, so two transactions
//   from the same sender can never both pass on the same budget

use super::verification::{TransactionVerificationContext, VerificationError};
use crate::storage::{GasBalance, StorageError};
use crate::types::{Block, FeeTotal, Gas, Transaction, UInt160, UInt256};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Default pool capacity
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 50_000;

/// Pool errors
#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    #[error("Transaction {0} already in pool")]
    AlreadyExists(UInt256),

    #[error("Pool is full ({capacity} transactions)")]
    PoolFull { capacity: usize },

    #[error("Insufficient balance for {sender}: pending spend would exceed {balance}")]
    InsufficientBalance { sender: UInt160, balance: Gas },

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Default)]
struct PoolState {
    transactions: HashMap<UInt256, Transaction>,
    context: TransactionVerificationContext,
}

pub struct MemoryPool {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.transactions.is_empty()
    }

    pub async fn contains(&self, hash: &UInt256) -> bool {
        self.state.lock().await.transactions.contains_key(hash)
    }

    pub async fn get(&self, hash: &UInt256) -> Option<Transaction> {
        self.state.lock().await.transactions.get(hash).cloned()
    }

    pub async fn hashes(&self) -> Vec<UInt256> {
        self.state.lock().await.transactions.keys().copied().collect()
    }

    /// Fees pending in the pool for `sender`
    pub async fn pending_fee(&self, sender: &UInt160) -> FeeTotal {
        self.state.lock().await.context.pending_fee(&sender.to_hex())
    }

    /// Admit `tx` if its sender can pay for it on top of everything already pending
    pub async fn try_add<S>(&self, tx: Transaction, storage: &S) -> Result<(), MempoolError>
    where
        S: GasBalance + ?Sized,
    {
        let hash = tx.hash();
        let sender = tx
            .sender()
            .ok_or(MempoolError::Verification(VerificationError::SenderUndefined(hash)))?;

        let mut state = self.state.lock().await;
        if state.transactions.contains_key(&hash) {
            return Err(MempoolError::AlreadyExists(hash));
        }
        if state.transactions.len() >= self.capacity {
            return Err(MempoolError::PoolFull {
                capacity: self.capacity,
            });
        }

        if !state.context.check_transaction(&tx, storage).await? {
            let balance = storage.gas_balance(&sender).await?;
            debug!("Rejected tx {}: insufficient balance for {}", hash, sender);
            return Err(MempoolError::InsufficientBalance { sender, balance });
        }

        state.context.add_transaction(&tx)?;
        state.transactions.insert(hash, tx);
        debug!("Added tx {} to mempool ({} pending)", hash, state.transactions.len());
        Ok(())
    }

    /// Drop a transaction and release its pending spend
    pub async fn remove(&self, hash: &UInt256) -> Result<Option<Transaction>, MempoolError> {
        let mut state = self.state.lock().await;
        let Some(tx) = state.transactions.remove(hash) else {
            return Ok(None);
        };
        state.context.remove_transaction(&tx)?;
        Ok(Some(tx))
    }

    /// Drop every pooled transaction the block confirms; returns how many were pooled
    pub async fn remove_block_transactions(&self, block: &Block) -> Result<usize, MempoolError> {
        let mut state = self.state.lock().await;
        let mut removed = 0;
        for tx in block.transactions() {
            if let Some(pooled) = state.transactions.remove(&tx.hash()) {
                state.context.remove_transaction(&pooled)?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Removed {} txs confirmed in block #{}", removed, block.index());
        }
        Ok(removed)
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new(DEFAULT_MEMPOOL_CAPACITY)
    }
}
