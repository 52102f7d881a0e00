// Mempool - Admission des transactions en attente
// Principe: Une dépense en attente compte comme une dépense faite

pub mod pool;
pub mod verification;

pub use pool::{MemoryPool, MempoolError, DEFAULT_MEMPOOL_CAPACITY};
pub use verification::{TransactionVerificationContext, VerificationError};
