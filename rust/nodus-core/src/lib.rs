// Nodus Core - Peer networking and consistency engine
// Principle: A node is peers, a wire format, storage and a mempool; nothing more

pub mod cli;
pub mod mempool;
pub mod network;
pub mod node;
pub mod protocol;
pub mod storage;
pub mod types;
pub mod wire;

#[cfg(test)]
mod tests;
