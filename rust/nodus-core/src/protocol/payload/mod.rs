// Payloads des messages du protocole

mod addr;
mod filter;
mod get_blocks;
mod headers;
mod inv;
mod merkle_block;
mod ping;
mod version;

pub use addr::{AddrPayload, NetworkAddressWithTime, MAX_ADDRESS_COUNT};
pub use filter::{FilterAddPayload, FilterLoadPayload, MAX_FILTER_ELEMENT_SIZE, MAX_FILTER_SIZE, MAX_HASH_FUNCTIONS};
pub use get_blocks::{GetBlocksPayload, MAX_LOCATOR_HASHES};
pub use headers::{HeadersPayload, MAX_HEADERS_COUNT};
pub use inv::{InvPayload, InventoryType, MAX_INVENTORY_HASHES};
pub use merkle_block::MerkleBlockPayload;
pub use ping::PingPayload;
pub use version::{VersionPayload, MAX_USER_AGENT_SIZE};
