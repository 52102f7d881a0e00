// Types fondamentaux de Nodus
// Principe: Minimal, auditable, encodage canonique

pub mod primitives;
pub mod witness;
pub mod transaction;
pub mod block;
pub mod merkle;

pub use primitives::*;
pub use witness::*;
pub use transaction::*;
pub use block::*;
pub use merkle::*;
