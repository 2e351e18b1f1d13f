//! Proof-of-work consensus for memochain.
//!
//! This crate provides the nonce search run during block packaging,
//! validation of committed blocks, the cancellation token that makes
//! stopping a miner prompt, and the deterministic genesis block.

pub mod pow;

// Re-export commonly used types
pub use pow::{genesis_block, CancelToken, PowError, ProofOfWork, TARGET_BITS, U256};
