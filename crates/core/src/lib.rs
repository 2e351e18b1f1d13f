//! Core primitives for memochain.
//!
//! This crate provides the fundamental types used throughout the chain:
//! - Identity primitives (addresses, SHA-256 hashes, hex codecs)
//! - Account state with per-address message logs
//! - Transactions with derived fees and binding hashes
//! - Blocks

pub mod account;
pub mod address;
pub mod block;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use account::Account;
pub use address::{Address, AddressBytes};
pub use block::{Block, GENESIS_TIMESTAMP};
pub use hash::{int_to_hex, sha256, Hash, HexError, H256};
pub use transaction::{
    Transaction, TransactionError, AMOUNT_FEE_RATIO, DATA_FEE_RATIO, MAX_LENGTH_OF_DATA,
};
