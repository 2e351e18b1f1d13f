//! Persistent storage layer for memochain.
//!
//! Four independent sled databases live under the data directory, one
//! per store. Each store offers per-bucket atomic read-modify-write
//! operations; nothing coordinates writes across stores — the chain
//! layer compensates when a multi-store step fails partway.
//!
//! - [`AccountStore`] — address → balance + message log
//! - [`BlockStore`] — hash → block, plus the chain tip row
//! - [`TransactionStore`] — archive of packaged transactions
//! - [`KvStore`] — the shared sled wrapper underneath them

pub mod accounts;
pub mod blocks;
pub mod db;
pub mod txs;

// Re-export commonly used types
pub use accounts::{AccountStore, INITIAL_ACCOUNT_BALANCE};
pub use blocks::{BlockStore, MAX_RETRY_OF_ADDING_BLOCK};
pub use db::{KvStore, Result, StorageError};
pub use txs::TransactionStore;
