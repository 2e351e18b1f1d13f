//! Blockchain orchestration for memochain.
//!
//! This crate brings together all components to create a working
//! single-node chain:
//! - **Mempool**: FIFO pool of admitted transactions with asynchronous
//!   persistence
//! - **Executor**: transaction execution with compensating rollback
//! - **Packager**: the execute → prove → credit → commit protocol
//! - **Blockchain**: the orchestrator tying the stores together
//! - **Miner**: the background mining loop

pub mod blockchain;
pub mod executor;
pub mod mempool;
pub mod miner;
pub mod packager;

// Re-export commonly used types
pub use blockchain::{
    Blockchain, BlockchainError, BlocksIter, ChainConfig, Result, DEFAULT_NUMBER_OF_TXS_IN_BLOCK,
};
pub use executor::{ExecutionError, Executor, MAX_RETRY_OF_EXECUTION};
pub use mempool::{MempoolStore, MAX_RETRY_OF_FLUSHING};
pub use miner::{Miner, MINING_BACKOFF};
pub use packager::{package, PackageError, MINER_AWARD_FOR_ONE_BLOCK};
