//! Block structure.

use crate::address::Address;
use crate::hash::Hash;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp stamped on the genesis block.
///
/// Fixed so that every instance running the same parameters derives
/// the same genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 1_600_000_000;

/// A block of packaged transactions.
///
/// A freshly built block carries candidate transactions and zeroed
/// proof fields; packaging fills in `txs` (successes only), `nonce`,
/// `hash`, and `miner`. Committed blocks are immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unix timestamp (seconds) of block creation.
    pub timestamp: i64,
    /// Hash of the previous block; zero for genesis.
    pub prev_hash: Hash,
    /// Transactions packaged into this block, in execution order.
    pub txs: Vec<Transaction>,
    /// Proof-of-work nonce.
    pub nonce: i64,
    /// Proof-of-work digest of this block.
    pub hash: Hash,
    /// Address credited with the block award.
    pub miner: Address,
}

impl Block {
    /// Create a block candidate whose transactions are not yet packaged
    /// and whose proof of work is not yet computed.
    pub fn new(txs: Vec<Transaction>, prev_hash: Hash) -> Self {
        Self {
            timestamp: Self::current_timestamp(),
            prev_hash,
            txs,
            nonce: 0,
            hash: Hash::ZERO,
            miner: Address::ZERO,
        }
    }

    /// The genesis template: no transactions, zero predecessor, fixed
    /// timestamp. Its proof of work is computed by the consensus layer.
    pub fn genesis_template() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            prev_hash: Hash::ZERO,
            txs: Vec::new(),
            nonce: 0,
            hash: Hash::ZERO,
            miner: Address::ZERO,
        }
    }

    /// Whether this block is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == Hash::ZERO && self.txs.is_empty()
    }

    /// Get the current Unix timestamp in seconds.
    pub fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_secs() as i64
    }
}
