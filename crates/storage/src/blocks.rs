//! Persistent block storage and chain tip tracking.

use crate::db::{KvStore, Result, StorageError};
use memochain_core::{Block, Hash};
use memochain_consensus::genesis_block;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use std::path::Path;

/// Database file name under the data directory.
pub const BLOCKS_DB_FILE: &str = "blocks.db";
/// Bucket holding hash → block rows plus the tip row.
pub const BLOCKS_BUCKET: &str = "blocks_bucket";
/// Well-known key whose value is the hash of the most recent block.
pub const LAST_BLOCK_HASH_KEY: &[u8] = b"last_block_hash";
/// Retry budget for committing a block.
pub const MAX_RETRY_OF_ADDING_BLOCK: usize = 5;

/// Persistent mapping from block hash to block, tracking the chain tip.
pub struct BlockStore {
    kv: KvStore,
}

impl BlockStore {
    /// Open the store, writing the genesis block and tip on first use.
    pub fn open<P: AsRef<Path>>(data_dir: P, target_bits: u32) -> Result<Self> {
        let kv = KvStore::open(data_dir.as_ref().join(BLOCKS_DB_FILE), BLOCKS_BUCKET)?;
        let store = Self { kv };
        store.init_genesis(target_bits)?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_temporary(target_bits: u32) -> Result<Self> {
        let kv = KvStore::open_temporary(BLOCKS_BUCKET)?;
        let store = Self { kv };
        store.init_genesis(target_bits)?;
        Ok(store)
    }

    fn init_genesis(&self, target_bits: u32) -> Result<()> {
        if !self.kv.is_empty() {
            return Ok(());
        }
        let genesis = genesis_block(target_bits);
        self.kv.transaction(|tx| {
            tx.insert(&genesis.hash.as_bytes()[..], encode(&genesis)?)?;
            tx.insert(LAST_BLOCK_HASH_KEY, &genesis.hash.as_bytes()[..])?;
            Ok(())
        })
    }

    /// Fetch a block by hash.
    pub fn block(&self, hash: Hash) -> Result<Block> {
        self.kv
            .get(hash)?
            .ok_or(StorageError::BlockNotFound(hash))
    }

    /// Whether a block with this hash exists.
    pub fn contains(&self, hash: Hash) -> Result<bool> {
        self.kv.contains(hash)
    }

    /// Hash of the most recent committed block.
    pub fn tip(&self) -> Result<Hash> {
        self.kv
            .get(LAST_BLOCK_HASH_KEY)?
            .ok_or(StorageError::MissingTip)
    }

    /// Store the block and advance the tip, atomically.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        self.kv.transaction(|tx| {
            tx.insert(&block.hash.as_bytes()[..], encode(block)?)?;
            tx.insert(LAST_BLOCK_HASH_KEY, &block.hash.as_bytes()[..])?;
            Ok(())
        })
    }

    /// [`BlockStore::append_block`] retried up to `max_retry` times.
    pub fn append_block_with_retry(&self, block: &Block, max_retry: usize) -> Result<()> {
        let mut last = Ok(());
        for _ in 0..max_retry {
            match self.append_block(block) {
                Ok(()) => return Ok(()),
                Err(e) => last = Err(e),
            }
        }
        last
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.kv.flush()
    }
}

fn encode(block: &Block) -> ConflictableTransactionResult<Vec<u8>, StorageError> {
    bincode::serialize(block)
        .map_err(|e| ConflictableTransactionError::Abort(StorageError::Serialization(e)))
}
