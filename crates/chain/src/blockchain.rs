//! Main blockchain orchestration.
//!
//! Brings the stores, the mempool, and the packaging protocol together
//! behind the two top-level operations: admitting a transaction and
//! mining a block.

use crate::mempool::MempoolStore;
use crate::packager::{package, PackageError};
use memochain_consensus::{CancelToken, PowError, TARGET_BITS};
use memochain_core::{Account, Address, Block, Hash, Transaction};
use memochain_storage::{AccountStore, BlockStore, StorageError, TransactionStore};
use std::path::PathBuf;
use thiserror::Error;

/// How many transactions one mining attempt drains from the pool.
pub const DEFAULT_NUMBER_OF_TXS_IN_BLOCK: usize = 10;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("packaging error: {0}")]
    Package(#[from] PackageError),

    #[error(
        "your balance ({balance}) is not enough to cover the fee ({fee}) and amount ({amount})"
    )]
    InsufficientBalance { balance: i64, fee: i64, amount: i64 },

    #[error("there is no transaction in the pool")]
    EmptyPool,
}

impl BlockchainError {
    /// Whether this failure is a requested stop rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Package(PackageError::Pow(PowError::Cancelled)))
    }
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Blockchain configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Directory holding the four store databases.
    pub data_dir: PathBuf,
    /// Mining difficulty.
    pub target_bits: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            target_bits: TARGET_BITS,
        }
    }
}

/// The blockchain: account ledger, block store, transaction archive,
/// and mempool, coordinated by compensation rather than by a shared
/// transaction.
pub struct Blockchain {
    accounts: AccountStore,
    blocks: BlockStore,
    archive: TransactionStore,
    mempool: MempoolStore,
    target_bits: u32,
}

impl Blockchain {
    /// Open (or create) all four stores under the configured directory.
    pub fn open(config: ChainConfig) -> Result<Self> {
        let accounts = AccountStore::open(&config.data_dir)?;
        let blocks = BlockStore::open(&config.data_dir, config.target_bits)?;
        let archive = TransactionStore::open(&config.data_dir)?;
        let mempool = MempoolStore::open(&config.data_dir)?;
        Ok(Self {
            accounts,
            blocks,
            archive,
            mempool,
            target_bits: config.target_bits,
        })
    }

    /// Open an in-memory instance (for testing).
    pub fn open_temporary(target_bits: u32) -> Result<Self> {
        Ok(Self {
            accounts: AccountStore::open_temporary()?,
            blocks: BlockStore::open_temporary(target_bits)?,
            archive: TransactionStore::open_temporary()?,
            mempool: MempoolStore::open_temporary()?,
            target_bits,
        })
    }

    /// Admit a transaction into the pool.
    ///
    /// The balance check here is advisory — concurrent admissions can
    /// over-commit a balance; execution re-checks authoritatively when
    /// the transaction is packaged.
    pub fn send_transaction(&self, tx: Transaction) -> Result<()> {
        let balance = self.accounts.balance_of(tx.from)?;
        if balance < tx.cost() {
            return Err(BlockchainError::InsufficientBalance {
                balance,
                fee: tx.fee,
                amount: tx.amount,
            });
        }
        self.mempool.add_txs(vec![tx]);
        Ok(())
    }

    /// Drain up to [`DEFAULT_NUMBER_OF_TXS_IN_BLOCK`] transactions,
    /// package them into a block on the current tip, and commit it.
    ///
    /// On success the packaged transactions leave the pool and any that
    /// failed execution return to its left end. On failure the pool and
    /// the tip are untouched.
    pub fn mine_block(&self, miner: Address, cancel: &CancelToken) -> Result<Block> {
        let candidates = self.mempool.some_txs(DEFAULT_NUMBER_OF_TXS_IN_BLOCK);
        if candidates.is_empty() {
            return Err(BlockchainError::EmptyPool);
        }
        let peeked = candidates.len();

        let mut block = Block::new(candidates, self.blocks.tip()?);
        let not_packaged = package(
            &mut block,
            miner,
            self.target_bits,
            cancel,
            &self.accounts,
            &self.blocks,
            &self.archive,
        )?;

        self.mempool.delete_some_txs(peeked);
        self.mempool.left_add_txs(not_packaged);
        Ok(block)
    }

    /// Account state of an address (materializing it if new).
    pub fn account_of(&self, addr: Address) -> Result<Account> {
        Ok(self.accounts.account_of(addr)?)
    }

    /// Balance of an address.
    pub fn balance_of(&self, addr: Address) -> Result<i64> {
        Ok(self.accounts.balance_of(addr)?)
    }

    /// Fetch a committed block by hash.
    pub fn block(&self, hash: Hash) -> Result<Block> {
        Ok(self.blocks.block(hash)?)
    }

    /// Hash of the most recent committed block.
    pub fn tip(&self) -> Result<Hash> {
        Ok(self.blocks.tip()?)
    }

    /// Look a transaction up in the archive, falling back to the pool
    /// for transactions that are admitted but not yet packaged.
    pub fn transaction(&self, hash: Hash) -> Result<Transaction> {
        match self.archive.transaction(hash) {
            Ok(tx) => Ok(tx),
            Err(StorageError::TransactionNotFound(_)) => self
                .mempool
                .all_txs()
                .into_iter()
                .find(|tx| tx.hash == hash)
                .ok_or(BlockchainError::Storage(
                    StorageError::TransactionNotFound(hash),
                )),
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot of the pending pool, oldest first.
    pub fn pool_txs(&self) -> Vec<Transaction> {
        self.mempool.all_txs()
    }

    /// Iterate blocks from the tip back to genesis.
    pub fn blocks_iter(&self) -> BlocksIter<'_> {
        BlocksIter {
            current: self.blocks.tip().ok(),
            blocks: &self.blocks,
        }
    }

    /// Close the pool (awaiting in-flight flushes) and flush the stores.
    pub fn close(mut self) -> Result<()> {
        self.mempool.close();
        self.accounts.flush()?;
        self.blocks.flush()?;
        self.archive.flush()?;
        Ok(())
    }
}

/// Walks the chain from the tip back to genesis along `prev_hash`.
///
/// The iterator is finite and not restartable; create a new one per
/// walk.
pub struct BlocksIter<'a> {
    current: Option<Hash>,
    blocks: &'a BlockStore,
}

impl Iterator for BlocksIter<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current?;
        match self.blocks.block(hash) {
            Ok(block) => {
                self.current = if block.prev_hash == Hash::ZERO {
                    None
                } else {
                    Some(block.prev_hash)
                };
                Some(Ok(block))
            }
            Err(e) => {
                self.current = None;
                Some(Err(e.into()))
            }
        }
    }
}
