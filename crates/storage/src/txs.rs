//! Archive of packaged transactions.

use crate::db::{KvStore, Result, StorageError};
use memochain_core::{Hash, Transaction};
use std::path::Path;

/// Database file name under the data directory.
pub const TRANSACTIONS_DB_FILE: &str = "transactions.db";
/// Bucket holding hash → transaction rows.
pub const TRANSACTIONS_BUCKET: &str = "transactions_bucket";

/// Persistent archive of transactions that made it into a block.
///
/// Written only by the commit path, after the block itself lands.
pub struct TransactionStore {
    kv: KvStore,
}

impl TransactionStore {
    /// Open (or create) the archive.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let kv = KvStore::open(
            data_dir.as_ref().join(TRANSACTIONS_DB_FILE),
            TRANSACTIONS_BUCKET,
        )?;
        Ok(Self { kv })
    }

    /// Open an in-memory archive (for testing).
    pub fn open_temporary() -> Result<Self> {
        let kv = KvStore::open_temporary(TRANSACTIONS_BUCKET)?;
        Ok(Self { kv })
    }

    /// Fetch an archived transaction by hash.
    pub fn transaction(&self, hash: Hash) -> Result<Transaction> {
        self.kv
            .get(hash)?
            .ok_or(StorageError::TransactionNotFound(hash))
    }

    /// Archive one transaction.
    pub fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        self.kv.put(tx.hash, tx)
    }

    /// [`TransactionStore::add_transaction`] retried up to `max_retry` times.
    pub fn add_transaction_with_retry(&self, tx: &Transaction, max_retry: usize) -> Result<()> {
        let mut last = Ok(());
        for _ in 0..max_retry {
            match self.add_transaction(tx) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use memochain_core::Address;

    #[test]
    fn test_archive_and_fetch() {
        let store = TransactionStore::open_temporary().unwrap();
        let tx =
            Transaction::new(Address([2; 20]), Address([3; 20]), b"hi".to_vec(), 1000).unwrap();

        store.add_transaction(&tx).unwrap();
        assert_eq!(store.transaction(tx.hash).unwrap(), tx);
    }

    #[test]
    fn test_missing_transaction_is_an_error() {
        let store = TransactionStore::open_temporary().unwrap();
        let result = store.transaction(Hash([0xEE; 32]));
        assert!(matches!(result, Err(StorageError::TransactionNotFound(_))));
    }

    #[test]
    fn test_add_with_retry() {
        let store = TransactionStore::open_temporary().unwrap();
        let tx =
            Transaction::new(Address([2; 20]), Address([3; 20]), Vec::new(), 50).unwrap();
        store.add_transaction_with_retry(&tx, 5).unwrap();
        assert_eq!(store.transaction(tx.hash).unwrap(), tx);
    }
}
