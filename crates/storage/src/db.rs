//! sled database wrapper with serialization helpers.

use memochain_core::{Address, Hash};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionResult, TransactionError, TransactionalTree};
use sled::Tree;
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("amount should not be less than 0, got {0}")]
    NegativeAmount(i64),

    #[error("integer overflow: {balance} + {amount}")]
    Overflow { balance: i64, amount: i64 },

    #[error("integer underflow: {balance} - {amount}")]
    Underflow { balance: i64, amount: i64 },

    #[error(
        "insufficient balance: address {address}, required {required}, available {available}"
    )]
    InsufficientBalance {
        address: Address,
        required: i64,
        available: i64,
    },

    #[error("account {0} has no message")]
    NoMessages(Address),

    #[error("block {0} does not exist")]
    BlockNotFound(Hash),

    #[error("transaction {0} does not exist")]
    TransactionNotFound(Hash),

    #[error("chain tip is missing")]
    MissingTip,
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Wrapper around one sled database holding a single bucket (named tree).
///
/// Each persistent store in the system owns its own database file; the
/// bucket supplies per-store atomicity and nothing coordinates writes
/// across stores.
#[derive(Clone)]
pub struct KvStore {
    db: sled::Db,
    bucket: Tree,
}

impl KvStore {
    /// Open (or create) a database at the given path with one bucket.
    pub fn open<P: AsRef<Path>>(path: P, bucket: &str) -> Result<Self> {
        let db = sled::open(path)?;
        let bucket = db.open_tree(bucket)?;
        Ok(Self { db, bucket })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary(bucket: &str) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let bucket = db.open_tree(bucket)?;
        Ok(Self { db, bucket })
    }

    /// Whether the bucket holds no rows yet.
    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.bucket.insert(key.as_ref(), encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: DeserializeOwned,
    {
        match self.bucket.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.bucket.contains_key(key)?)
    }

    /// Run `f` as one atomic read-modify-write transaction over the
    /// bucket. Aborting with a `StorageError` rolls the writes back and
    /// surfaces the error to the caller.
    pub fn transaction<T>(
        &self,
        f: impl Fn(&TransactionalTree) -> ConflictableTransactionResult<T, StorageError>,
    ) -> Result<T> {
        self.bucket.transaction(f).map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StorageError::Database(e),
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sled::transaction::ConflictableTransactionError;

    #[test]
    fn test_put_get() {
        let kv = KvStore::open_temporary("bucket").unwrap();

        kv.put("key1", &42u64).unwrap();
        let value: Option<u64> = kv.get("key1").unwrap();
        assert_eq!(value, Some(42));

        let missing: Option<u64> = kv.get("missing").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_contains() {
        let kv = KvStore::open_temporary("bucket").unwrap();
        assert!(kv.is_empty());

        kv.put("key", &"value").unwrap();
        assert!(kv.contains("key").unwrap());
        assert!(!kv.contains("other").unwrap());
        assert!(!kv.is_empty());
    }

    #[test]
    fn test_transaction_commits() {
        let kv = KvStore::open_temporary("bucket").unwrap();
        kv.put("counter", &1u64).unwrap();

        kv.transaction(|tx| {
            let bytes = tx.get("counter")?.unwrap();
            let n: u64 = bincode::deserialize(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StorageError::from(e)))?;
            let encoded = bincode::serialize(&(n + 1))
                .map_err(|e| ConflictableTransactionError::Abort(StorageError::from(e)))?;
            tx.insert("counter", encoded)?;
            Ok(())
        })
        .unwrap();

        let value: Option<u64> = kv.get("counter").unwrap();
        assert_eq!(value, Some(2));
    }

    #[test]
    fn test_transaction_abort_rolls_back() {
        let kv = KvStore::open_temporary("bucket").unwrap();
        kv.put("row", &1u64).unwrap();

        let result: Result<()> = kv.transaction(|tx| {
            let encoded = bincode::serialize(&99u64).unwrap();
            tx.insert("row", encoded)?;
            Err(ConflictableTransactionError::Abort(
                StorageError::MissingTip,
            ))
        });

        assert!(matches!(result, Err(StorageError::MissingTip)));
        let value: Option<u64> = kv.get("row").unwrap();
        assert_eq!(value, Some(1));
    }
}
