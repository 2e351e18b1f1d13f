//! FIFO pool of admitted transactions, persisted off the critical path.
//!
//! New arrivals append on the right; transactions returned from a
//! failed packaging attempt are prepended on the left so they are
//! retried first. Every entry has passed the admission precheck but
//! has not touched account state.

use memochain_core::Transaction;
use memochain_storage::{KvStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

/// Database file name under the data directory.
pub const TXS_POOL_DB_FILE: &str = "txs_pool.db";
/// Bucket name, kept from the historical on-disk layout.
pub const TXS_POOL_BUCKET: &str = "blocks_bucket";
/// The single row the whole pool is serialized into.
pub const TXS_POOL_KEY: &[u8] = b"txs_pool";
/// Retry budget for one background flush.
pub const MAX_RETRY_OF_FLUSHING: usize = 5;

/// The in-memory pool. Persisted wholesale as one row.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct TxsPool {
    txs: VecDeque<Transaction>,
}

impl TxsPool {
    fn some_txs(&self, number: usize) -> Vec<Transaction> {
        self.txs.iter().take(number).cloned().collect()
    }

    fn add_txs(&mut self, txs: Vec<Transaction>) {
        self.txs.extend(txs);
    }

    fn left_add_txs(&mut self, txs: Vec<Transaction>) {
        for tx in txs.into_iter().rev() {
            self.txs.push_front(tx);
        }
    }

    fn delete_some_txs(&mut self, number: usize) {
        let number = number.min(self.txs.len());
        self.txs.drain(..number);
    }
}

/// The pool plus its persistence.
///
/// Mutations update the in-memory pool under the lock and hand a
/// snapshot to a background flusher; the call returns without waiting
/// for the disk write. The flusher retries each write up to
/// [`MAX_RETRY_OF_FLUSHING`] times and aborts the process on
/// exhaustion — at that point the pool on disk can no longer be
/// trusted to converge with memory.
pub struct MempoolStore {
    pool: Mutex<TxsPool>,
    flush_tx: Option<Sender<TxsPool>>,
    flusher: Option<JoinHandle<()>>,
}

impl MempoolStore {
    /// Open the pool, restoring the persisted row if one exists.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let kv = KvStore::open(data_dir.as_ref().join(TXS_POOL_DB_FILE), TXS_POOL_BUCKET)?;
        Self::from_kv(kv)
    }

    /// Open an in-memory pool (for testing).
    pub fn open_temporary() -> Result<Self> {
        Self::from_kv(KvStore::open_temporary(TXS_POOL_BUCKET)?)
    }

    fn from_kv(kv: KvStore) -> Result<Self> {
        let pool: TxsPool = match kv.get(TXS_POOL_KEY)? {
            Some(pool) => pool,
            None => {
                let pool = TxsPool::default();
                kv.put(TXS_POOL_KEY, &pool)?;
                pool
            }
        };

        let (flush_tx, flush_rx) = mpsc::channel::<TxsPool>();
        let flusher = thread::spawn(move || {
            for snapshot in flush_rx {
                flush_with_retry(&kv, &snapshot);
            }
            let _ = kv.flush();
        });

        Ok(Self {
            pool: Mutex::new(pool),
            flush_tx: Some(flush_tx),
            flusher: Some(flusher),
        })
    }

    /// Snapshot of every pending transaction, oldest first.
    pub fn all_txs(&self) -> Vec<Transaction> {
        let pool = self.pool.lock().expect("mempool lock poisoned");
        pool.txs.iter().cloned().collect()
    }

    /// Peek at the first `min(number, len)` transactions without
    /// removing them. The caller receives a copy, not a live view.
    pub fn some_txs(&self, number: usize) -> Vec<Transaction> {
        let pool = self.pool.lock().expect("mempool lock poisoned");
        pool.some_txs(number)
    }

    /// Append new arrivals on the right.
    pub fn add_txs(&self, txs: Vec<Transaction>) {
        self.mutate(|pool| pool.add_txs(txs));
    }

    /// Prepend on the left, preserving the order of `txs`.
    pub fn left_add_txs(&self, txs: Vec<Transaction>) {
        self.mutate(|pool| pool.left_add_txs(txs));
    }

    /// Drop the first `min(number, len)` transactions.
    pub fn delete_some_txs(&self, number: usize) {
        self.mutate(|pool| pool.delete_some_txs(number));
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        let pool = self.pool.lock().expect("mempool lock poisoned");
        pool.txs.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disconnect the flusher and wait for pending flushes to land.
    pub fn close(&mut self) {
        self.flush_tx.take();
        if let Some(handle) = self.flusher.take() {
            let _ = handle.join();
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut TxsPool)) {
        let mut pool = self.pool.lock().expect("mempool lock poisoned");
        f(&mut pool);
        if let Some(flush_tx) = &self.flush_tx {
            let _ = flush_tx.send(pool.clone());
        }
    }
}

impl Drop for MempoolStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn flush_with_retry(kv: &KvStore, snapshot: &TxsPool) {
    let mut last: Result<()> = Ok(());
    for _ in 0..MAX_RETRY_OF_FLUSHING {
        last = kv.put(TXS_POOL_KEY, snapshot);
        if last.is_ok() {
            return;
        }
    }
    if let Err(e) = last {
        tracing::error!(error = %e, "flushing the transaction pool failed after retries");
        std::process::abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memochain_core::Address;

    fn tx(n: u8) -> Transaction {
        Transaction::new(Address([n; 20]), Address([0xFF; 20]), vec![n], 100).unwrap()
    }

    #[test]
    fn test_fifo_peek_and_delete() {
        let pool = MempoolStore::open_temporary().unwrap();
        pool.add_txs(vec![tx(1), tx(2), tx(3), tx(4)]);

        let peeked = pool.some_txs(2);
        assert_eq!(peeked, vec![tx(1), tx(2)]);
        // Peeking does not remove.
        assert_eq!(pool.len(), 4);

        pool.delete_some_txs(2);
        assert_eq!(pool.all_txs(), vec![tx(3), tx(4)]);
    }

    #[test]
    fn test_peek_beyond_len_returns_everything() {
        let pool = MempoolStore::open_temporary().unwrap();
        pool.add_txs(vec![tx(1), tx(2)]);
        assert_eq!(pool.some_txs(10).len(), 2);

        pool.delete_some_txs(10);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_left_add_preserves_order() {
        let pool = MempoolStore::open_temporary().unwrap();
        pool.add_txs(vec![tx(5), tx(6)]);
        pool.left_add_txs(vec![tx(1), tx(2)]);

        assert_eq!(pool.all_txs(), vec![tx(1), tx(2), tx(5), tx(6)]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let pool = MempoolStore::open_temporary().unwrap();
        pool.add_txs(vec![tx(1)]);

        let snapshot = pool.some_txs(1);
        pool.delete_some_txs(1);
        assert!(pool.is_empty());
        assert_eq!(snapshot, vec![tx(1)]);
    }

    #[test]
    fn test_pool_is_restored_after_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let pool = MempoolStore::open(dir.path()).unwrap();
            pool.add_txs(vec![tx(1), tx(2)]);
            // Dropping closes: pending flushes land before the join returns.
        }

        let pool = MempoolStore::open(dir.path()).unwrap();
        assert_eq!(pool.all_txs(), vec![tx(1), tx(2)]);
    }

    #[test]
    fn test_empty_pool_is_persisted_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let pool = MempoolStore::open(dir.path()).unwrap();
            assert!(pool.is_empty());
        }
        let pool = MempoolStore::open(dir.path()).unwrap();
        assert!(pool.is_empty());
    }
}
