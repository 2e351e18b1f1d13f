//! Background mining loop.

use crate::blockchain::Blockchain;
use memochain_consensus::CancelToken;
use memochain_core::Address;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause after a failed mining attempt.
pub const MINING_BACKOFF: Duration = Duration::from_secs(10);

/// Granularity at which the backoff sleep observes the stop signal.
const BACKOFF_POLL: Duration = Duration::from_millis(100);

/// Handle over one background mining thread.
///
/// The loop checks the stop signal before every attempt, and the
/// nonce search inside an attempt observes the same token, so
/// [`Miner::stop`] returns promptly even mid-search.
pub struct Miner {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl Miner {
    /// Spawn the loop: mine repeatedly, backing off after any
    /// recoverable failure (an empty pool included).
    pub fn spawn(chain: Arc<Blockchain>, miner: Address) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            while !token.is_cancelled() {
                match chain.mine_block(miner, &token) {
                    Ok(block) => {
                        tracing::info!(hash = %block.hash, txs = block.txs.len(), "new block mined");
                    }
                    Err(e) if e.is_cancellation() => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "mining attempt failed; backing off");
                        backoff(&token);
                    }
                }
            }
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Request stop and wait for the current iteration to wind down.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn backoff(token: &CancelToken) {
    let mut waited = Duration::ZERO;
    while waited < MINING_BACKOFF && !token.is_cancelled() {
        thread::sleep(BACKOFF_POLL);
        waited += BACKOFF_POLL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memochain_core::Transaction;
    use std::time::Instant;

    const TEST_BITS: u32 = 8;

    fn seeded(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address(bytes)
    }

    #[test]
    fn test_miner_mines_admitted_transactions() {
        let chain = Arc::new(Blockchain::open_temporary(TEST_BITS).unwrap());
        let miner_addr = seeded(1);
        let funded = chain.balance_of(miner_addr).unwrap();

        let tx = Transaction::new(seeded(2), seeded(3), b"bg".to_vec(), 100).unwrap();
        chain.send_transaction(tx).unwrap();

        let miner = Miner::spawn(chain.clone(), miner_addr);

        // Wait for the background thread to commit the block.
        let deadline = Instant::now() + Duration::from_secs(10);
        while chain.balance_of(miner_addr).unwrap() == funded {
            assert!(Instant::now() < deadline, "block was never mined");
            thread::sleep(Duration::from_millis(20));
        }

        miner.stop();
        assert!(chain.pool_txs().is_empty());
        assert!(chain.balance_of(miner_addr).unwrap() > funded);
    }

    #[test]
    fn test_stop_interrupts_backoff_promptly() {
        let chain = Arc::new(Blockchain::open_temporary(TEST_BITS).unwrap());

        // Empty pool: the loop fails its first attempt and backs off.
        let miner = Miner::spawn(chain.clone(), seeded(1));
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        miner.stop();
        // Far below the 10 s backoff: the sleep polls the token.
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
