//! Proof of work: target derivation, nonce search, validation.

use memochain_core::{int_to_hex, sha256, Block, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer used for target comparisons.
    pub struct U256(4);
}

/// Mining difficulty: a hash is accepted iff, read as a big-endian
/// 256-bit integer, it is strictly below `1 << (256 - TARGET_BITS)`.
pub const TARGET_BITS: u32 = 24;

/// Errors that can end a nonce search.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    #[error("mining was cancelled")]
    Cancelled,

    #[error("nonce space exhausted without finding a valid hash")]
    NonceExhausted,
}

/// Cloneable stop signal.
///
/// The search loop polls the token before every nonce, so cancelling
/// takes effect mid-search rather than at the next block boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Proof-of-work search over one block candidate.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    bits: u32,
    target: U256,
}

impl<'a> ProofOfWork<'a> {
    /// Prepare a search against the block at the given difficulty.
    pub fn new(block: &'a Block, bits: u32) -> Self {
        let target = U256::one() << (256 - bits as usize);
        Self {
            block,
            bits,
            target,
        }
    }

    /// The digest input for a candidate nonce.
    ///
    /// Layout: `prev_hash(32) ‖ int_to_hex(timestamp) ‖ int_to_hex(bits)
    /// ‖ int_to_hex(nonce) ‖ miner(20) ‖ tx hashes (32 each)` — no
    /// separators, no length prefixes. This byte layout is a
    /// compatibility boundary and must not change.
    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(112 + 32 * self.block.txs.len());
        buf.extend_from_slice(self.block.prev_hash.as_bytes());
        buf.extend_from_slice(&int_to_hex(self.block.timestamp));
        buf.extend_from_slice(&int_to_hex(self.bits as i64));
        buf.extend_from_slice(&int_to_hex(nonce));
        buf.extend_from_slice(self.block.miner.as_bytes());
        for tx in &self.block.txs {
            buf.extend_from_slice(tx.hash.as_bytes());
        }
        buf
    }

    fn accepts(&self, hash: &Hash) -> bool {
        U256::from_big_endian(hash.as_bytes()) < self.target
    }

    /// Search nonces 0, 1, 2, … until a hash below the target is found.
    pub fn run(&self, cancel: &CancelToken) -> Result<(i64, Hash), PowError> {
        let mut nonce: i64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PowError::Cancelled);
            }
            let hash = sha256(&self.prepare_data(nonce));
            if self.accepts(&hash) {
                return Ok((nonce, hash));
            }
            nonce = nonce.checked_add(1).ok_or(PowError::NonceExhausted)?;
        }
    }

    /// Recompute the digest with the stored nonce and check it against
    /// both the stored hash and the target.
    pub fn validate(&self) -> bool {
        let hash = sha256(&self.prepare_data(self.block.nonce));
        hash == self.block.hash && self.accepts(&hash)
    }
}

/// Build the genesis block at the given difficulty.
///
/// The template is fully fixed, so every instance running the same
/// difficulty converges on the same genesis hash.
pub fn genesis_block(bits: u32) -> Block {
    let mut block = Block::genesis_template();
    let (nonce, hash) = {
        let pow = ProofOfWork::new(&block, bits);
        pow.run(&CancelToken::new())
            .expect("genesis nonce search should not fail")
    };
    block.nonce = nonce;
    block.hash = hash;
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use memochain_core::{Address, Transaction};

    /// Low difficulty keeps the search to a handful of hashes.
    const TEST_BITS: u32 = 8;

    fn mined_block() -> Block {
        let tx =
            Transaction::new(Address([2; 20]), Address([3; 20]), b"hi".to_vec(), 1000).unwrap();
        let mut block = Block::new(vec![tx], Hash([0xAA; 32]));
        block.miner = Address([1; 20]);
        let (nonce, hash) = ProofOfWork::new(&block, TEST_BITS)
            .run(&CancelToken::new())
            .unwrap();
        block.nonce = nonce;
        block.hash = hash;
        block
    }

    #[test]
    fn test_run_finds_hash_below_target() {
        let block = mined_block();
        let bound = U256::one() << (256 - TEST_BITS as usize);
        assert!(U256::from_big_endian(block.hash.as_bytes()) < bound);
    }

    #[test]
    fn test_validate_accepts_mined_block() {
        let block = mined_block();
        assert!(ProofOfWork::new(&block, TEST_BITS).validate());
    }

    #[test]
    fn test_validate_rejects_tampering() {
        let mut block = mined_block();
        block.nonce += 1;
        assert!(!ProofOfWork::new(&block, TEST_BITS).validate());

        let mut block = mined_block();
        block.timestamp += 1;
        assert!(!ProofOfWork::new(&block, TEST_BITS).validate());

        // A hash valid at low difficulty fails a tighter target.
        let block = mined_block();
        assert!(!ProofOfWork::new(&block, 255).validate());
    }

    #[test]
    fn test_prepare_data_layout() {
        let block = mined_block();
        let pow = ProofOfWork::new(&block, TEST_BITS);

        let mut expected = Vec::new();
        expected.extend_from_slice(&[0xAA; 32]);
        expected.extend_from_slice(&int_to_hex(block.timestamp));
        expected.extend_from_slice(b"8");
        expected.extend_from_slice(&int_to_hex(block.nonce));
        expected.extend_from_slice(&[1; 20]);
        expected.extend_from_slice(block.txs[0].hash.as_bytes());

        assert_eq!(pow.prepare_data(block.nonce), expected);
    }

    #[test]
    fn test_cancelled_search_stops() {
        let block = Block::genesis_template();
        let cancel = CancelToken::new();
        cancel.cancel();
        // Difficulty high enough that an uncancelled search would spin.
        let result = ProofOfWork::new(&block, 250).run(&cancel);
        assert_eq!(result, Err(PowError::Cancelled));
    }

    #[test]
    fn test_cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let g1 = genesis_block(TEST_BITS);
        let g2 = genesis_block(TEST_BITS);
        assert_eq!(g1.hash, g2.hash);
        assert_eq!(g1.nonce, g2.nonce);
        assert!(ProofOfWork::new(&g1, TEST_BITS).validate());
    }
}
