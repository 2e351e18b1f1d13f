//! Block packaging: execute the candidates, prove the block, credit
//! the miner, commit.
//!
//! The protocol mutates three stores with no shared transaction, so
//! every failure path restores what the earlier steps wrote before the
//! error surfaces. On success the caller receives the transactions
//! that failed execution, in their original order, for reinsertion at
//! the left of the pool.

use crate::executor::Executor;
use memochain_consensus::{CancelToken, PowError, ProofOfWork};
use memochain_core::{Address, Block, Transaction};
use memochain_storage::{
    AccountStore, BlockStore, StorageError, TransactionStore, MAX_RETRY_OF_ADDING_BLOCK,
};
use thiserror::Error;

/// Subsidy credited to the miner on top of the packaged fees.
pub const MINER_AWARD_FOR_ONE_BLOCK: i64 = 10;

/// Errors that abort a packaging attempt.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no transaction executed successfully")]
    EmptyBlock,

    #[error("proof of work stopped: {0}")]
    Pow(#[from] PowError),

    #[error("failed to credit the miner: {0}")]
    MinerCreditFailed(StorageError),

    #[error("failed to commit the block: {0}")]
    CommitFailed(StorageError),
}

/// Run the packaging protocol over a candidate block.
///
/// On success the block holds the packaged transactions, its proof
/// fields, and the miner; the award has been credited and the block
/// committed (advancing the tip). On failure account state and the
/// block's fields are restored to what they were on entry.
pub fn package(
    block: &mut Block,
    miner: Address,
    target_bits: u32,
    cancel: &CancelToken,
    accounts: &AccountStore,
    blocks: &BlockStore,
    archive: &TransactionStore,
) -> Result<Vec<Transaction>, PackageError> {
    let executor = Executor::new(accounts);
    let original = block.clone();

    let mut packaged = Vec::new();
    let mut not_packaged = Vec::new();
    for tx in block.txs.clone() {
        match executor.execute(&tx) {
            Ok(()) => packaged.push(tx),
            Err(e) => {
                tracing::warn!(tx = %tx.hash, error = %e, "transaction not packaged");
                not_packaged.push(tx);
            }
        }
    }
    if packaged.is_empty() {
        return Err(PackageError::EmptyBlock);
    }

    block.txs = packaged;
    block.miner = miner;

    let pow_result = ProofOfWork::new(block, target_bits).run(cancel);
    let (nonce, hash) = match pow_result {
        Ok(found) => found,
        Err(e) => {
            roll_back_all(&executor, &block.txs);
            *block = original;
            return Err(e.into());
        }
    };
    block.nonce = nonce;
    block.hash = hash;

    let award = MINER_AWARD_FOR_ONE_BLOCK + block.txs.iter().map(|tx| tx.fee).sum::<i64>();
    if let Err(e) = accounts.increase_balance_of(miner, award) {
        roll_back_all(&executor, &block.txs);
        *block = original;
        return Err(PackageError::MinerCreditFailed(e));
    }

    if let Err(e) = blocks.append_block_with_retry(block, MAX_RETRY_OF_ADDING_BLOCK) {
        roll_back_all(&executor, &block.txs);
        reclaim_award(accounts, miner, award);
        *block = original;
        return Err(PackageError::CommitFailed(e));
    }

    // The block is authoritative once committed; the archive is an
    // index, so a failed write is logged rather than unwound.
    for tx in &block.txs {
        if let Err(e) = archive.add_transaction_with_retry(tx, MAX_RETRY_OF_ADDING_BLOCK) {
            tracing::warn!(tx = %tx.hash, error = %e, "failed to archive packaged transaction");
        }
    }

    Ok(not_packaged)
}

fn roll_back_all(executor: &Executor<'_>, txs: &[Transaction]) {
    for tx in txs {
        executor.roll_back(tx);
    }
}

/// Take back a miner award credited before a failed commit, with the
/// same bounded retry as any other compensating write.
fn reclaim_award(accounts: &AccountStore, miner: Address, award: i64) {
    let mut last: Result<(), StorageError> = Ok(());
    for _ in 0..crate::executor::MAX_RETRY_OF_EXECUTION {
        last = accounts.decrease_balance_of(miner, award);
        if last.is_ok() {
            return;
        }
    }
    if let Err(e) = last {
        tracing::error!(
            miner = %miner,
            award,
            error = %e,
            "reclaiming the miner award failed after retries; ledger state is unrecoverable"
        );
        std::process::abort();
    }
}
