//! Transaction construction: validation, fee derivation, hash binding.

use crate::address::Address;
use crate::hash::{int_to_hex, sha256, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of the data payload carried by one transaction.
pub const MAX_LENGTH_OF_DATA: usize = 256;
/// Fee charged per data byte.
pub const DATA_FEE_RATIO: f64 = 0.1;
/// Fee charged per transferred unit.
pub const AMOUNT_FEE_RATIO: f64 = 0.0001;

/// Errors that can occur when building a transaction.
#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("amount should not be less than 0, got {0}")]
    NegativeAmount(i64),

    #[error("length of data should not be more than {MAX_LENGTH_OF_DATA}, got {0}")]
    DataTooLong(usize),

    #[error("transaction carries no amount and no message")]
    EmptyTransaction,

    #[error("fee {0} is out of the i64 range")]
    FeeOutOfRange(f64),
}

/// A value-and-message transfer between two accounts.
///
/// The fee and hash are derived at construction time; the hash binds
/// every other field, so recomputing it from a well-formed transaction
/// always reproduces the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address.
    pub from: Address,
    /// Recipient's address.
    pub to: Address,
    /// Message payload delivered to the recipient (at most 256 bytes).
    pub data: Vec<u8>,
    /// Value to transfer.
    pub amount: i64,
    /// Fee paid by the sender to the miner.
    pub fee: i64,
    /// Digest binding the five fields above.
    pub hash: Hash,
}

impl Transaction {
    /// Build a transaction, deriving its fee and hash.
    pub fn new(
        from: Address,
        to: Address,
        data: Vec<u8>,
        amount: i64,
    ) -> Result<Self, TransactionError> {
        if amount < 0 {
            return Err(TransactionError::NegativeAmount(amount));
        }
        if data.len() > MAX_LENGTH_OF_DATA {
            return Err(TransactionError::DataTooLong(data.len()));
        }
        if amount == 0 && data.is_empty() {
            return Err(TransactionError::EmptyTransaction);
        }

        let data_fee = ratio_fee(DATA_FEE_RATIO, data.len() as f64)?;
        let amount_fee = ratio_fee(AMOUNT_FEE_RATIO, amount as f64)?;

        let mut tx = Self {
            from,
            to,
            data,
            amount,
            fee: data_fee + amount_fee,
            hash: Hash::ZERO,
        };
        tx.hash = tx.compute_hash();
        Ok(tx)
    }

    /// Digest over the raw concatenation of the other five fields.
    ///
    /// Layout: `from(20) ‖ to(20) ‖ data ‖ int_to_hex(amount) ‖
    /// int_to_hex(fee)` — no separators, no length prefixes. This
    /// byte layout is a compatibility boundary and must not change.
    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(40 + self.data.len() + 34);
        buf.extend_from_slice(self.from.as_bytes());
        buf.extend_from_slice(self.to.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(&int_to_hex(self.amount));
        buf.extend_from_slice(&int_to_hex(self.fee));
        sha256(&buf)
    }

    /// Total the sender must cover: transferred amount plus fee.
    pub fn cost(&self) -> i64 {
        self.amount.saturating_add(self.fee)
    }
}

/// Floor of `ratio × quantity`, clamped to at least 1.
fn ratio_fee(ratio: f64, quantity: f64) -> Result<i64, TransactionError> {
    let fee = (ratio * quantity).floor();
    if fee >= i64::MAX as f64 || fee <= i64::MIN as f64 {
        return Err(TransactionError::FeeOutOfRange(fee));
    }
    Ok((fee as i64).max(1))
}
