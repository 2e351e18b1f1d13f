//! Account state: balance plus an append-only message log.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// An account in the ledger.
///
/// Every address resolves to an account; rows spring into existence
/// with a zero balance and an empty message log on first access.
/// The message log only grows during normal operation — the tail is
/// popped solely when a packaged transaction is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The address this account belongs to.
    pub address: Address,
    /// Account balance in the native unit.
    pub balance: i64,
    /// Messages delivered to this address, oldest first.
    pub messages: Vec<Vec<u8>>,
}

impl Account {
    /// Create a new account with the given balance and no messages.
    pub fn new(address: Address, balance: i64) -> Self {
        Self {
            address,
            balance,
            messages: Vec::new(),
        }
    }
}
