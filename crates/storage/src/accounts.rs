//! Persistent account state: balances and message logs.

use crate::db::{KvStore, Result, StorageError};
use memochain_core::{Account, Address};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use std::path::Path;

/// Database file name under the data directory.
pub const ACCOUNTS_DB_FILE: &str = "accounts.db";
/// Bucket holding address → account rows.
pub const ACCOUNTS_BUCKET: &str = "accounts_bucket";
/// Balance granted to each pre-funded account at first initialization.
pub const INITIAL_ACCOUNT_BALANCE: i64 = 10_000_000_000;

/// Persistent mapping from address to account.
///
/// Every operation is one read-modify-write transaction against the
/// underlying bucket. There is no multi-key atomicity; callers that
/// need it compensate (see the chain executor).
pub struct AccountStore {
    kv: KvStore,
}

impl AccountStore {
    /// Open the store, seeding the pre-funded accounts on first use.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let kv = KvStore::open(data_dir.as_ref().join(ACCOUNTS_DB_FILE), ACCOUNTS_BUCKET)?;
        let store = Self { kv };
        store.seed_initial_accounts()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_temporary() -> Result<Self> {
        let kv = KvStore::open_temporary(ACCOUNTS_BUCKET)?;
        let store = Self { kv };
        store.seed_initial_accounts()?;
        Ok(store)
    }

    /// The five pre-funded addresses `0x…01` through `0x…05`.
    pub fn initial_addresses() -> Vec<Address> {
        (1..=5u8)
            .map(|i| {
                let mut bytes = [0u8; 20];
                bytes[19] = i;
                Address(bytes)
            })
            .collect()
    }

    fn seed_initial_accounts(&self) -> Result<()> {
        if !self.kv.is_empty() {
            return Ok(());
        }
        for addr in Self::initial_addresses() {
            self.kv
                .put(addr, &Account::new(addr, INITIAL_ACCOUNT_BALANCE))?;
        }
        Ok(())
    }

    /// Read-through lookup: an absent row is materialized with a zero
    /// balance and persisted before being returned.
    pub fn account_of(&self, addr: Address) -> Result<Account> {
        self.kv.transaction(|tx| match tx.get(addr.as_bytes())? {
            Some(bytes) => decode(&bytes),
            None => {
                let account = Account::new(addr, 0);
                tx.insert(&addr.as_bytes()[..], encode(&account)?)?;
                Ok(account)
            }
        })
    }

    /// Current balance of the address.
    pub fn balance_of(&self, addr: Address) -> Result<i64> {
        Ok(self.account_of(addr)?.balance)
    }

    /// Credit the address. Fails with `Overflow` if the balance would
    /// leave the i64 range.
    pub fn increase_balance_of(&self, addr: Address, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(StorageError::NegativeAmount(amount));
        }
        self.update_account(addr, |account| {
            let balance = account.balance;
            account.balance = balance.checked_add(amount).ok_or(
                ConflictableTransactionError::Abort(StorageError::Overflow { balance, amount }),
            )?;
            Ok(())
        })
    }

    /// Debit the address. Fails with `Underflow` only on i64 underflow;
    /// the resulting balance is allowed to go negative here — the
    /// checked variant is [`AccountStore::withdraw`].
    pub fn decrease_balance_of(&self, addr: Address, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(StorageError::NegativeAmount(amount));
        }
        self.update_account(addr, |account| {
            let balance = account.balance;
            account.balance = balance.checked_sub(amount).ok_or(
                ConflictableTransactionError::Abort(StorageError::Underflow { balance, amount }),
            )?;
            Ok(())
        })
    }

    /// Debit that refuses to take the balance below zero, with the
    /// check and the write inside the same transaction.
    pub fn withdraw(&self, addr: Address, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(StorageError::NegativeAmount(amount));
        }
        self.update_account(addr, |account| {
            if account.balance < amount {
                return Err(ConflictableTransactionError::Abort(
                    StorageError::InsufficientBalance {
                        address: addr,
                        required: amount,
                        available: account.balance,
                    },
                ));
            }
            account.balance -= amount;
            Ok(())
        })
    }

    /// Append a message to the address's log.
    pub fn put_message_to(&self, addr: Address, message: Vec<u8>) -> Result<()> {
        self.update_account(addr, |account| {
            account.messages.push(message.clone());
            Ok(())
        })
    }

    /// Pop the most recent message of the address.
    pub fn delete_message_of(&self, addr: Address) -> Result<()> {
        self.update_account(addr, |account| {
            if account.messages.pop().is_none() {
                return Err(ConflictableTransactionError::Abort(
                    StorageError::NoMessages(addr),
                ));
            }
            Ok(())
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.kv.flush()
    }

    /// Read-modify-write of one account row under one transaction,
    /// materializing the row if absent.
    fn update_account(
        &self,
        addr: Address,
        f: impl Fn(&mut Account) -> ConflictableTransactionResult<(), StorageError>,
    ) -> Result<()> {
        self.kv.transaction(|tx| {
            let mut account = match tx.get(addr.as_bytes())? {
                Some(bytes) => decode(&bytes)?,
                None => Account::new(addr, 0),
            };
            f(&mut account)?;
            tx.insert(&addr.as_bytes()[..], encode(&account)?)?;
            Ok(())
        })
    }
}

fn decode(bytes: &[u8]) -> ConflictableTransactionResult<Account, StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| ConflictableTransactionError::Abort(StorageError::Serialization(e)))
}

fn encode(account: &Account) -> ConflictableTransactionResult<Vec<u8>, StorageError> {
    bincode::serialize(account)
        .map_err(|e| ConflictableTransactionError::Abort(StorageError::Serialization(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_seeds_initial_accounts() {
        let store = AccountStore::open_temporary().unwrap();
        for seeded in AccountStore::initial_addresses() {
            assert_eq!(store.balance_of(seeded).unwrap(), INITIAL_ACCOUNT_BALANCE);
        }
    }

    #[test]
    fn test_read_through_materializes_row() {
        let store = AccountStore::open_temporary().unwrap();
        let fresh = addr(0xAA);

        let account = store.account_of(fresh).unwrap();
        assert_eq!(account.address, fresh);
        assert_eq!(account.balance, 0);
        assert!(account.messages.is_empty());

        // The row now exists on disk, not just in the returned value.
        assert!(store.kv.contains(fresh).unwrap());
    }

    #[test]
    fn test_increase_and_decrease() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x10);

        store.increase_balance_of(a, 500).unwrap();
        assert_eq!(store.balance_of(a).unwrap(), 500);

        store.decrease_balance_of(a, 200).unwrap();
        assert_eq!(store.balance_of(a).unwrap(), 300);
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x10);

        assert!(matches!(
            store.increase_balance_of(a, -1),
            Err(StorageError::NegativeAmount(-1))
        ));
        assert!(matches!(
            store.decrease_balance_of(a, -1),
            Err(StorageError::NegativeAmount(-1))
        ));
        assert!(matches!(
            store.withdraw(a, -1),
            Err(StorageError::NegativeAmount(-1))
        ));
    }

    #[test]
    fn test_increase_overflow() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x10);
        store.increase_balance_of(a, i64::MAX).unwrap();

        let result = store.increase_balance_of(a, 1);
        assert!(matches!(result, Err(StorageError::Overflow { .. })));
        assert_eq!(store.balance_of(a).unwrap(), i64::MAX);
    }

    #[test]
    fn test_decrease_may_go_negative_but_not_underflow() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x10);

        // The plain debit only guards two's-complement underflow.
        store.decrease_balance_of(a, 5).unwrap();
        assert_eq!(store.balance_of(a).unwrap(), -5);

        store.decrease_balance_of(a, i64::MAX).unwrap();
        let result = store.decrease_balance_of(a, i64::MAX);
        assert!(matches!(result, Err(StorageError::Underflow { .. })));
    }

    #[test]
    fn test_withdraw_enforces_non_negative_balance() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x10);
        store.increase_balance_of(a, 100).unwrap();

        assert!(matches!(
            store.withdraw(a, 101),
            Err(StorageError::InsufficientBalance { .. })
        ));
        assert_eq!(store.balance_of(a).unwrap(), 100);

        store.withdraw(a, 100).unwrap();
        assert_eq!(store.balance_of(a).unwrap(), 0);
    }

    #[test]
    fn test_message_log() {
        let store = AccountStore::open_temporary().unwrap();
        let a = addr(0x20);

        store.put_message_to(a, b"first".to_vec()).unwrap();
        store.put_message_to(a, b"second".to_vec()).unwrap();
        assert_eq!(
            store.account_of(a).unwrap().messages,
            vec![b"first".to_vec(), b"second".to_vec()]
        );

        store.delete_message_of(a).unwrap();
        assert_eq!(
            store.account_of(a).unwrap().messages,
            vec![b"first".to_vec()]
        );

        store.delete_message_of(a).unwrap();
        assert!(matches!(
            store.delete_message_of(a),
            Err(StorageError::NoMessages(_))
        ));
    }
}
