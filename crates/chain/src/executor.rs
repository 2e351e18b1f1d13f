//! Transaction execution against the account ledger.
//!
//! The ledger offers per-row atomicity only, so a transfer touches the
//! sender row, the recipient row, and the recipient's message log as
//! separate writes. When a later step fails, compensating writes
//! restore the earlier ones; a compensating write that keeps failing
//! leaves the ledger in a state no automated action can repair, and
//! the process aborts.

use memochain_core::Transaction;
use memochain_storage::{AccountStore, StorageError};
use thiserror::Error;

/// Retry budget for one compensating write.
pub const MAX_RETRY_OF_EXECUTION: usize = 5;

/// Errors that can occur during execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Executes and rolls back transactions against the account store.
pub struct Executor<'a> {
    accounts: &'a AccountStore,
}

impl<'a> Executor<'a> {
    /// Create a new executor.
    pub fn new(accounts: &'a AccountStore) -> Self {
        Self { accounts }
    }

    /// Apply the transaction: debit the sender by amount plus fee,
    /// credit the recipient, deliver the message if one is carried.
    ///
    /// The sender debit is checked — a balance that cannot cover the
    /// cost fails here and nothing is written. A failure in a later
    /// step compensates the earlier writes before returning.
    pub fn execute(&self, tx: &Transaction) -> Result<(), ExecutionError> {
        self.accounts.withdraw(tx.from, tx.cost())?;

        if let Err(e) = self.accounts.increase_balance_of(tx.to, tx.amount) {
            self.must_compensate("restore sender balance", || {
                self.accounts.increase_balance_of(tx.from, tx.cost())
            });
            return Err(e.into());
        }

        if !tx.data.is_empty() {
            if let Err(e) = self.accounts.put_message_to(tx.to, tx.data.clone()) {
                self.must_compensate("restore sender balance", || {
                    self.accounts.increase_balance_of(tx.from, tx.cost())
                });
                self.must_compensate("reclaim recipient credit", || {
                    self.accounts.decrease_balance_of(tx.to, tx.amount)
                });
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Undo a fully-successful [`Executor::execute`]: credit the sender
    /// back, reclaim the recipient's credit, pop the delivered message.
    pub fn roll_back(&self, tx: &Transaction) {
        self.must_compensate("restore sender balance", || {
            self.accounts.increase_balance_of(tx.from, tx.cost())
        });
        self.must_compensate("reclaim recipient credit", || {
            self.accounts.decrease_balance_of(tx.to, tx.amount)
        });
        if !tx.data.is_empty() {
            self.must_compensate("retract delivered message", || {
                self.accounts.delete_message_of(tx.to)
            });
        }
    }

    /// Run one compensating write, retrying up to
    /// [`MAX_RETRY_OF_EXECUTION`] times; exhaustion aborts the process.
    fn must_compensate(&self, action: &str, op: impl Fn() -> Result<(), StorageError>) {
        let mut last: Result<(), StorageError> = Ok(());
        for _ in 0..MAX_RETRY_OF_EXECUTION {
            last = op();
            if last.is_ok() {
                return;
            }
        }
        if let Err(e) = last {
            tracing::error!(
                action,
                error = %e,
                "compensating write failed after retries; ledger state is unrecoverable"
            );
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memochain_core::{Account, Address};

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    fn funded_store(sender: Address, balance: i64) -> AccountStore {
        let store = AccountStore::open_temporary().unwrap();
        store.increase_balance_of(sender, balance).unwrap();
        store
    }

    #[test]
    fn test_execute_moves_balance_and_message() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 10_000);
        let tx = Transaction::new(from, to, b"hi".to_vec(), 1000).unwrap();

        Executor::new(&store).execute(&tx).unwrap();

        assert_eq!(store.balance_of(from).unwrap(), 10_000 - 1000 - tx.fee);
        assert_eq!(store.balance_of(to).unwrap(), 1000);
        assert_eq!(
            store.account_of(to).unwrap().messages,
            vec![b"hi".to_vec()]
        );
    }

    #[test]
    fn test_execute_without_data_skips_message() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 10_000);
        let tx = Transaction::new(from, to, Vec::new(), 500).unwrap();

        Executor::new(&store).execute(&tx).unwrap();
        assert!(store.account_of(to).unwrap().messages.is_empty());
    }

    #[test]
    fn test_execute_rejects_insufficient_balance() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 100);
        let tx = Transaction::new(from, to, Vec::new(), 500).unwrap();

        let result = Executor::new(&store).execute(&tx);
        assert!(matches!(
            result,
            Err(ExecutionError::Storage(
                StorageError::InsufficientBalance { .. }
            ))
        ));

        // Nothing moved.
        assert_eq!(store.balance_of(from).unwrap(), 100);
        assert_eq!(store.balance_of(to).unwrap(), 0);
    }

    #[test]
    fn test_execute_compensates_when_credit_fails() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 10_000);
        // A recipient already at the ceiling makes the credit overflow.
        store.increase_balance_of(to, i64::MAX).unwrap();
        let tx = Transaction::new(from, to, b"hi".to_vec(), 1000).unwrap();

        let result = Executor::new(&store).execute(&tx);
        assert!(matches!(
            result,
            Err(ExecutionError::Storage(StorageError::Overflow { .. }))
        ));

        // The sender debit was compensated.
        assert_eq!(store.balance_of(from).unwrap(), 10_000);
        assert_eq!(store.balance_of(to).unwrap(), i64::MAX);
        assert!(store.account_of(to).unwrap().messages.is_empty());
    }

    #[test]
    fn test_execute_then_roll_back_restores_state() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 10_000);
        store.put_message_to(to, b"existing".to_vec()).unwrap();

        let before_from = store.account_of(from).unwrap();
        let before_to = store.account_of(to).unwrap();

        let tx = Transaction::new(from, to, b"hi".to_vec(), 1000).unwrap();
        let executor = Executor::new(&store);
        executor.execute(&tx).unwrap();
        executor.roll_back(&tx);

        assert_eq!(store.account_of(from).unwrap(), before_from);
        assert_eq!(store.account_of(to).unwrap(), before_to);
    }

    #[test]
    fn test_roll_back_without_data_leaves_messages_alone() {
        let from = addr(0x11);
        let to = addr(0x22);
        let store = funded_store(from, 10_000);
        store.put_message_to(to, b"keep me".to_vec()).unwrap();

        let tx = Transaction::new(from, to, Vec::new(), 100).unwrap();
        let executor = Executor::new(&store);
        executor.execute(&tx).unwrap();
        executor.roll_back(&tx);

        assert_eq!(
            store.account_of(to).unwrap(),
            Account {
                address: to,
                balance: 0,
                messages: vec![b"keep me".to_vec()],
            }
        );
    }
}
