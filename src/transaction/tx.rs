use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{database::Database, types::TinyResult};

pub type TransactionID = u64;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TransactionStatus {
    Active,
    Aborted,
    Committed,
}

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of a running transaction. The id increases monotonically by 1
/// and doubles as the age used by the deadlock arbiter.
#[derive(Eq, PartialEq, Clone)]
pub struct Transaction {
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        let id = TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        let instance = Self { id };

        Database::concurrent_status()
            .set_transaction_status(id, TransactionStatus::Active);

        instance
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    /// Flush the pages this transaction dirtied and release its locks.
    pub fn commit(&self) -> TinyResult {
        Database::buffer_pool().transaction_complete(self, true)
    }

    /// Roll dirtied pages back to their before-images and release the
    /// locks.
    pub fn abort(&self) -> TinyResult {
        Database::buffer_pool().transaction_complete(self, false)
    }
}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
