use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::gym::stock::domain::Transaction;

/// The discrete set of transactions a trader may request.
///
/// Transactions run from `-max_transaction` to `max_transaction` in steps of
/// `increment`, e.g. `[-3, -2, -1, 0, 1, 2, 3]`. Index `i` of the space is the
/// column `i` of a Q-table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    transactions: Vec<Transaction>,
    max_transaction: i64,
    increment: i64,
}

impl ActionSpace {
    pub fn new(max_transaction: i64, increment: i64) -> Self {
        let transactions = if max_transaction > 0 && increment > 0 {
            (-max_transaction..=max_transaction)
                .step_by(increment as usize)
                .map(Transaction)
                .collect()
        } else {
            vec![Transaction::HOLD]
        };

        Self {
            transactions,
            max_transaction,
            increment,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, transaction: Transaction) -> bool {
        self.index_of(transaction).is_some()
    }

    /// Column of `transaction`, computed arithmetically.
    pub fn index_of(&self, transaction: Transaction) -> Option<usize> {
        let t = transaction.0;
        if self.increment <= 0 || self.max_transaction <= 0 {
            return (t == 0).then_some(0);
        }
        if t.abs() > self.max_transaction || t % self.increment != 0 {
            return None;
        }
        Some(((t + self.max_transaction) / self.increment) as usize)
    }

    pub fn transaction_at(&self, index: usize) -> Option<Transaction> {
        self.transactions.get(index).copied()
    }

    /// Draws a transaction uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Transaction {
        self.transactions
            .choose(rng)
            .copied()
            .unwrap_or(Transaction::HOLD)
    }
}
