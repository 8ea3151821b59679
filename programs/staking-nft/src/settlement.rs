use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::state::{Address, Resource};

/// One asset movement the transaction layer must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub resource: Resource,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Value returned by an operation together with the transfers it implies.
///
/// State is fully committed before a receipt exists, so applying the
/// transfers later can never observe a half-updated ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub transfers: Vec<Transfer>,
}

impl<T> Receipt<T> {
    pub fn new(value: T) -> Self {
        Self { value, transfers: Vec::new() }
    }

    /// Record a transfer; zero amounts are dropped.
    pub fn push(&mut self, resource: Resource, from: Address, to: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        self.transfers.push(Transfer { resource, from, to, amount });
    }

    /// Take over another receipt's transfers and hand back its value.
    pub fn absorb<U>(&mut self, other: Receipt<U>) -> U {
        self.transfers.extend(other.transfers);
        other.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Receipt<U> {
        Receipt {
            value: f(self.value),
            transfers: self.transfers,
        }
    }
}
