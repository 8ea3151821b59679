//! The asset collaborator: who holds how much of each resource.

use std::collections::BTreeMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use staking_nft::{Address, Payout, Resource, Transfer};

use crate::error::{Error, Result};

/// Balances the engine's receipts are settled against.
pub trait AssetLedger {
    fn balance(&self, account: &Address, resource: Resource) -> U256;

    /// Move `transfer.amount` from `transfer.from` to `transfer.to`, or fail
    /// without changing anything.
    fn transfer(&mut self, transfer: &Transfer) -> Result<()>;

    /// Apply every transfer in order. Stops at the first failure; callers
    /// that need all-or-nothing run this on a copy.
    fn apply(&mut self, transfers: &[Transfer]) -> Result<()> {
        transfers.iter().try_for_each(|t| self.transfer(t))
    }
}

/// Plain map of balances; the default backing for [`crate::StakingClient`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryAssets {
    balances: BTreeMap<Address, Payout>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` of `resource` out of thin air into `account`.
    pub fn credit(&mut self, account: Address, resource: Resource, amount: U256) -> Result<()> {
        let entry = self.balances.entry(account).or_default();
        let updated = entry
            .get(resource)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;
        set(entry, resource, updated);
        Ok(())
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Payout)> {
        self.balances.iter()
    }
}

fn set(balance: &mut Payout, resource: Resource, amount: U256) {
    match resource {
        Resource::Native => balance.native = amount,
        Resource::Token => balance.token = amount,
    }
}

impl AssetLedger for InMemoryAssets {
    fn balance(&self, account: &Address, resource: Resource) -> U256 {
        self.balances
            .get(account)
            .map(|b| b.get(resource))
            .unwrap_or_default()
    }

    fn transfer(&mut self, transfer: &Transfer) -> Result<()> {
        let Transfer { resource, from, to, amount } = *transfer;
        let balance = self.balance(&from, resource);
        let debited = balance.checked_sub(amount).ok_or(Error::InsufficientBalance {
            account: from,
            resource,
            balance,
            required: amount,
        })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(&to, resource)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;

        set(self.balances.entry(from).or_default(), resource, debited);
        set(self.balances.entry(to).or_default(), resource, credited);
        Ok(())
    }
}
