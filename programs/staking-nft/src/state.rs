use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};
use crate::instructions::accumulator_math;

/// Account identifier used for owners, roles and transfer endpoints.
pub type Address = H160;

/// Sequential position identifier, starting at 1.
pub type TokenId = u64;

// ─── Resource ──────────────────────────────────────────────────────────────
// The two fungible assets distributed to positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Native,
    Token,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Native, Resource::Token];

    pub const fn index(self) -> usize {
        match self {
            Resource::Native => 0,
            Resource::Token => 1,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Native => f.write_str("native"),
            Resource::Token => f.write_str("token"),
        }
    }
}

// ─── Accumulator ───────────────────────────────────────────────────────────
// Scaled payout-per-share counter plus the undistributed remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    /// Cumulative payout per share * SCALE, modulo 2^168
    pub accumulator: U256,
    /// Deposited value not yet folded into `accumulator`
    pub slush: U256,
}

// ─── ResourcePool ──────────────────────────────────────────────────────────
// Per-resource accounting. `reserve` is everything the pool owes: deposits
// plus minted principal minus payouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub state: Accumulator,
    pub reserve: U256,
}

impl ResourcePool {
    /// Fold `amount` into slush and grow the reserve.
    pub fn deposit(&mut self, amount: U256) -> Result<()> {
        let state = accumulator_math::deposit(amount, self.state)?;
        let reserve = self
            .reserve
            .checked_add(amount)
            .ok_or(StakingError::MathOverflow)?;

        self.state = state;
        self.reserve = reserve;
        Ok(())
    }

    /// Balance held above the reserve; recoverable only through skim-excess.
    pub fn excess(&self, observed_balance: U256) -> Result<U256> {
        observed_balance
            .checked_sub(self.reserve)
            .ok_or(StakingError::BalanceLessThanReserve {
                balance: observed_balance,
                reserve: self.reserve,
            })
    }
}

// ─── Position ──────────────────────────────────────────────────────────────
// One staking position. Ownership is tracked by the ledger, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Shares held; always in (0, 2^224)
    pub shares: U256,
    /// Block after which the position may be burned
    pub free_after: u64,
    /// Block from which profits may be collected
    pub withdraw_free_after: u64,
    /// Accumulator value at last reconciliation, indexed by `Resource`
    pub accumulator_snapshot: [U256; 2],
}

impl Position {
    pub fn snapshot(&self, resource: Resource) -> U256 {
        self.accumulator_snapshot[resource.index()]
    }
}

// ─── Payout ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub native: U256,
    pub token: U256,
}

impl Payout {
    pub fn new(native: U256, token: U256) -> Self {
        Self { native, token }
    }

    pub fn get(&self, resource: Resource) -> U256 {
        match resource {
            Resource::Native => self.native,
            Resource::Token => self.token,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.native.is_zero() && self.token.is_zero()
    }

    pub fn checked_add(self, other: Payout) -> Option<Payout> {
        Some(Payout {
            native: self.native.checked_add(other.native)?,
            token: self.token.checked_add(other.token)?,
        })
    }

    pub fn checked_sub(self, other: Payout) -> Option<Payout> {
        Some(Payout {
            native: self.native.checked_sub(other.native)?,
            token: self.token.checked_sub(other.token)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{SCALE, SLUSH_MAX};

    #[test]
    fn deposit_grows_reserve_and_slush() {
        let mut pool = ResourcePool::default();
        pool.deposit(U256::from(7u8)).unwrap();
        assert_eq!(pool.reserve, U256::from(7u8));
        assert_eq!(pool.state.slush, U256::from(7u8) * SCALE);
        assert_eq!(pool.state.accumulator, U256::zero());
    }

    #[test]
    fn rejected_deposit_leaves_pool_untouched() {
        let mut pool = ResourcePool::default();
        let too_much = SLUSH_MAX / SCALE + 1;
        let err = pool.deposit(too_much).unwrap_err();
        assert!(matches!(err, StakingError::SlushTooLarge(_)));
        assert_eq!(pool, ResourcePool::default());
    }

    #[test]
    fn excess_is_balance_above_reserve() {
        let pool = ResourcePool { reserve: U256::from(100u8), ..Default::default() };
        assert_eq!(pool.excess(U256::from(130u8)).unwrap(), U256::from(30u8));
        assert_eq!(
            pool.excess(U256::from(99u8)).unwrap_err(),
            StakingError::BalanceLessThanReserve {
                balance: U256::from(99u8),
                reserve: U256::from(100u8),
            }
        );
    }
}
