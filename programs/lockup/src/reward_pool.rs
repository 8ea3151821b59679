use primitive_types::U256;
use staking_nft::{Address, Payout};
use tracing::debug;

use crate::{
    bonus_pool::BonusPool,
    error::{LockupError, Result},
    math::mul_div,
};

/// Holds the reserved 20% of every locker's profit, forfeited rewards and the
/// bonus pool's final settlement, and pays it out pro rata at unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardPool {
    pub(crate) address: Address,
    pub(crate) eth_reserve: U256,
    pub(crate) token_reserve: U256,
    pub(crate) bonus_pool: BonusPool,
}

impl RewardPool {
    pub fn new(address: Address, bonus_pool: BonusPool) -> Self {
        Self {
            address,
            eth_reserve: U256::zero(),
            token_reserve: U256::zero(),
            bonus_pool,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn eth_reserve(&self) -> U256 {
        self.eth_reserve
    }

    pub fn token_reserve(&self) -> U256 {
        self.token_reserve
    }

    pub fn bonus_pool(&self) -> &BonusPool {
        &self.bonus_pool
    }

    pub fn deposit(&mut self, amount: Payout) -> Result<()> {
        let eth = self
            .eth_reserve
            .checked_add(amount.native)
            .ok_or(LockupError::MathOverflow)?;
        let token = self
            .token_reserve
            .checked_add(amount.token)
            .ok_or(LockupError::MathOverflow)?;
        self.eth_reserve = eth;
        self.token_reserve = token;
        debug!(%eth, %token, "reward pool deposit");
        Ok(())
    }

    /// `reserve * user_shares / total_shares` per resource; the last position
    /// takes whatever is left so nothing is stranded by rounding.
    pub fn estimate_payout(&self, total_shares: U256, user_shares: U256, is_last: bool) -> Result<Payout> {
        if total_shares.is_zero() || user_shares > total_shares {
            return Err(LockupError::InvalidTotalSharesValue { user_shares, total_shares });
        }
        if is_last {
            return Ok(Payout::new(self.eth_reserve, self.token_reserve));
        }
        Ok(Payout::new(
            mul_div(self.eth_reserve, user_shares, total_shares)?,
            mul_div(self.token_reserve, user_shares, total_shares)?,
        ))
    }

    pub fn payout(&mut self, total_shares: U256, user_shares: U256, is_last: bool) -> Result<Payout> {
        let payout = self.estimate_payout(total_shares, user_shares, is_last)?;
        self.eth_reserve -= payout.native;
        self.token_reserve -= payout.token;
        Ok(payout)
    }
}
