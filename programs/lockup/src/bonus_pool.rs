use primitive_types::U256;
use staking_nft::{Address, Authority, Context, Payout, PublicStaking, Receipt, Resource, TokenId, SCALE};
use tracing::info;

use crate::{
    error::{LockupError, Result},
    math::mul_div,
};

/// Stakes a fixed token endowment for the whole lock and hands lockers their
/// share of it, plus its profits, at termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusPool {
    pub(crate) address: Address,
    pub(crate) total_bonus_amount: U256,
    pub(crate) token_id: Option<TokenId>,
}

/// Where a terminated bonus position's value went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusSettlement {
    pub to_reward_pool: Payout,
    pub to_foundation: U256,
    pub to_factory: U256,
}

impl BonusPool {
    pub fn new(address: Address, total_bonus_amount: U256) -> Self {
        Self {
            address,
            total_bonus_amount,
            token_id: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token_id(&self) -> Option<TokenId> {
        self.token_id
    }

    pub fn total_bonus_amount(&self) -> U256 {
        self.total_bonus_amount
    }

    /// Stake the whole endowment as one position. `balance` is what the pool
    /// currently holds in tokens.
    pub fn create_bonus_staked_position<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        balance: U256,
    ) -> Result<Receipt<TokenId>> {
        if let Some(existing) = self.token_id {
            return Err(LockupError::BonusTokenAlreadyCreated(existing));
        }
        if balance < self.total_bonus_amount {
            return Err(LockupError::NotEnoughTokensToStake {
                balance,
                required: self.total_bonus_amount,
            });
        }
        let receipt = staking.mint(&ctx.with_caller(self.address), self.total_bonus_amount)?;
        self.token_id = Some(receipt.value);
        info!("Bonus position {} staked with {}", receipt.value, self.total_bonus_amount);
        Ok(receipt)
    }

    /// `total_bonus_amount * SCALE / original_shares`
    pub fn scaled_bonus_rate(&self, original_shares: U256) -> Result<U256> {
        mul_div(self.total_bonus_amount, SCALE, original_shares)
    }

    /// Everything `terminate` checks before it touches the ledger.
    pub fn require_terminable(&self, final_shares: U256, original_shares: U256) -> Result<TokenId> {
        let token_id = self.token_id.ok_or(LockupError::BonusTokenNotCreated)?;
        if original_shares.is_zero() || final_shares > original_shares {
            return Err(LockupError::InvalidOriginalSharesValue { final_shares, original_shares });
        }
        Ok(token_id)
    }

    fn settle(&self, burned: Payout, final_shares: U256, original_shares: U256) -> Result<BonusSettlement> {
        if original_shares.is_zero() || final_shares > original_shares {
            return Err(LockupError::InvalidOriginalSharesValue { final_shares, original_shares });
        }
        let profit_native = burned.native;
        let profit_token = burned
            .token
            .checked_sub(self.total_bonus_amount)
            .ok_or(LockupError::MathOverflow)?;

        let bonus_shares = mul_div(self.scaled_bonus_rate(original_shares)?, final_shares, SCALE)?;
        let proportion = mul_div(final_shares, SCALE, original_shares)?;
        let native = mul_div(proportion, profit_native, SCALE)?;
        let token = mul_div(proportion, profit_token, SCALE)?
            .checked_add(bonus_shares)
            .ok_or(LockupError::MathOverflow)?;

        Ok(BonusSettlement {
            to_reward_pool: Payout::new(native, token),
            to_foundation: profit_native.checked_sub(native).ok_or(LockupError::MathOverflow)?,
            to_factory: burned.token.checked_sub(token).ok_or(LockupError::MathOverflow)?,
        })
    }

    /// Burn the bonus position. Lockers receive `final / original` of its
    /// profits plus the same fraction of the endowment; the foundation keeps
    /// the remaining native profit and the factory the remaining tokens.
    pub fn terminate<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        final_shares: U256,
        original_shares: U256,
        reward_pool: Address,
        factory: Address,
        foundation: Address,
    ) -> Result<Receipt<Payout>> {
        let token_id = self.require_terminable(final_shares, original_shares)?;

        let mut receipt = Receipt::new(Payout::default());
        let burned = receipt.absorb(staking.burn(&ctx.with_caller(self.address), token_id)?);
        let settlement = self.settle(burned, final_shares, original_shares)?;

        receipt.push(Resource::Native, self.address, reward_pool, settlement.to_reward_pool.native);
        receipt.push(Resource::Token, self.address, reward_pool, settlement.to_reward_pool.token);
        receipt.push(Resource::Native, self.address, foundation, settlement.to_foundation);
        receipt.push(Resource::Token, self.address, factory, settlement.to_factory);
        info!(
            "Bonus pool terminated: reward pool native={} token={}",
            settlement.to_reward_pool.native, settlement.to_reward_pool.token
        );

        receipt.value = settlement.to_reward_pool;
        Ok(receipt)
    }

    /// What `terminate` would send to the reward pool right now.
    pub fn estimate_settlement<A: Authority>(
        &self,
        staking: &PublicStaking<A>,
        final_shares: U256,
        original_shares: U256,
    ) -> Result<Payout> {
        let token_id = self.require_terminable(final_shares, original_shares)?;
        let profits = staking.estimate_all_profits(token_id)?;
        let principal = staking.get_position(token_id)?.shares;
        let burned = Payout::new(
            profits.native,
            profits.token.checked_add(principal).ok_or(LockupError::MathOverflow)?,
        );
        Ok(self.settle(burned, final_shares, original_shares)?.to_reward_pool)
    }

    /// The part of the settlement owed to a position of `user_shares` out of
    /// `final_shares`. Zero while no bonus position exists.
    pub fn estimate_bonus_amount_with_reward<A: Authority>(
        &self,
        staking: &PublicStaking<A>,
        final_shares: U256,
        original_shares: U256,
        user_shares: U256,
    ) -> Result<Payout> {
        if self.token_id.is_none() {
            return Ok(Payout::default());
        }
        if user_shares > final_shares {
            return Err(LockupError::InvalidTotalSharesValue { user_shares, total_shares: final_shares });
        }
        let settlement = self.estimate_settlement(staking, final_shares, original_shares)?;
        Ok(Payout::new(
            mul_div(settlement.native, user_shares, final_shares)?,
            mul_div(settlement.token, user_shares, final_shares)?,
        ))
    }
}
