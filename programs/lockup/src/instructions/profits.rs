use primitive_types::U256;
use staking_nft::{
    Address, Authority, Context, Payout, PublicStaking, Receipt, Resource, StakingError, TokenId,
};
use tracing::{debug, info};

use crate::{
    error::{LockupError, Result},
    math::split,
    state::LockupState,
    Lockup,
};

/// Move the reserved part of `profit` into the reward pool and return the
/// user's part, which stays with the lockup until it is paid out.
pub(crate) fn reserve_profit<T>(
    lockup: &mut Lockup,
    receipt: &mut Receipt<T>,
    profit: Payout,
) -> Result<Payout> {
    let (reserved, user) = split(profit)?;
    lockup.reward_pool.deposit(reserved)?;
    let (from, to) = (lockup.address(), lockup.reward_pool.address());
    receipt.push(Resource::Native, from, to, reserved.native);
    receipt.push(Resource::Token, from, to, reserved.token);
    Ok(user)
}

/// Collect the caller's locked position and forward 80% of it to them.
pub fn collect_all_profits<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
) -> Result<Receipt<Payout>> {
    lockup.require_not_post_lock(ctx.height)?;
    let token_id = lockup.locked_token(&ctx.caller)?;

    let mut receipt = Receipt::new(Payout::default());
    let profit = receipt.absorb(staking.collect_all_profits(&ctx.with_caller(lockup.address()), token_id)?);
    let user = reserve_profit(lockup, &mut receipt, profit)?;

    let from = lockup.address();
    receipt.push(Resource::Native, from, ctx.caller, user.native);
    receipt.push(Resource::Token, from, ctx.caller, user.token);
    info!("Profits collected for {:?}: native={} token={}", ctx.caller, user.native, user.token);

    receipt.value = user;
    Ok(receipt)
}

/// Check that every position in `batch` can be collected at `height` and,
/// when the batch is the last one, that the bonus pool can be terminated.
fn require_aggregatable<A: Authority>(
    lockup: &Lockup,
    staking: &PublicStaking<A>,
    height: u64,
    batch: &[TokenId],
    last: bool,
) -> Result<()> {
    let bonus = lockup
        .reward_pool
        .bonus_pool
        .require_terminable(lockup.total_shares_locked, lockup.original_shares_locked)?;
    for token_id in batch {
        let position = staking.get_position(*token_id)?;
        if height < position.withdraw_free_after {
            return Err(StakingError::LockDurationWithdrawTimeNotReached {
                withdraw_free_after: position.withdraw_free_after,
                height,
            }
            .into());
        }
    }
    if last {
        let position = staking.get_position(bonus)?;
        if height <= position.free_after {
            return Err(StakingError::FreeAfterTimeNotReached {
                free_after: position.free_after,
                height,
            }
            .into());
        }
    }
    Ok(())
}

/// Collect up to `batch` locked positions, crediting each owner's share to
/// their temporary reward balance. Once every position is settled the bonus
/// pool is terminated into the reward pool and payout becomes safe.
pub fn aggregate_profits<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    batch: usize,
) -> Result<Receipt<bool>> {
    lockup.require_state(ctx.height, LockupState::PostLock)?;
    if lockup.payout_safe {
        return Err(LockupError::PayoutSafe);
    }

    let start = lockup.aggregation_cursor;
    let end = start.saturating_add(batch).min(lockup.positions.len());
    let ids: Vec<TokenId> = lockup.positions.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
    let last = end == lockup.positions.len();
    require_aggregatable(lockup, staking, ctx.height, &ids, last)?;

    let lockup_ctx = ctx.with_caller(lockup.address());
    let mut receipt = Receipt::new(false);
    for token_id in ids {
        let owner = lockup
            .owners
            .get(&token_id)
            .copied()
            .ok_or(LockupError::TokenIdNotLocked(token_id))?;
        let profit = receipt.absorb(staking.collect_all_profits(&lockup_ctx, token_id)?);
        let user = reserve_profit(lockup, &mut receipt, profit)?;

        let balance = lockup.get_temporary_reward_balance(&owner);
        let credited = balance.checked_add(user).ok_or(LockupError::MathOverflow)?;
        lockup.rewards.insert(owner, credited);
        debug!(token_id, native = %credited.native, token = %credited.token, "aggregated");
    }
    lockup.aggregation_cursor = end;

    if last {
        let (reward_pool, factory, foundation) = (
            lockup.reward_pool.address(),
            lockup.config.factory,
            lockup.config.foundation,
        );
        let (total, original) = (lockup.total_shares_locked, lockup.original_shares_locked);
        let bonus = receipt.absorb(lockup.reward_pool.bonus_pool.terminate(
            staking,
            ctx,
            total,
            original,
            reward_pool,
            factory,
            foundation,
        )?);
        lockup.reward_pool.deposit(bonus)?;
        lockup.payout_safe = true;
        lockup.aggregation_cursor = 0;
        info!("Lockup profits aggregated over {} positions", lockup.positions.len());
    }

    receipt.value = lockup.payout_safe;
    Ok(receipt)
}

/// Profits `token_id`'s owner would take home on exit right now.
///
/// Before aggregation that is 80% of what the position has accrued; after,
/// the temporary reward balance and the reward-pool share are added in full.
pub fn estimate_profits<A: Authority>(
    lockup: &Lockup,
    staking: &PublicStaking<A>,
    token_id: TokenId,
) -> Result<Payout> {
    let owner: Address = lockup
        .owner_of(token_id)
        .ok_or(LockupError::TokenIdNotLocked(token_id))?;
    let accrued = staking.estimate_all_profits(token_id)?;
    if !lockup.payout_safe {
        return Ok(split(accrued)?.1);
    }

    let shares = staking.get_position(token_id)?.shares;
    let is_last = lockup.positions.len() == 1;
    let pool_share = lockup
        .reward_pool
        .estimate_payout(lockup.total_shares_locked, shares, is_last)?;
    accrued
        .checked_add(pool_share)
        .and_then(|p| p.checked_add(lockup.get_temporary_reward_balance(&owner)))
        .ok_or(LockupError::MathOverflow)
}

/// Position shares and what `token_id` is owed through the reward pool at
/// the end of the lock: 20% of its unclaimed profit, its share of the pool
/// and its share of the bonus settlement.
pub fn estimate_final_bonus_with_profits<A: Authority>(
    lockup: &Lockup,
    staking: &PublicStaking<A>,
    height: u64,
    token_id: TokenId,
) -> Result<(U256, Payout)> {
    if lockup.get_state(height) == LockupState::PreLock {
        return Err(LockupError::PreLockStateNotAllowed);
    }
    if lockup.owner_of(token_id).is_none() {
        return Err(LockupError::TokenIdNotLocked(token_id));
    }
    let shares = staking.get_position(token_id)?.shares;
    let (total, original) = (lockup.total_shares_locked, lockup.original_shares_locked);

    let (reserved, _) = split(staking.estimate_all_profits(token_id)?)?;
    let pool_share = lockup.reward_pool.estimate_payout(total, shares, false)?;
    // Once aggregated the bonus already sits in the reward pool.
    let bonus = if lockup.payout_safe {
        Payout::default()
    } else {
        lockup
            .reward_pool
            .bonus_pool
            .estimate_bonus_amount_with_reward(staking, total, original, shares)?
    };

    let payout = reserved
        .checked_add(pool_share)
        .and_then(|p| p.checked_add(bonus))
        .ok_or(LockupError::MathOverflow)?;
    Ok((shares, payout))
}
