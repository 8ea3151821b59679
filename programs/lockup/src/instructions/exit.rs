use primitive_types::U256;
use staking_nft::{Address, Authority, Context, Payout, PublicStaking, Receipt, Resource};
use tracing::info;

use super::profits::reserve_profit;
use crate::{
    error::{LockupError, Result},
    state::LockupState,
    Lockup,
};

/// Send `payout` from the lockup to `to`. With `stake_exit` the tokens are
/// staked into a fresh unlocked position owned by `to` instead.
fn deliver<A: Authority>(
    lockup: &Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    receipt: &mut Receipt<Payout>,
    to: Address,
    payout: Payout,
    stake_exit: bool,
) -> Result<()> {
    let from = lockup.address();
    receipt.push(Resource::Native, from, to, payout.native);
    if stake_exit && !payout.token.is_zero() {
        let minted = receipt.absorb(staking.mint_to(&ctx.with_caller(from), to, payout.token, 0)?);
        info!("Exit of {:?} re-staked as position {}", to, minted);
    } else {
        receipt.push(Resource::Token, from, to, payout.token);
    }
    Ok(())
}

/// Leave the lockup with `exit_shares` of principal before it ends.
///
/// The position is burned; whatever is not exited is re-minted and stays
/// locked in the same index slot. Profits are split as usual and any
/// temporary reward balance is forfeited to the reward pool. Anything that
/// needs a mint is refused up front while the circuit breaker is open.
pub fn unlock_early<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    exit_shares: U256,
    stake_exit: bool,
) -> Result<Receipt<Payout>> {
    if lockup.get_state(ctx.height) == LockupState::PostLock && !lockup.payout_safe {
        return Err(LockupError::PayoutUnsafe);
    }
    let user = ctx.caller;
    let token_id = lockup.locked_token(&user)?;
    let shares = staking.get_position(token_id)?.shares;
    if exit_shares > shares {
        return Err(LockupError::InsufficientBalanceForEarlyExit { exit: exit_shares, shares });
    }
    let remaining = shares - exit_shares;
    if !remaining.is_zero() || stake_exit {
        lockup.require_mint_open(staking)?;
    }

    let lockup_ctx = ctx.with_caller(lockup.address());
    let mut receipt = Receipt::new(Payout::default());
    let burned = receipt.absorb(staking.burn(&lockup_ctx, token_id)?);
    let profit = Payout::new(
        burned.native,
        burned.token.checked_sub(shares).ok_or(LockupError::MathOverflow)?,
    );

    if remaining.is_zero() {
        lockup.remove_position(&user, token_id);
    } else {
        let reminted = receipt.absorb(staking.mint(&lockup_ctx, remaining)?);
        lockup.replace_position(user, token_id, reminted);
    }
    lockup.total_shares_locked = lockup
        .total_shares_locked
        .checked_sub(exit_shares)
        .ok_or(LockupError::MathOverflow)?;

    if let Some(forfeited) = lockup.rewards.remove(&user) {
        lockup.reward_pool.deposit(forfeited)?;
        let (from, to) = (lockup.address(), lockup.reward_pool.address());
        receipt.push(Resource::Native, from, to, forfeited.native);
        receipt.push(Resource::Token, from, to, forfeited.token);
    }

    let user_profit = reserve_profit(lockup, &mut receipt, profit)?;
    let payout = Payout::new(
        user_profit.native,
        user_profit
            .token
            .checked_add(exit_shares)
            .ok_or(LockupError::MathOverflow)?,
    );
    deliver(lockup, staking, ctx, &mut receipt, user, payout, stake_exit)?;
    info!(
        "Early exit of {} shares by {:?}: native={} token={}",
        exit_shares, user, payout.native, payout.token
    );

    receipt.value = payout;
    Ok(receipt)
}

/// Final exit once profits are aggregated: the position's principal and
/// profit, its reward-pool share and its temporary reward balance go to `to`.
pub fn unlock<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    stake_exit: bool,
) -> Result<Receipt<Payout>> {
    lockup.require_state(ctx.height, LockupState::PostLock)?;
    if !lockup.payout_safe {
        return Err(LockupError::PayoutUnsafe);
    }
    let user = ctx.caller;
    let token_id = lockup.locked_token(&user)?;
    let shares = staking.get_position(token_id)?.shares;
    let is_last = lockup.positions.len() == 1;
    lockup
        .reward_pool
        .estimate_payout(lockup.total_shares_locked, shares, is_last)?;
    if stake_exit {
        lockup.require_mint_open(staking)?;
    }

    let mut receipt = Receipt::new(Payout::default());
    let burned = receipt.absorb(staking.burn(&ctx.with_caller(lockup.address()), token_id)?);
    let pool_share = lockup
        .reward_pool
        .payout(lockup.total_shares_locked, shares, is_last)?;
    let (pool, from) = (lockup.reward_pool.address(), lockup.address());
    receipt.push(Resource::Native, pool, from, pool_share.native);
    receipt.push(Resource::Token, pool, from, pool_share.token);

    let temporary = lockup.rewards.remove(&user).unwrap_or_default();
    let payout = burned
        .checked_add(pool_share)
        .and_then(|p| p.checked_add(temporary))
        .ok_or(LockupError::MathOverflow)?;

    lockup.remove_position(&user, token_id);
    lockup.total_shares_locked = lockup
        .total_shares_locked
        .checked_sub(shares)
        .ok_or(LockupError::MathOverflow)?;

    deliver(lockup, staking, ctx, &mut receipt, to, payout, stake_exit)?;
    info!("Position {} unlocked to {:?}: native={} token={}", token_id, to, payout.native, payout.token);

    receipt.value = payout;
    Ok(receipt)
}
