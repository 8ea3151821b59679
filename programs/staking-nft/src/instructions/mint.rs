use primitive_types::U256;
use tracing::info;

use super::accumulator_math::skim;
use crate::{
    constants::*,
    context::{Authority, Context},
    error::{Result, StakingError},
    settlement::Receipt,
    state::{Address, Position, Resource, TokenId},
    PublicStaking,
};

/// Stake `shares` tokens from the caller into a fresh position owned by `to`.
///
/// Both pools are skimmed at the pre-mint supply so existing holders keep
/// their exact share of pending slush; the new position starts at the
/// post-skim accumulators.
pub fn handler<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    shares: U256,
    lock_duration: u64,
) -> Result<Receipt<TokenId>> {
    staking.require_circuit_breaker_closed()?;
    if shares.is_zero() {
        return Err(StakingError::MintAmountZero);
    }
    if lock_duration > MAX_MINT_LOCK {
        return Err(StakingError::LockDurationGreaterThanMintLock(lock_duration));
    }
    let total_shares = staking
        .total_shares
        .checked_add(shares)
        .filter(|total| *total < MAX_SHARES)
        .ok_or(StakingError::MintAmountExceedsMaximumSupply)?;

    let free_after = ctx
        .height
        .checked_add(lock_duration.max(1))
        .ok_or(StakingError::MathOverflow)?;
    let withdraw_free_after = ctx.height.checked_add(1).ok_or(StakingError::MathOverflow)?;

    let token_pool = &staking.pools[Resource::Token.index()];
    let token_reserve = token_pool
        .reserve
        .checked_add(shares)
        .ok_or(StakingError::MathOverflow)?;
    let token_id = staking
        .latest_token_id
        .checked_add(1)
        .ok_or(StakingError::MathOverflow)?;

    // ── Commit ───────────────────────────────────────────────────────────────
    let mut snapshot = [U256::zero(); 2];
    for resource in Resource::ALL {
        let pool = &mut staking.pools[resource.index()];
        pool.state = skim(staking.total_shares, pool.state);
        snapshot[resource.index()] = pool.state.accumulator;
    }
    staking.pools[Resource::Token.index()].reserve = token_reserve;
    staking.total_shares = total_shares;
    staking.latest_token_id = token_id;
    staking.positions.insert(
        token_id,
        Position {
            shares,
            free_after,
            withdraw_free_after,
            accumulator_snapshot: snapshot,
        },
    );
    staking.owners.insert(token_id, to);
    *staking.balances.entry(to).or_insert(0) += 1;

    info!(
        "Position minted: id={} owner={:?} shares={} free_after={}",
        token_id, to, shares, free_after
    );

    let mut receipt = Receipt::new(token_id);
    receipt.push(Resource::Token, ctx.caller, staking.address, shares);
    Ok(receipt)
}
