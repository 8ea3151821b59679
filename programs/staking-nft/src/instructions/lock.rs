use primitive_types::U256;
use tracing::info;

use crate::{
    constants::MAX_GOVERNANCE_LOCK,
    context::{Authority, Context},
    error::{Result, StakingError},
    state::{Address, TokenId},
    PublicStaking,
};

#[derive(Clone, Copy)]
enum LockKind {
    Burn,
    Withdraw,
}

/// Push the chosen lock to `max(existing, now + duration)` and return the
/// position's shares.
fn extend<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    owner: &Address,
    token_id: TokenId,
    duration: u64,
    kind: LockKind,
) -> Result<U256> {
    staking.require_circuit_breaker_closed()?;
    staking.position(token_id)?;
    staking.require_owner(token_id, owner)?;
    if duration > MAX_GOVERNANCE_LOCK {
        return Err(StakingError::LockDurationGreaterThanGovernanceLock(duration));
    }
    let until = ctx
        .height
        .checked_add(duration)
        .ok_or(StakingError::MathOverflow)?;

    let position = staking
        .positions
        .get_mut(&token_id)
        .ok_or(StakingError::InvalidTokenId(token_id))?;
    let lock = match kind {
        LockKind::Burn => &mut position.free_after,
        LockKind::Withdraw => &mut position.withdraw_free_after,
    };
    *lock = (*lock).max(until);
    info!("Position {} locked until {}", token_id, *lock);

    Ok(position.shares)
}

/// Governance locks a position on behalf of `owner`.
pub fn lock_position<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    owner: Address,
    token_id: TokenId,
    duration: u64,
) -> Result<U256> {
    if !staking.authority.is_governance(&ctx.caller) {
        return Err(StakingError::OnlyGovernance);
    }
    extend(staking, ctx, &owner, token_id, duration, LockKind::Burn)
}

pub fn lock_own_position<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    token_id: TokenId,
    duration: u64,
) -> Result<U256> {
    extend(staking, ctx, &ctx.caller, token_id, duration, LockKind::Burn)
}

pub fn lock_withdraw<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    token_id: TokenId,
    duration: u64,
) -> Result<U256> {
    extend(staking, ctx, &ctx.caller, token_id, duration, LockKind::Withdraw)
}
