use tracing::info;

use crate::{
    context::{Authority, Context},
    error::{Result, StakingError},
    state::{Address, TokenId},
    PublicStaking,
};

/// Let `to` move `token_id` once on the owner's behalf.
pub fn approve<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    token_id: TokenId,
) -> Result<()> {
    if staking.owner_of(token_id)? != ctx.caller {
        return Err(StakingError::Unauthorized(ctx.caller));
    }
    staking.approvals.insert(token_id, to);
    Ok(())
}

/// Move `token_id` from `from` to `to`. Caller must be the owner or approved.
pub fn transfer_from<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    from: Address,
    to: Address,
    token_id: TokenId,
) -> Result<()> {
    let owner = staking.owner_of(token_id)?;
    if owner != from {
        return Err(StakingError::CallerNotTokenOwner(from));
    }
    let approved = staking.approvals.get(&token_id) == Some(&ctx.caller);
    if ctx.caller != owner && !approved {
        return Err(StakingError::Unauthorized(ctx.caller));
    }

    staking.approvals.remove(&token_id);
    staking.owners.insert(token_id, to);
    if let Some(count) = staking.balances.get_mut(&from) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            staking.balances.remove(&from);
        }
    }
    *staking.balances.entry(to).or_insert(0) += 1;
    info!("Position {} transferred {:?} -> {:?}", token_id, from, to);
    Ok(())
}
