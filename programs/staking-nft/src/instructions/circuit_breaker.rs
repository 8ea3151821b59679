use tracing::warn;

use crate::{
    context::{Authority, Context},
    error::{Result, StakingError},
    PublicStaking,
};

fn require_operator<A: Authority>(staking: &PublicStaking<A>, ctx: &Context) -> Result<()> {
    let authority = &staking.authority;
    if authority.is_privileged(&ctx.caller) || authority.is_owner(&ctx.caller) {
        Ok(())
    } else {
        Err(StakingError::OnlyFactory)
    }
}

/// Halt mint, deposit and lock operations. Collect and burn stay open.
pub fn trip<A: Authority>(staking: &mut PublicStaking<A>, ctx: &Context) -> Result<()> {
    require_operator(staking, ctx)?;
    if staking.circuit_breaker_open {
        return Err(StakingError::CircuitBreakerOpened);
    }
    staking.circuit_breaker_open = true;
    warn!("Circuit breaker tripped by {:?} at block {}", ctx.caller, ctx.height);
    Ok(())
}

pub fn reset<A: Authority>(staking: &mut PublicStaking<A>, ctx: &Context) -> Result<()> {
    require_operator(staking, ctx)?;
    if !staking.circuit_breaker_open {
        return Err(StakingError::CircuitBreakerClosed);
    }
    staking.circuit_breaker_open = false;
    warn!("Circuit breaker reset by {:?} at block {}", ctx.caller, ctx.height);
    Ok(())
}
