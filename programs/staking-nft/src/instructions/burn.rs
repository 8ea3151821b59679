use tracing::info;

use super::accumulator_math::{self, skim};
use crate::{
    context::{Authority, Context},
    error::{Result, StakingError},
    settlement::Receipt,
    state::{Address, Payout, Resource, TokenId},
    PublicStaking,
};

/// Close `token_id`: final collect of both resources plus the staked
/// principal, paid to `to`.
///
/// Requires `height > free_after`, so a position can never be minted and
/// burned in the same block.
pub fn handler<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    token_id: TokenId,
) -> Result<Receipt<Payout>> {
    // Read state before mutating anything
    let position = *staking.position(token_id)?;
    let owner = staking.owner_of(token_id)?;
    if owner != ctx.caller {
        return Err(StakingError::CallerNotTokenOwner(ctx.caller));
    }
    if ctx.height <= position.free_after {
        return Err(StakingError::FreeAfterTimeNotReached {
            free_after: position.free_after,
            height: ctx.height,
        });
    }

    let total_shares = staking.total_shares;
    let remaining_shares = total_shares
        .checked_sub(position.shares)
        .ok_or(StakingError::MathOverflow)?;

    // ── Final collect at the pre-removal supply ─────────────────────────────
    let native = accumulator_math::collect(
        total_shares,
        staking.pools[Resource::Native.index()].state,
        position.shares,
        position.snapshot(Resource::Native),
    )?;
    let token = accumulator_math::collect(
        total_shares,
        staking.pools[Resource::Token.index()].state,
        position.shares,
        position.snapshot(Resource::Token),
    )?;
    let payout = Payout::new(
        native.payout,
        token
            .payout
            .checked_add(position.shares)
            .ok_or(StakingError::MathOverflow)?,
    );
    let native_reserve = staking.pools[Resource::Native.index()]
        .reserve
        .checked_sub(payout.native)
        .ok_or(StakingError::MathOverflow)?;
    let token_reserve = staking.pools[Resource::Token.index()]
        .reserve
        .checked_sub(payout.token)
        .ok_or(StakingError::MathOverflow)?;

    // ── Commit ───────────────────────────────────────────────────────────────
    // Skim at the post-removal supply so rounding dust left by the leaver is
    // shared by whoever stays.
    for (resource, collection, reserve) in [
        (Resource::Native, native, native_reserve),
        (Resource::Token, token, token_reserve),
    ] {
        let pool = &mut staking.pools[resource.index()];
        pool.state = skim(remaining_shares, collection.state);
        pool.reserve = reserve;
    }
    staking.total_shares = remaining_shares;
    staking.positions.remove(&token_id);
    staking.owners.remove(&token_id);
    staking.approvals.remove(&token_id);
    if let Some(count) = staking.balances.get_mut(&owner) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            staking.balances.remove(&owner);
        }
    }

    info!(
        "Position burned: id={} native={} token={} (principal {})",
        token_id, payout.native, payout.token, position.shares
    );

    let mut receipt = Receipt::new(payout);
    receipt.push(Resource::Native, staking.address, to, payout.native);
    receipt.push(Resource::Token, staking.address, to, payout.token);
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::*, context::Roles};
    use primitive_types::{H160, U256};

    fn addr(n: u64) -> Address {
        H160::from_low_u64_be(n)
    }

    #[test]
    fn burn_in_mint_block_is_rejected() {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let ctx = Context::new(addr(2), 5);
        let id = staking.mint(&ctx, U256::from(100u8)).unwrap().value;
        assert_eq!(
            staking.burn(&ctx, id).unwrap_err(),
            StakingError::FreeAfterTimeNotReached { free_after: 6, height: 5 }
        );
        // free_after itself is still locked
        assert!(staking.burn(&Context::new(addr(2), 6), id).is_err());
        assert!(staking.burn(&Context::new(addr(2), 7), id).is_ok());
    }

    #[test]
    fn burn_returns_principal_and_profit() {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let id = staking.mint(&Context::new(addr(2), 1), U256::from(100u8)).unwrap().value;
        staking.mint(&Context::new(addr(3), 1), U256::from(300u16)).unwrap();
        staking
            .deposit_native(&Context::new(addr(4), 1), MAGIC_VALUE, U256::from(40u8))
            .unwrap();

        let receipt = staking.burn_to(&Context::new(addr(2), 3), addr(9), id).unwrap();
        assert_eq!(receipt.value, Payout::new(U256::from(10u8), U256::from(100u8)));
        assert!(receipt.transfers.iter().all(|t| t.to == addr(9)));
        assert_eq!(staking.get_total_shares(), U256::from(300u16));
        assert_eq!(staking.get_total_reserve(Resource::Token), U256::from(300u16));
        assert_eq!(staking.get_total_reserve(Resource::Native), U256::from(30u8));
        assert_eq!(staking.get_position(id).unwrap_err(), StakingError::InvalidTokenId(id));
        assert_eq!(staking.balance_of(&addr(2)), 0);
    }

    #[test]
    fn only_owner_may_burn() {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let id = staking.mint(&Context::new(addr(2), 1), U256::one()).unwrap().value;
        assert_eq!(
            staking.burn(&Context::new(addr(3), 9), id).unwrap_err(),
            StakingError::CallerNotTokenOwner(addr(3))
        );
    }
}
