use primitive_types::U256;
use tracing::info;

use super::accumulator_math::{self, Collection};
use crate::{
    context::{Authority, Context},
    error::{Result, StakingError},
    settlement::Receipt,
    state::{Address, Payout, Position, Resource, TokenId},
    PublicStaking,
};

fn reconcile<A: Authority>(
    staking: &PublicStaking<A>,
    position: &Position,
    resource: Resource,
) -> Result<Collection> {
    let pool = &staking.pools[resource.index()];
    accumulator_math::collect(
        staking.total_shares,
        pool.state,
        position.shares,
        position.snapshot(resource),
    )
}

fn require_withdrawable(position: &Position, ctx: &Context) -> Result<()> {
    if ctx.height < position.withdraw_free_after {
        return Err(StakingError::LockDurationWithdrawTimeNotReached {
            withdraw_free_after: position.withdraw_free_after,
            height: ctx.height,
        });
    }
    Ok(())
}

/// Apply a computed collection to the pool and the position.
fn commit<A: Authority>(
    staking: &mut PublicStaking<A>,
    token_id: TokenId,
    resource: Resource,
    collection: Collection,
    reserve: U256,
) {
    let pool = &mut staking.pools[resource.index()];
    pool.state = collection.state;
    pool.reserve = reserve;
    if let Some(position) = staking.positions.get_mut(&token_id) {
        position.accumulator_snapshot[resource.index()] = collection.snapshot;
    }
}

/// Pay out one resource's accrued profit for `token_id` to `to`.
pub fn handler<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    token_id: TokenId,
    resource: Resource,
) -> Result<Receipt<U256>> {
    let position = *staking.position(token_id)?;
    staking.require_owner(token_id, &ctx.caller)?;
    require_withdrawable(&position, ctx)?;

    let collection = reconcile(staking, &position, resource)?;
    let reserve = staking.pools[resource.index()]
        .reserve
        .checked_sub(collection.payout)
        .ok_or(StakingError::MathOverflow)?;

    commit(staking, token_id, resource, collection, reserve);
    info!("Collected {} {} from position {}", collection.payout, resource, token_id);

    let mut receipt = Receipt::new(collection.payout);
    receipt.push(resource, staking.address, to, collection.payout);
    Ok(receipt)
}

/// Pay out both resources' accrued profit for `token_id` to `to`.
pub fn collect_all<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    to: Address,
    token_id: TokenId,
) -> Result<Receipt<Payout>> {
    let position = *staking.position(token_id)?;
    staking.require_owner(token_id, &ctx.caller)?;
    require_withdrawable(&position, ctx)?;

    // Pools are independent, so both can be computed before either commits.
    let native = reconcile(staking, &position, Resource::Native)?;
    let token = reconcile(staking, &position, Resource::Token)?;
    let native_reserve = staking.pools[Resource::Native.index()]
        .reserve
        .checked_sub(native.payout)
        .ok_or(StakingError::MathOverflow)?;
    let token_reserve = staking.pools[Resource::Token.index()]
        .reserve
        .checked_sub(token.payout)
        .ok_or(StakingError::MathOverflow)?;

    commit(staking, token_id, Resource::Native, native, native_reserve);
    commit(staking, token_id, Resource::Token, token, token_reserve);
    info!(
        "Collected all profits from position {}: native={} token={}",
        token_id, native.payout, token.payout
    );

    let mut receipt = Receipt::new(Payout::new(native.payout, token.payout));
    receipt.push(Resource::Native, staking.address, to, native.payout);
    receipt.push(Resource::Token, staking.address, to, token.payout);
    Ok(receipt)
}

/// Same math as `handler`, on copies.
pub fn estimate<A: Authority>(
    staking: &PublicStaking<A>,
    token_id: TokenId,
    resource: Resource,
) -> Result<U256> {
    let position = staking.position(token_id)?;
    Ok(reconcile(staking, position, resource)?.payout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::*, context::Roles};
    use primitive_types::H160;

    fn addr(n: u64) -> Address {
        H160::from_low_u64_be(n)
    }

    fn ledger() -> PublicStaking {
        PublicStaking::new(addr(1), Roles::default())
    }

    #[test]
    fn single_holder_collects_full_deposit() {
        let mut staking = ledger();
        let shares = SCALE;
        let id = staking.mint(&Context::new(addr(2), 1), shares).unwrap().value;
        staking
            .deposit_native(&Context::new(addr(3), 1), MAGIC_VALUE, SCALE)
            .unwrap();

        let ctx = Context::new(addr(2), 2);
        assert_eq!(staking.estimate_collection(id, Resource::Native).unwrap(), SCALE);
        let receipt = staking.collect(&ctx, id, Resource::Native).unwrap();
        assert_eq!(receipt.value, SCALE);
        assert_eq!(receipt.transfers[0].to, addr(2));
        assert_eq!(staking.get_total_reserve(Resource::Native), U256::zero());
    }

    #[test]
    fn repeated_collect_pays_zero() {
        let mut staking = ledger();
        let a = staking.mint(&Context::new(addr(2), 1), U256::from(3u8)).unwrap().value;
        staking.mint(&Context::new(addr(4), 1), U256::from(5u8)).unwrap();
        staking
            .deposit_token(&Context::new(addr(3), 1), MAGIC_VALUE, U256::from(80u8))
            .unwrap();

        let ctx = Context::new(addr(2), 5);
        let first = staking.collect(&ctx, a, Resource::Token).unwrap();
        assert_eq!(first.value, U256::from(30u8));
        let second = staking.collect(&ctx, a, Resource::Token).unwrap();
        assert_eq!(second.value, U256::zero());
        assert!(second.transfers.is_empty());
    }

    #[test]
    fn collect_requires_owner_and_elapsed_withdraw_lock() {
        let mut staking = ledger();
        let id = staking.mint(&Context::new(addr(2), 10), U256::one()).unwrap().value;

        assert_eq!(
            staking.collect(&Context::new(addr(9), 11), id, Resource::Native).unwrap_err(),
            StakingError::CallerNotTokenOwner(addr(9))
        );
        assert_eq!(
            staking.collect(&Context::new(addr(2), 10), id, Resource::Native).unwrap_err(),
            StakingError::LockDurationWithdrawTimeNotReached { withdraw_free_after: 11, height: 10 }
        );
        assert_eq!(
            staking.collect(&Context::new(addr(2), 11), 42, Resource::Native).unwrap_err(),
            StakingError::InvalidTokenId(42)
        );
        assert!(staking.collect(&Context::new(addr(2), 11), id, Resource::Native).is_ok());
    }

    #[test]
    fn collect_all_pays_both_resources() {
        let mut staking = ledger();
        let id = staking.mint(&Context::new(addr(2), 1), U256::from(10u8)).unwrap().value;
        let funder = Context::new(addr(3), 1);
        staking.deposit_native(&funder, MAGIC_VALUE, U256::from(11u8)).unwrap();
        staking.deposit_token(&funder, MAGIC_VALUE, U256::from(12u8)).unwrap();

        let receipt = staking.collect_all_profits(&Context::new(addr(2), 2), id).unwrap();
        assert_eq!(receipt.value, Payout::new(U256::from(11u8), U256::from(12u8)));
        assert_eq!(receipt.transfers.len(), 2);
        // principal is still owed
        assert_eq!(staking.get_total_reserve(Resource::Token), U256::from(10u8));
    }
}
