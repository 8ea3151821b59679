use primitive_types::U256;
use tracing::info;

use crate::{
    constants::MAGIC_VALUE,
    context::{Authority, Context},
    error::{Result, StakingError},
    settlement::Receipt,
    state::Resource,
    PublicStaking,
};

/// Distribute `amount` of `resource` across current holders.
///
/// The value sits in slush until the next skim; the caller transfers it in.
pub fn handler<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    resource: Resource,
    magic: u8,
    amount: U256,
) -> Result<Receipt<()>> {
    if magic != MAGIC_VALUE {
        return Err(StakingError::BadMagic(magic));
    }
    staking.require_circuit_breaker_closed()?;

    staking.pools[resource.index()].deposit(amount)?;
    info!("Deposit: {} {} from {:?}", amount, resource, ctx.caller);

    let mut receipt = Receipt::new(());
    receipt.push(resource, ctx.caller, staking.address, amount);
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::*, context::Roles, state::Address};
    use primitive_types::H160;

    fn depositor() -> Address {
        H160::from_low_u64_be(7)
    }

    #[test]
    fn bad_magic_changes_nothing() {
        let mut staking = PublicStaking::new(H160::from_low_u64_be(1), Roles::default());
        let ctx = Context::new(depositor(), 1);
        staking.mint(&ctx, U256::from(10u8)).unwrap();
        let before = staking.get_pool(Resource::Native);

        let err = staking.deposit_native(&ctx, 41, U256::from(100u8)).unwrap_err();
        assert_eq!(err, StakingError::BadMagic(41));
        assert_eq!(staking.get_pool(Resource::Native), before);
    }

    #[test]
    fn deposit_transfers_in_and_grows_reserve() {
        let mut staking = PublicStaking::new(H160::from_low_u64_be(1), Roles::default());
        let ctx = Context::new(depositor(), 1);
        let receipt = staking.deposit_token(&ctx, MAGIC_VALUE, U256::from(9u8)).unwrap();

        assert_eq!(receipt.transfers[0].resource, Resource::Token);
        assert_eq!(receipt.transfers[0].to, staking.address());
        assert_eq!(staking.get_total_reserve(Resource::Token), U256::from(9u8));
        assert_eq!(staking.get_accumulator(Resource::Token).slush, U256::from(9u8) * SCALE);
    }

    #[test]
    fn oversized_deposit_is_rejected() {
        let mut staking = PublicStaking::new(H160::from_low_u64_be(1), Roles::default());
        let ctx = Context::new(depositor(), 1);
        let err = staking
            .deposit_native(&ctx, MAGIC_VALUE, SLUSH_MAX / SCALE + 1)
            .unwrap_err();
        assert!(matches!(err, StakingError::SlushTooLarge(_)));
        assert_eq!(staking.get_total_reserve(Resource::Native), U256::zero());
    }
}
