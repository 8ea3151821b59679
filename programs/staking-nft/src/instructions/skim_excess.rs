use primitive_types::U256;
use tracing::info;

use crate::{
    context::{Authority, Context},
    error::{Result, StakingError},
    settlement::Receipt,
    state::{Address, Resource},
    PublicStaking,
};

/// Send the part of `observed_balance` that is not owed to anyone to `to`.
///
/// Value sent to the ledger outside `deposit` never enters the accumulator;
/// this is the only way to get it back out.
pub fn handler<A: Authority>(
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    resource: Resource,
    to: Address,
    observed_balance: U256,
) -> Result<Receipt<U256>> {
    if !staking.authority.is_privileged(&ctx.caller) {
        return Err(StakingError::OnlyFactory);
    }
    let excess = staking.pools[resource.index()].excess(observed_balance)?;
    info!("Skimmed {} excess {} to {:?}", excess, resource, to);

    let mut receipt = Receipt::new(excess);
    receipt.push(resource, staking.address, to, excess);
    Ok(receipt)
}
