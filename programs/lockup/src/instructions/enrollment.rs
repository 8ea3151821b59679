use staking_nft::{Address, Authority, Context, PublicStaking, TokenId};
use tracing::info;

use crate::{
    error::{LockupError, Result},
    state::LockupState,
    Lockup,
};

fn require_enrollable(lockup: &Lockup, owner: &Address, token_id: TokenId) -> Result<()> {
    if lockup.tokens.contains_key(owner) {
        return Err(LockupError::AddressAlreadyLockedUp(*owner));
    }
    if lockup.owners.contains_key(&token_id) {
        return Err(LockupError::TokenIDAlreadyClaimed(token_id));
    }
    Ok(())
}

/// Record `token_id`, now held by the lockup, as `owner`'s locked position.
fn lock<A: Authority>(
    lockup: &mut Lockup,
    staking: &PublicStaking<A>,
    owner: Address,
    token_id: TokenId,
) -> Result<()> {
    let shares = staking.get_position(token_id)?.shares;
    let total = lockup
        .total_shares_locked
        .checked_add(shares)
        .ok_or(LockupError::MathOverflow)?;
    let original = lockup
        .original_shares_locked
        .checked_add(shares)
        .ok_or(LockupError::MathOverflow)?;

    lockup.insert_position(owner, token_id);
    lockup.total_shares_locked = total;
    lockup.original_shares_locked = original;
    info!("Position {} locked for {:?} ({} shares)", token_id, owner, shares);
    Ok(())
}

/// The caller approved the lockup on `token_id`; pull it in and lock it.
pub fn lock_from_approval<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    token_id: TokenId,
) -> Result<()> {
    lockup.require_state(ctx.height, LockupState::PreLock)?;
    require_enrollable(lockup, &ctx.caller, token_id)?;

    let address = lockup.address();
    staking.transfer_from(&ctx.with_caller(address), ctx.caller, address, token_id)?;
    lock(lockup, staking, ctx.caller, token_id)
}

/// The ledger notifies the lockup that `token_owner` transferred `token_id` to it.
pub fn lock_from_transfer<A: Authority>(
    lockup: &mut Lockup,
    staking: &mut PublicStaking<A>,
    ctx: &Context,
    token_id: TokenId,
    token_owner: Address,
) -> Result<()> {
    if ctx.caller != staking.address() {
        return Err(LockupError::OnlyStaking(ctx.caller));
    }
    lockup.require_state(ctx.height, LockupState::PreLock)?;
    if staking.owner_of(token_id)? != lockup.address() {
        return Err(LockupError::ContractDoesNotOwnTokenID(token_id));
    }
    require_enrollable(lockup, &token_owner, token_id)?;
    lock(lockup, staking, token_owner, token_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LockupConfig;
    use primitive_types::U256;
    use staking_nft::{Roles, StakingError};

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn setup() -> (Lockup, PublicStaking) {
        let lockup = Lockup::new(LockupConfig {
            start_block: 100,
            lock_duration: 100,
            total_bonus_amount: U256::zero(),
            lockup: addr(10),
            reward_pool: addr(11),
            bonus_pool: addr(12),
            factory: addr(13),
            foundation: addr(14),
        })
        .unwrap();
        (lockup, PublicStaking::new(addr(1), Roles::default()))
    }

    #[test]
    fn approval_enrolls_once_per_owner_and_token() {
        let (mut lockup, mut staking) = setup();
        let alice = Context::new(addr(20), 10);
        let first = staking.mint(&alice, U256::from(5u8)).unwrap().value;
        let second = staking.mint(&alice, U256::from(7u8)).unwrap().value;

        staking.approve(&alice, addr(10), first).unwrap();
        lockup.lock_from_approval(&mut staking, &alice, first).unwrap();
        assert_eq!(staking.owner_of(first).unwrap(), addr(10));
        assert_eq!(lockup.get_total_current_shares_locked(), U256::from(5u8));
        assert_eq!(lockup.get_original_locked_shares(), U256::from(5u8));
        assert_eq!(lockup.token_of(&addr(20)), Some(first));

        staking.approve(&alice, addr(10), second).unwrap();
        assert_eq!(
            lockup.lock_from_approval(&mut staking, &alice, second),
            Err(LockupError::AddressAlreadyLockedUp(addr(20)))
        );
        assert_eq!(staking.owner_of(second).unwrap(), addr(20));
    }

    #[test]
    fn approval_requires_prelock_and_approval() {
        let (mut lockup, mut staking) = setup();
        let alice = Context::new(addr(20), 10);
        let id = staking.mint(&alice, U256::from(5u8)).unwrap().value;
        assert_eq!(
            lockup.lock_from_approval(&mut staking, &alice, id),
            Err(LockupError::Staking(StakingError::Unauthorized(addr(10))))
        );

        staking.approve(&alice, addr(10), id).unwrap();
        let late = Context::new(addr(20), 100);
        assert_eq!(
            lockup.lock_from_approval(&mut staking, &late, id),
            Err(LockupError::PreLockStateRequired)
        );
    }

    #[test]
    fn transfer_notification_checks_custody() {
        let (mut lockup, mut staking) = setup();
        let bob = Context::new(addr(21), 10);
        let ledger = bob.with_caller(addr(1));
        let id = staking.mint(&bob, U256::from(4u8)).unwrap().value;

        assert_eq!(
            lockup.lock_from_transfer(&mut staking, &ledger, id, addr(21)),
            Err(LockupError::ContractDoesNotOwnTokenID(id))
        );
        staking.transfer_from(&bob, addr(21), addr(10), id).unwrap();
        assert_eq!(
            lockup.lock_from_transfer(&mut staking, &bob, id, addr(21)),
            Err(LockupError::OnlyStaking(addr(21)))
        );
        lockup.lock_from_transfer(&mut staking, &ledger, id, addr(21)).unwrap();
        assert_eq!(lockup.owner_of(id), Some(addr(21)));
        assert_eq!(
            lockup.lock_from_transfer(&mut staking, &ledger, id, addr(22)),
            Err(LockupError::TokenIDAlreadyClaimed(id))
        );
    }
}
