use lockup::{LockupConfig, LockupError, LockupState};
use primitive_types::{H160, U256};
use staking_nft::{Address, Payout, Resource, Roles, StakingError};
use proptest::prelude::*;
use staking_sdk::{AssetLedger, Error, InMemoryAssets, StakingClient};

fn addr(n: u64) -> Address {
    H160::from_low_u64_be(n)
}

const LEDGER: u64 = 1;
const LOCKUP: u64 = 10;
const REWARD_POOL: u64 = 11;
const BONUS_POOL: u64 = 12;
const FACTORY: u64 = 13;
const FOUNDATION: u64 = 14;

fn alice() -> Address {
    addr(0xa)
}

fn bob() -> Address {
    addr(0xb)
}

fn funder() -> Address {
    addr(0xf)
}

fn units(n: u64) -> U256 {
    U256::from(n)
}

fn roles() -> Roles {
    Roles {
        owner: addr(2),
        governance: addr(3),
        factory: addr(FACTORY),
    }
}

fn funded(entries: &[(Address, Resource, u64)]) -> InMemoryAssets {
    let mut assets = InMemoryAssets::new();
    for (account, resource, amount) in entries {
        assets.credit(*account, *resource, units(*amount)).unwrap();
    }
    assets
}

fn balance(client: &StakingClient, who: Address, resource: Resource) -> U256 {
    client.assets().balance(&who, resource)
}

#[test]
fn unfunded_mint_leaves_no_trace() {
    let mut client = StakingClient::new(addr(LEDGER), roles(), funded(&[(alice(), Resource::Token, 5)]));
    let err = client.mint(alice(), units(6)).unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance { required, .. } if required == units(6)));
    assert_eq!(client.staking().get_latest_minted_position_id(), 0);
    assert_eq!(client.staking().get_total_shares(), U256::zero());
    assert_eq!(balance(&client, alice(), Resource::Token), units(5));
}

#[test]
fn bad_magic_is_rejected_without_moving_funds() {
    let mut client = StakingClient::new(
        addr(LEDGER),
        roles(),
        funded(&[(alice(), Resource::Token, 10), (funder(), Resource::Native, 100)]),
    );
    client.mint(alice(), units(10)).unwrap();
    assert_eq!(
        client.deposit_with_magic(funder(), Resource::Native, 7, units(100)),
        Err(Error::Staking(StakingError::BadMagic(7)))
    );
    assert_eq!(balance(&client, funder(), Resource::Native), units(100));
    assert_eq!(client.pool_info(Resource::Native).reserve, U256::zero());
}

#[test]
fn skim_recovers_stray_funds() {
    let mut client = StakingClient::new(
        addr(LEDGER),
        roles(),
        funded(&[(alice(), Resource::Token, 10), (addr(LEDGER), Resource::Native, 7)]),
    );
    client.mint(alice(), units(10)).unwrap();
    assert!(client.skim_excess(alice(), Resource::Native, alice()).is_err());

    let skimmed = client.skim_excess(addr(FACTORY), Resource::Native, addr(FOUNDATION)).unwrap();
    assert_eq!(skimmed.value, units(7));
    assert_eq!(balance(&client, addr(FOUNDATION), Resource::Native), units(7));
    assert_eq!(
        client.skim_excess(addr(FACTORY), Resource::Token, addr(FOUNDATION)).unwrap().value,
        U256::zero()
    );
}

#[test]
fn positions_report_pending_profits() {
    let mut client = StakingClient::new(
        addr(LEDGER),
        roles(),
        funded(&[
            (alice(), Resource::Token, 300),
            (bob(), Resource::Token, 100),
            (funder(), Resource::Native, 1000),
        ]),
    );
    let a = client.mint(alice(), units(300)).unwrap().value;
    client.mint(bob(), units(100)).unwrap();
    client.deposit(funder(), Resource::Native, units(1000)).unwrap();

    let info = client.position_info(a).unwrap();
    assert_eq!(info.owner, alice());
    assert_eq!(info.pending_native, units(750));
    assert!(!info.locked);
    assert_eq!(client.positions_of(&bob()).unwrap().len(), 1);
    assert_eq!(client.position_info(99), Err(Error::PositionNotFound(99)));
}

#[test]
fn lockup_round_trip_settles_every_balance() {
    let assets = funded(&[
        (alice(), Resource::Token, 600),
        (bob(), Resource::Token, 400),
        (addr(BONUS_POOL), Resource::Token, 1000),
        (funder(), Resource::Native, 3900),
        (funder(), Resource::Token, 1000),
    ]);
    let mut client = StakingClient::new(addr(LEDGER), roles(), assets)
        .with_lockup(LockupConfig {
            start_block: 100,
            lock_duration: 100,
            total_bonus_amount: units(1000),
            lockup: addr(LOCKUP),
            reward_pool: addr(REWARD_POOL),
            bonus_pool: addr(BONUS_POOL),
            factory: addr(FACTORY),
            foundation: addr(FOUNDATION),
        })
        .unwrap();

    client.set_height(10);
    let alice_token = client.mint(alice(), units(600)).unwrap().value;
    let bob_token = client.mint(bob(), units(400)).unwrap().value;
    client.set_height(11);
    client.create_bonus_staked_position(addr(FACTORY)).unwrap();
    client.set_height(12);
    client.lock_from_approval(alice(), alice_token).unwrap();
    client.lock_from_transfer(bob(), bob_token).unwrap();
    assert!(client.position_info(alice_token).unwrap().locked);
    assert_eq!(client.position_info(bob_token).unwrap().owner, bob());

    client.set_height(150);
    client.deposit(funder(), Resource::Native, units(2000)).unwrap();
    client.deposit(funder(), Resource::Token, units(1000)).unwrap();
    client.set_height(151);
    assert_eq!(client.collect_locked_profits(alice()).unwrap().value, Payout::new(units(480), units(240)));
    client.set_height(152);
    assert_eq!(
        client.unlock_early(bob(), units(100), false).unwrap().value,
        Payout::new(units(320), units(260))
    );
    client.set_height(160);
    client.deposit(funder(), Resource::Native, units(1900)).unwrap();
    assert_eq!(
        client.estimate_final_bonus_with_profits(&alice()).unwrap(),
        (units(600), Payout::new(units(1453), units(966)))
    );

    client.set_height(200);
    assert_eq!(client.lockup_info().unwrap().state, LockupState::PostLock);
    assert_eq!(
        client.unlock(alice(), alice(), false),
        Err(Error::Lockup(LockupError::PayoutUnsafe))
    );
    assert!(client.aggregate_profits(funder(), 10).unwrap().value);
    assert_eq!(
        client.estimate_locked_profits(&alice()).unwrap(),
        Payout::new(units(1933), units(966))
    );

    client.unlock(alice(), alice(), false).unwrap();
    client.unlock(bob(), bob(), true).unwrap();

    let info = client.lockup_info().unwrap();
    assert_eq!(info.locked_positions, 0);
    assert_eq!(info.reward_pool_native, U256::zero());

    for (who, native, token) in [
        (alice(), 2413u64, 1806u64),
        (bob(), 1287, 260),
        (addr(FOUNDATION), 200, 0),
        (addr(FACTORY), 0, 150),
        (addr(LEDGER), 0, 784),
        (addr(LOCKUP), 0, 0),
        (addr(REWARD_POOL), 0, 0),
        (addr(BONUS_POOL), 0, 0),
    ] {
        assert_eq!(balance(&client, who, Resource::Native), units(native), "{who:?} native");
        assert_eq!(balance(&client, who, Resource::Token), units(token), "{who:?} token");
    }
    assert_eq!(client.positions_of(&bob()).unwrap()[0].shares, units(784));
}

proptest! {
    #[test]
    fn rejected_operations_leave_no_trace(
        funds in 1u64..10_000,
        asks in prop::collection::vec((any::<bool>(), 0u64..20_000), 1..24),
    ) {
        let mut client = StakingClient::new(
            addr(LEDGER),
            roles(),
            funded(&[(alice(), Resource::Token, funds), (funder(), Resource::Native, funds)]),
        );
        for (mint, amount) in asks {
            let assets = client.assets().clone();
            let pools = Resource::ALL.map(|r| client.pool_info(r));
            let latest = client.staking().get_latest_minted_position_id();

            let outcome = if mint {
                client.mint(alice(), units(amount)).map(|_| ())
            } else {
                client.deposit(funder(), Resource::Native, units(amount)).map(|_| ())
            };
            if outcome.is_err() {
                prop_assert_eq!(client.assets(), &assets);
                prop_assert_eq!(Resource::ALL.map(|r| client.pool_info(r)), pools);
                prop_assert_eq!(client.staking().get_latest_minted_position_id(), latest);
            } else {
                prop_assert!(amount > 0 || !mint);
            }
        }
    }
}
