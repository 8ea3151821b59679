use primitive_types::{H160, U256};
use proptest::prelude::*;
use staking_nft::{
    accumulator_math, Accumulator, Address, Context, PublicStaking, Resource, Roles, TokenId,
    ACCUMULATOR_MODULUS, MAGIC_VALUE, SCALE,
};

fn addr(n: u64) -> Address {
    H160::from_low_u64_be(n)
}

fn resource(native: bool) -> Resource {
    if native {
        Resource::Native
    } else {
        Resource::Token
    }
}

#[derive(Debug, Clone)]
enum Op {
    Mint { who: u64, shares: u64 },
    Deposit { native: bool, amount: u64 },
    Collect { slot: usize, native: bool },
    Burn { slot: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..5, 1u64..1_000_000_000).prop_map(|(who, shares)| Op::Mint { who, shares }),
        (any::<bool>(), 0u64..1_000_000_000_000).prop_map(|(native, amount)| Op::Deposit { native, amount }),
        (0usize..8, any::<bool>()).prop_map(|(slot, native)| Op::Collect { slot, native }),
        (0usize..8).prop_map(|slot| Op::Burn { slot }),
    ]
}

/// Scaled value the pool still owes: slush plus every position's unclaimed accrual.
fn owed_scaled(staking: &PublicStaking, resource: Resource) -> U256 {
    let state = staking.get_accumulator(resource);
    staking.position_ids().fold(state.slush, |sum, id| {
        let position = staking.get_position(id).unwrap();
        let delta = accumulator_math::accumulator_delta(state.accumulator, position.snapshot(resource));
        sum + delta * position.shares
    })
}

fn nth_position(staking: &PublicStaking, slot: usize) -> Option<TokenId> {
    let ids: Vec<_> = staking.position_ids().collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[slot % ids.len()])
    }
}

proptest! {
    #[test]
    fn value_is_conserved(ops in prop::collection::vec(op(), 1..40)) {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let mut deposited = [U256::zero(); 2];
        let mut paid = [U256::zero(); 2];
        let mut height = 1u64;

        for op in ops {
            height += 2;
            match op {
                Op::Mint { who, shares } => {
                    staking.mint(&Context::new(addr(who), height), U256::from(shares)).unwrap();
                }
                Op::Deposit { native, amount } => {
                    let r = resource(native);
                    staking.deposit(&Context::new(addr(99), height), r, MAGIC_VALUE, U256::from(amount)).unwrap();
                    deposited[r.index()] += U256::from(amount);
                }
                Op::Collect { slot, native } => {
                    if let Some(id) = nth_position(&staking, slot) {
                        let owner = staking.owner_of(id).unwrap();
                        let r = resource(native);
                        let out = staking.collect(&Context::new(owner, height), id, r).unwrap();
                        paid[r.index()] += out.value;
                    }
                }
                Op::Burn { slot } => {
                    if let Some(id) = nth_position(&staking, slot) {
                        let owner = staking.owner_of(id).unwrap();
                        let shares = staking.get_position(id).unwrap().shares;
                        let out = staking.burn(&Context::new(owner, height), id).unwrap();
                        paid[0] += out.value.native;
                        paid[1] += out.value.token - shares;
                    }
                }
            }

            for r in Resource::ALL {
                let i = r.index();
                let principal = if r == Resource::Token { staking.get_total_shares() } else { U256::zero() };
                prop_assert!(paid[i] <= deposited[i]);
                prop_assert_eq!(staking.get_total_reserve(r), deposited[i] - paid[i] + principal);
                prop_assert_eq!(owed_scaled(&staking, r), (deposited[i] - paid[i]) * SCALE);
            }
        }
    }

    #[test]
    fn single_holder_collects_every_unit(
        shares in 1u64..u64::MAX,
        deposits in prop::collection::vec(1u64..u64::MAX, 1..10),
    ) {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let holder = addr(2);
        let id = staking.mint(&Context::new(holder, 1), U256::from(shares)).unwrap().value;

        let mut expected = U256::zero();
        let mut collected = U256::zero();
        for (i, amount) in deposits.into_iter().enumerate() {
            let height = 2 + i as u64;
            staking.deposit_native(&Context::new(addr(3), height), MAGIC_VALUE, U256::from(amount)).unwrap();
            expected += U256::from(amount);
            collected += staking.collect(&Context::new(holder, height), id, Resource::Native).unwrap().value;
        }
        prop_assert_eq!(collected, expected);
        prop_assert_eq!(staking.get_accumulator(Resource::Native).slush, U256::zero());
    }

    #[test]
    fn payouts_are_proportional_within_one_unit(
        s1 in 1u64..1_000_000_000_000,
        s2 in 1u64..1_000_000_000_000,
        amount in 0u64..u64::MAX,
    ) {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let a = staking.mint(&Context::new(addr(2), 1), U256::from(s1)).unwrap().value;
        let b = staking.mint(&Context::new(addr(3), 1), U256::from(s2)).unwrap().value;
        staking.deposit_token(&Context::new(addr(4), 1), MAGIC_VALUE, U256::from(amount)).unwrap();

        let total = U256::from(s1) + U256::from(s2);
        let p1 = staking.estimate_collection(a, Resource::Token).unwrap();
        let p2 = staking.estimate_collection(b, Resource::Token).unwrap();
        for (payout, shares) in [(p1, s1), (p2, s2)] {
            let ideal = U256::from(amount) * U256::from(shares) / total;
            prop_assert!(payout <= ideal);
            prop_assert!(payout + 1 >= ideal);
        }

        let collected = staking.collect(&Context::new(addr(2), 2), a, Resource::Token).unwrap().value;
        prop_assert_eq!(collected, p1);
    }

    #[test]
    fn second_collect_in_same_block_pays_zero(
        s1 in 1u64..1_000_000,
        s2 in 1u64..1_000_000,
        amount in 10_000_000u64..1_000_000_000_000_000,
    ) {
        let mut staking = PublicStaking::new(addr(1), Roles::default());
        let a = staking.mint(&Context::new(addr(2), 1), U256::from(s1)).unwrap().value;
        staking.mint(&Context::new(addr(3), 1), U256::from(s2)).unwrap();
        staking.deposit_native(&Context::new(addr(4), 1), MAGIC_VALUE, U256::from(amount)).unwrap();

        let ctx = Context::new(addr(2), 5);
        let first = staking.collect(&ctx, a, Resource::Native).unwrap().value;
        let second = staking.collect(&ctx, a, Resource::Native).unwrap().value;
        prop_assert!(!first.is_zero());
        prop_assert_eq!(second, U256::zero());
    }

    #[test]
    fn wrapped_delta_pays_like_unwrapped(
        back in 1u128..u128::MAX,
        advance in 0u128..u128::MAX,
        shares in 1u64..u64::MAX,
    ) {
        let back = U256::from(back);
        let advance = U256::from(advance);
        let snapshot = ACCUMULATOR_MODULUS - back;
        let wrapped = Accumulator {
            accumulator: (snapshot + advance) % ACCUMULATOR_MODULUS,
            slush: U256::zero(),
        };
        let plain = Accumulator { accumulator: advance, slush: U256::zero() };
        let total = U256::from(shares) * 2;

        let a = accumulator_math::collect(total, wrapped, U256::from(shares), snapshot).unwrap();
        let b = accumulator_math::collect(total, plain, U256::from(shares), U256::zero()).unwrap();
        prop_assert_eq!(a.payout, b.payout);
        prop_assert_eq!(a.state.slush, b.state.slush);
    }
}
