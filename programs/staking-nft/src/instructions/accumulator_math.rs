use primitive_types::{U256, U512};
use tracing::debug;

use crate::{
    constants::*,
    error::{Result, StakingError},
    state::Accumulator,
};

/// Result of reconciling one position against one resource accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    /// Accumulator state after the skim and the returned remainder.
    pub state: Accumulator,
    /// New snapshot for the position (the post-skim accumulator).
    pub snapshot: U256,
    /// Amount owed to the position, in raw resource units.
    pub payout: U256,
}

/// Fold a raw deposit into slush: `slush' = slush + delta * SCALE`.
///
/// Fails with `SlushTooLarge` when the new slush would reach 2^167.
pub fn deposit(delta: U256, state: Accumulator) -> Result<Accumulator> {
    let scaled = delta.checked_mul(SCALE).ok_or(StakingError::MathOverflow)?;
    let slush = state
        .slush
        .checked_add(scaled)
        .ok_or(StakingError::MathOverflow)?;
    if slush >= SLUSH_MAX {
        return Err(StakingError::SlushTooLarge(slush));
    }
    Ok(Accumulator { slush, ..state })
}

/// Fold as much slush as divides evenly across `shares` into the accumulator.
///
/// No-op for zero shares. The remainder (< `shares`) stays as slush.
pub fn skim(shares: U256, state: Accumulator) -> Accumulator {
    if shares.is_zero() {
        return state;
    }
    let delta = state.slush / shares;
    if delta.is_zero() {
        return state;
    }
    // accumulator < 2^168 and delta <= slush < 2^168, so the sum fits
    let accumulator = (state.accumulator + delta) % ACCUMULATOR_MODULUS;
    let slush = state.slush - delta * shares;
    debug!(%delta, %accumulator, %slush, "skim");
    Accumulator { accumulator, slush }
}

/// Distance travelled by the accumulator since `snapshot`, modulo 2^168.
pub fn accumulator_delta(accumulator: U256, snapshot: U256) -> U256 {
    if snapshot > accumulator {
        ACCUMULATOR_MODULUS - snapshot + accumulator
    } else {
        accumulator - snapshot
    }
}

/// Reconcile a position holding `position_shares` of `total_shares`.
///
/// * skims `state` at `total_shares`
/// * pays `(accumulator - snapshot) * position_shares / SCALE`
/// * when the position holds every share, the whole residual slush is paid too
/// * the sub-unit remainder goes back to slush
pub fn collect(
    total_shares: U256,
    state: Accumulator,
    position_shares: U256,
    snapshot: U256,
) -> Result<Collection> {
    let mut state = skim(total_shares, state);

    let delta = accumulator_delta(state.accumulator, snapshot);
    let mut raw: U512 = delta.full_mul(position_shares);

    // ── Single holder: nobody else can ever claim the slush ────────────────
    if position_shares == total_shares {
        raw = raw
            .checked_add(U512::from(state.slush))
            .ok_or(StakingError::MathOverflow)?;
        state.slush = U256::zero();
    }

    let scale = U512::from(SCALE);
    let payout = raw / scale;
    let remainder = raw % scale;

    // remainder < SCALE always narrows
    let remainder = U256::try_from(remainder).map_err(|_| StakingError::MathOverflow)?;
    state.slush = state
        .slush
        .checked_add(remainder)
        .ok_or(StakingError::MathOverflow)?;
    let payout = U256::try_from(payout).map_err(|_| StakingError::MathOverflow)?;

    Ok(Collection {
        state,
        snapshot: state.accumulator,
        payout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(accumulator: u128, slush: u128) -> Accumulator {
        Accumulator {
            accumulator: U256::from(accumulator),
            slush: U256::from(slush),
        }
    }

    #[test]
    fn deposit_scales_into_slush() {
        let state = deposit(U256::from(3u8), acc(5, 1)).unwrap();
        assert_eq!(state.accumulator, U256::from(5u8));
        assert_eq!(state.slush, U256::from(3u8) * SCALE + 1);
    }

    #[test]
    fn deposit_rejects_slush_at_half_modulus() {
        let just_under = Accumulator {
            accumulator: U256::zero(),
            slush: SLUSH_MAX - SCALE,
        };
        assert_eq!(
            deposit(U256::one(), just_under).unwrap_err(),
            StakingError::SlushTooLarge(SLUSH_MAX)
        );
        assert!(deposit(U256::zero(), just_under).is_ok());
    }

    #[test]
    fn skim_with_no_shares_is_noop() {
        let state = acc(10, 999);
        assert_eq!(skim(U256::zero(), state), state);
    }

    #[test]
    fn skim_keeps_remainder_below_shares() {
        let state = skim(U256::from(7u8), acc(0, 100));
        assert_eq!(state.accumulator, U256::from(14u8));
        assert_eq!(state.slush, U256::from(2u8));
    }

    #[test]
    fn skim_wraps_at_modulus() {
        let state = Accumulator {
            accumulator: ACCUMULATOR_MODULUS - 5,
            slush: U256::from(20u8),
        };
        let state = skim(U256::from(2u8), state);
        assert_eq!(state.accumulator, U256::from(5u8));
        assert_eq!(state.slush, U256::zero());
    }

    #[test]
    fn delta_is_zero_for_equal_snapshot() {
        assert_eq!(accumulator_delta(U256::zero(), U256::zero()), U256::zero());
        let x = ACCUMULATOR_MODULUS - 1;
        assert_eq!(accumulator_delta(x, x), U256::zero());
    }

    #[test]
    fn delta_across_boundary_matches_unwrapped_distance() {
        let step = U256::exp10(30);
        let snapshot = ACCUMULATOR_MODULUS - step;
        // accumulator advanced by 2 * 10^30 and wrapped to 10^30
        let wrapped = (snapshot + step * 2) % ACCUMULATOR_MODULUS;
        assert_eq!(wrapped, step);
        assert_eq!(accumulator_delta(wrapped, snapshot), step * 2);
    }

    #[test]
    fn single_holder_collects_every_unit() {
        let state = deposit(U256::from(1000u16), Accumulator::default()).unwrap();
        let out = collect(U256::from(3u8), state, U256::from(3u8), U256::zero()).unwrap();
        assert_eq!(out.payout, U256::from(1000u16));
        assert_eq!(out.state.slush, U256::zero());
        assert_eq!(out.snapshot, out.state.accumulator);
    }

    #[test]
    fn partial_holder_leaves_remainder_in_slush() {
        let state = deposit(U256::from(1000u16), Accumulator::default()).unwrap();
        let first = collect(U256::from(30u8), state, U256::from(10u8), U256::zero()).unwrap();
        assert_eq!(first.payout, U256::from(333u16));

        // paid + owed to the other 20 shares + slush == everything deposited
        let total_scaled = U256::from(1000u16) * SCALE;
        let claimed = first.payout * SCALE;
        let outstanding = first.state.accumulator * 20;
        assert_eq!(first.state.slush + claimed + outstanding, total_scaled);
    }

    #[test]
    fn collect_across_boundary_pays_like_no_wrap() {
        let shares = U256::from(4u8);
        let step = U256::exp10(30);

        let wrapped_state = Accumulator {
            accumulator: step,
            slush: U256::zero(),
        };
        let wrapped = collect(shares * 2, wrapped_state, shares, ACCUMULATOR_MODULUS - step).unwrap();

        let plain_state = Accumulator {
            accumulator: step * 2,
            slush: U256::zero(),
        };
        let plain = collect(shares * 2, plain_state, shares, U256::zero()).unwrap();

        assert_eq!(wrapped.payout, plain.payout);
        assert_eq!(wrapped.payout, step * 2 * shares / SCALE);
        assert_eq!(wrapped.snapshot, step);
    }

    #[test]
    fn second_collect_pays_nothing() {
        let state = deposit(U256::from(50u8), Accumulator::default()).unwrap();
        let first = collect(U256::from(10u8), state, U256::from(4u8), U256::zero()).unwrap();
        assert!(!first.payout.is_zero());
        let second = collect(U256::from(10u8), first.state, U256::from(4u8), first.snapshot).unwrap();
        assert_eq!(second.payout, U256::zero());
    }
}
