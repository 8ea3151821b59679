use primitive_types::{U256, U512};
use staking_nft::{Payout, FRACTION_RESERVED, SCALE};

use crate::error::{LockupError, Result};

/// `a * b / denominator` with a 512-bit intermediate.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(LockupError::MathOverflow);
    }
    U256::try_from(a.full_mul(b) / U512::from(denominator)).map_err(|_| LockupError::MathOverflow)
}

/// Reward-pool cut of a profit: `amount * FRACTION_RESERVED / SCALE` (20%).
pub fn reserved(amount: U256) -> Result<U256> {
    mul_div(amount, FRACTION_RESERVED, SCALE)
}

/// Split `profit` into (reward pool part, user part).
pub fn split(profit: Payout) -> Result<(Payout, Payout)> {
    let pool = Payout::new(reserved(profit.native)?, reserved(profit.token)?);
    let user = profit.checked_sub(pool).ok_or(LockupError::MathOverflow)?;
    Ok((pool, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reserves_a_fifth_rounding_down() {
        let (pool, user) = split(Payout::new(U256::from(600u16), U256::from(9u8))).unwrap();
        assert_eq!(pool, Payout::new(U256::from(120u8), U256::from(1u8)));
        assert_eq!(user, Payout::new(U256::from(480u16), U256::from(8u8)));
    }

    #[test]
    fn mul_div_survives_wide_products() {
        let big = U256::MAX / 2;
        assert_eq!(mul_div(big, U256::from(4u8), U256::from(4u8)).unwrap(), big);
        assert_eq!(mul_div(U256::one(), U256::one(), U256::zero()), Err(LockupError::MathOverflow));
    }
}
