use primitive_types::U256;

/// Fixed-point scale applied to every deposit (10^18)
pub const SCALE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Accumulator wraps at 2^168
pub const ACCUMULATOR_MODULUS: U256 = U256([0, 0, 1 << 40, 0]);

/// Slush must stay strictly below half the modulus (2^167)
pub const SLUSH_MAX: U256 = U256([0, 0, 1 << 39, 0]);

/// Total shares must stay strictly below 2^224
pub const MAX_SHARES: U256 = U256([0, 0, 0, 1 << 32]);

/// 20% of every lockup profit is reserved for the reward pool (SCALE / 5)
pub const FRACTION_RESERVED: U256 = U256([200_000_000_000_000_000, 0, 0, 0]);

/// Sentinel every deposit must carry
pub const MAGIC_VALUE: u8 = 42;

/// Longest lock a position may be minted with, in blocks
pub const MAX_MINT_LOCK: u64 = 1_051_200;

/// Longest lock governance (or an owner) may apply in one call, in blocks
pub const MAX_GOVERNANCE_LOCK: u64 = 172_800;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_their_definitions() {
        assert_eq!(SCALE, U256::exp10(18));
        assert_eq!(ACCUMULATOR_MODULUS, U256::from(2u8).pow(U256::from(168u16)));
        assert_eq!(SLUSH_MAX, U256::from(2u8).pow(U256::from(167u16)));
        assert_eq!(MAX_SHARES, U256::from(2u8).pow(U256::from(224u16)));
        assert_eq!(FRACTION_RESERVED, SCALE / 5);
    }
}
