use primitive_types::U256;

use crate::state::{Address, TokenId};

/// Every way a staking operation can abort. No variant leaves state behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    // ── Input validation ─────────────────────────────────────────────────────
    #[error("Mint amount must be greater than zero")]
    MintAmountZero,

    #[error("Mint would push total shares to or past 2^224")]
    MintAmountExceedsMaximumSupply,

    #[error("Position {0} does not exist")]
    InvalidTokenId(TokenId),

    #[error("Deposit carried magic {0}; expected 42")]
    BadMagic(u8),

    // ── Authorization ────────────────────────────────────────────────────────
    #[error("{0:?} does not own the position")]
    CallerNotTokenOwner(Address),

    #[error("Only governance may call this")]
    OnlyGovernance,

    #[error("Only the factory may call this")]
    OnlyFactory,

    #[error("{0:?} is neither owner nor approved for the position")]
    Unauthorized(Address),

    // ── Time locks ───────────────────────────────────────────────────────────
    #[error("Position is locked until block {free_after} (now {height})")]
    FreeAfterTimeNotReached { free_after: u64, height: u64 },

    #[error("Withdrawals are locked until block {withdraw_free_after} (now {height})")]
    LockDurationWithdrawTimeNotReached { withdraw_free_after: u64, height: u64 },

    // ── Bounds ───────────────────────────────────────────────────────────────
    #[error("Lock duration {0} exceeds the mint lock maximum")]
    LockDurationGreaterThanMintLock(u64),

    #[error("Lock duration {0} exceeds the governance lock maximum")]
    LockDurationGreaterThanGovernanceLock(u64),

    #[error("Slush {0} would reach 2^167")]
    SlushTooLarge(U256),

    #[error("Balance {balance} is below reserve {reserve}")]
    BalanceLessThanReserve { balance: U256, reserve: U256 },

    // ── Circuit breaker ──────────────────────────────────────────────────────
    #[error("Circuit breaker is open")]
    CircuitBreakerOpened,

    #[error("Circuit breaker is closed")]
    CircuitBreakerClosed,

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Math overflow")]
    MathOverflow,
}

pub type Result<T> = std::result::Result<T, StakingError>;
