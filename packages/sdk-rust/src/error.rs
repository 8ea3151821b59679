//! SDK error type.

use lockup::LockupError;
use primitive_types::U256;
use staking_nft::{Address, Resource, StakingError, TokenId};

/// All errors returned by the staking SDK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    // ── Engine ───────────────────────────────────────────────────────────────
    /// The staking ledger rejected the operation.
    #[error("Staking: {0}")]
    Staking(#[from] StakingError),

    /// The lockup rejected the operation.
    #[error("Lockup: {0}")]
    Lockup(#[from] LockupError),

    // ── Assets ───────────────────────────────────────────────────────────────
    /// A transfer in the operation's receipt could not be funded.
    #[error("Insufficient {resource} balance for {account:?}: have {balance}, need {required}")]
    InsufficientBalance {
        account: Address,
        resource: Resource,
        balance: U256,
        required: U256,
    },

    // ── Lookup ───────────────────────────────────────────────────────────────
    /// No lockup was configured on this client.
    #[error("No lockup configured; call with_lockup first")]
    LockupNotConfigured,

    #[error("Position {0} not found")]
    PositionNotFound(TokenId),

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Integer overflow in asset balance")]
    MathOverflow,
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
