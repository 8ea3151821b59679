use primitive_types::U256;
use staking_nft::{Address, StakingError, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockupError {
    // ── Lock phase ───────────────────────────────────────────────────────────
    #[error("Only allowed before the lockup starts")]
    PreLockStateRequired,

    #[error("Only allowed once the lockup has ended")]
    PostLockStateRequired,

    #[error("Not allowed once the lockup has ended")]
    PostLockStateNotAllowed,

    #[error("Not allowed before the lockup starts")]
    PreLockStateNotAllowed,

    #[error("Lock duration must be greater than zero")]
    InvalidLockupPeriod,

    // ── Enrollment ───────────────────────────────────────────────────────────
    #[error("{0:?} already has a locked position")]
    AddressAlreadyLockedUp(Address),

    #[error("Position {0} is already locked")]
    TokenIDAlreadyClaimed(TokenId),

    #[error("Lockup does not own position {0}")]
    ContractDoesNotOwnTokenID(TokenId),

    #[error("Transfer notifications must come from the staking ledger, not {0:?}")]
    OnlyStaking(Address),

    #[error("{0:?} has no locked position")]
    UserHasNoPosition(Address),

    #[error("Position {0} is not locked here")]
    TokenIdNotLocked(TokenId),

    // ── Exit ─────────────────────────────────────────────────────────────────
    #[error("Cannot exit {exit} from a position of {shares} shares")]
    InsufficientBalanceForEarlyExit { exit: U256, shares: U256 },

    #[error("Profits were already aggregated")]
    PayoutSafe,

    #[error("Profits have not been aggregated yet")]
    PayoutUnsafe,

    // ── Reward / bonus pool ──────────────────────────────────────────────────
    #[error("Bonus position has not been created")]
    BonusTokenNotCreated,

    #[error("Bonus position {0} already exists")]
    BonusTokenAlreadyCreated(TokenId),

    #[error("Bonus pool holds {balance} tokens; {required} needed")]
    NotEnoughTokensToStake { balance: U256, required: U256 },

    #[error("Invalid original shares value: final {final_shares}, original {original_shares}")]
    InvalidOriginalSharesValue { final_shares: U256, original_shares: U256 },

    #[error("Invalid total shares value: user {user_shares}, total {total_shares}")]
    InvalidTotalSharesValue { user_shares: U256, total_shares: U256 },

    #[error("Only the factory may call this")]
    OnlyFactory,

    #[error("Math overflow")]
    MathOverflow,

    #[error(transparent)]
    Staking(#[from] StakingError),
}

pub type Result<T> = std::result::Result<T, LockupError>;
