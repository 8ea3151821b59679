//! Serializable views returned by [`crate::StakingClient`] read operations.

use lockup::LockupState;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use staking_nft::{Address, Resource, TokenId};

/// A staking position with its pending profits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub token_id: TokenId,
    pub owner: Address,
    pub shares: U256,
    pub free_after: u64,
    pub withdraw_free_after: u64,
    pub pending_native: U256,
    pub pending_token: U256,
    /// Held by the lockup on the owner's behalf
    pub locked: bool,
}

/// One resource pool of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub resource: Resource,
    pub reserve: U256,
    pub accumulator: U256,
    pub slush: U256,
    pub total_shares: U256,
}

/// Lockup progress and reward pool balances at a given height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupInfo {
    pub state: LockupState,
    pub start_block: u64,
    pub end_block: u64,
    pub locked_positions: usize,
    pub total_shares_locked: U256,
    pub original_shares_locked: U256,
    pub payout_safe: bool,
    pub reward_pool_native: U256,
    pub reward_pool_token: U256,
    pub bonus_token_id: Option<TokenId>,
}
