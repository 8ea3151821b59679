use primitive_types::U256;
use serde::{Deserialize, Serialize};
use staking_nft::Address;

// ─── LockupConfig ──────────────────────────────────────────────────────────
// Deployment parameters. Every participant has its own address so transfers
// between them show up in receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupConfig {
    /// First block of the lock (enrollment closes here)
    pub start_block: u64,
    /// Blocks the lock lasts
    pub lock_duration: u64,
    /// Tokens the bonus pool stakes on behalf of lockers
    pub total_bonus_amount: U256,
    pub lockup: Address,
    pub reward_pool: Address,
    pub bonus_pool: Address,
    pub factory: Address,
    pub foundation: Address,
}

impl LockupConfig {
    pub fn end_block(&self) -> u64 {
        self.start_block.saturating_add(self.lock_duration)
    }
}

// ─── LockupState ───────────────────────────────────────────────────────────
// Derived from height on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockupState {
    PreLock,
    InLock,
    PostLock,
}

impl LockupState {
    pub fn at(config: &LockupConfig, height: u64) -> Self {
        if height < config.start_block {
            LockupState::PreLock
        } else if height < config.end_block() {
            LockupState::InLock
        } else {
            LockupState::PostLock
        }
    }
}
