//! Time-boxed lockup on top of the staking ledger.
//!
//! Users lock a staking position for a fixed window. While locked, 20% of
//! every profit the position earns is reserved into a [`RewardPool`]; at the
//! end of the window the reserve, the user's remaining 80% and a share of the
//! [`BonusPool`] endowment are paid out pro rata to whoever stayed.
//!
//! Operations:
//!   lock_from_approval / lock_from_transfer  enroll a position (PreLock)
//!   collect_all_profits                      take 80% of accrued profit
//!   unlock_early                             leave with part or all of a position
//!   aggregate_profits                        paginated settlement (PostLock)
//!   unlock                                   final payout (PostLock, payout safe)
//!
//! Every operation borrows the ledger for the duration of the call and
//! returns a [`Receipt`] of the transfers between ledger, lockup, reward
//! pool, bonus pool and users.

pub mod bonus_pool;
pub mod error;
pub mod instructions;
pub mod math;
pub mod reward_pool;
pub mod state;

use std::collections::BTreeMap;

use primitive_types::U256;
use staking_nft::{Address, Authority, Context, Payout, PublicStaking, Receipt, StakingError, TokenId};

pub use bonus_pool::{BonusPool, BonusSettlement};
pub use error::{LockupError, Result};
pub use reward_pool::RewardPool;
pub use state::{LockupConfig, LockupState};

// ─── Lockup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lockup {
    pub(crate) config: LockupConfig,
    pub(crate) reward_pool: RewardPool,
    /// Locked token ids; a position's index is its slot here plus one
    pub(crate) positions: Vec<TokenId>,
    /// Slot of each locked token id in `positions`
    pub(crate) slots: BTreeMap<TokenId, usize>,
    pub(crate) owners: BTreeMap<TokenId, Address>,
    pub(crate) tokens: BTreeMap<Address, TokenId>,
    /// 80% shares credited during aggregation, paid at unlock
    pub(crate) rewards: BTreeMap<Address, Payout>,
    pub(crate) total_shares_locked: U256,
    pub(crate) original_shares_locked: U256,
    pub(crate) aggregation_cursor: usize,
    pub(crate) payout_safe: bool,
}

impl Lockup {
    pub fn new(config: LockupConfig) -> Result<Self> {
        if config.lock_duration == 0 {
            return Err(LockupError::InvalidLockupPeriod);
        }
        let bonus_pool = BonusPool::new(config.bonus_pool, config.total_bonus_amount);
        let reward_pool = RewardPool::new(config.reward_pool, bonus_pool);
        Ok(Self {
            config,
            reward_pool,
            positions: Vec::new(),
            slots: BTreeMap::new(),
            owners: BTreeMap::new(),
            tokens: BTreeMap::new(),
            rewards: BTreeMap::new(),
            total_shares_locked: U256::zero(),
            original_shares_locked: U256::zero(),
            aggregation_cursor: 0,
            payout_safe: false,
        })
    }

    // ── Enrollment ───────────────────────────────────────────────────────────

    /// Pull an approved position from the caller into the lockup.
    pub fn lock_from_approval<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        token_id: TokenId,
    ) -> Result<()> {
        instructions::enrollment::lock_from_approval(self, staking, ctx, token_id)
    }

    /// Register a position `token_owner` already transferred to the lockup.
    pub fn lock_from_transfer<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        token_id: TokenId,
        token_owner: Address,
    ) -> Result<()> {
        instructions::enrollment::lock_from_transfer(self, staking, ctx, token_id, token_owner)
    }

    /// Factory stakes the bonus endowment. `balance` is the bonus pool's token balance.
    pub fn create_bonus_staked_position<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        balance: U256,
    ) -> Result<Receipt<TokenId>> {
        if ctx.caller != self.config.factory {
            return Err(LockupError::OnlyFactory);
        }
        self.reward_pool
            .bonus_pool
            .create_bonus_staked_position(staking, ctx, balance)
    }

    // ── Profits ──────────────────────────────────────────────────────────────

    pub fn collect_all_profits<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
    ) -> Result<Receipt<Payout>> {
        instructions::profits::collect_all_profits(self, staking, ctx)
    }

    /// Settle up to `batch` positions; the last batch terminates the bonus pool.
    /// Returns whether payout is now safe.
    pub fn aggregate_profits<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        batch: usize,
    ) -> Result<Receipt<bool>> {
        instructions::profits::aggregate_profits(self, staking, ctx, batch)
    }

    // ── Exit ─────────────────────────────────────────────────────────────────

    pub fn unlock_early<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        exit_shares: U256,
        stake_exit: bool,
    ) -> Result<Receipt<Payout>> {
        instructions::exit::unlock_early(self, staking, ctx, exit_shares, stake_exit)
    }

    pub fn unlock<A: Authority>(
        &mut self,
        staking: &mut PublicStaking<A>,
        ctx: &Context,
        to: Address,
        stake_exit: bool,
    ) -> Result<Receipt<Payout>> {
        instructions::exit::unlock(self, staking, ctx, to, stake_exit)
    }

    // ── Views ────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &LockupConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.config.lockup
    }

    pub fn reward_pool(&self) -> &RewardPool {
        &self.reward_pool
    }

    pub fn bonus_pool(&self) -> &BonusPool {
        &self.reward_pool.bonus_pool
    }

    pub fn get_state(&self, height: u64) -> LockupState {
        LockupState::at(&self.config, height)
    }

    pub fn get_lockup_start_block(&self) -> u64 {
        self.config.start_block
    }

    pub fn get_lockup_end_block(&self) -> u64 {
        self.config.end_block()
    }

    pub fn get_current_number_of_locked_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn get_total_current_shares_locked(&self) -> U256 {
        self.total_shares_locked
    }

    pub fn get_original_locked_shares(&self) -> U256 {
        self.original_shares_locked
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    pub fn token_of(&self, owner: &Address) -> Option<TokenId> {
        self.tokens.get(owner).copied()
    }

    /// 1-based, in enrollment order modulo swap-removals.
    pub fn get_position_by_index(&self, index: usize) -> Option<TokenId> {
        index.checked_sub(1).and_then(|i| self.positions.get(i).copied())
    }

    pub fn get_index_by_token_id(&self, token_id: TokenId) -> Option<usize> {
        self.slots.get(&token_id).map(|slot| slot + 1)
    }

    pub fn get_temporary_reward_balance(&self, owner: &Address) -> Payout {
        self.rewards.get(owner).copied().unwrap_or_default()
    }

    pub fn payout_safe(&self) -> bool {
        self.payout_safe
    }

    /// What the owner of `token_id` would receive in profits if they left now.
    pub fn estimate_profits<A: Authority>(
        &self,
        staking: &PublicStaking<A>,
        token_id: TokenId,
    ) -> Result<Payout> {
        instructions::profits::estimate_profits(self, staking, token_id)
    }

    /// What `token_id` is owed through the reward pool if the lockup ended
    /// now: the reserved part of its own profit, its share of the pool and
    /// its share of the bonus settlement. Returns the position's shares too.
    pub fn estimate_final_bonus_with_profits<A: Authority>(
        &self,
        staking: &PublicStaking<A>,
        height: u64,
        token_id: TokenId,
    ) -> Result<(U256, Payout)> {
        instructions::profits::estimate_final_bonus_with_profits(self, staking, height, token_id)
    }

    // ── Guards ───────────────────────────────────────────────────────────────

    pub(crate) fn require_state(&self, height: u64, expected: LockupState) -> Result<()> {
        if self.get_state(height) == expected {
            return Ok(());
        }
        Err(match expected {
            LockupState::PreLock => LockupError::PreLockStateRequired,
            LockupState::PostLock => LockupError::PostLockStateRequired,
            LockupState::InLock => LockupError::PostLockStateNotAllowed,
        })
    }

    pub(crate) fn require_not_post_lock(&self, height: u64) -> Result<()> {
        if self.get_state(height) == LockupState::PostLock {
            return Err(LockupError::PostLockStateNotAllowed);
        }
        Ok(())
    }

    /// Fail up front when an operation will have to mint on the ledger.
    pub(crate) fn require_mint_open<A: Authority>(&self, staking: &PublicStaking<A>) -> Result<()> {
        if staking.circuit_breaker_state() {
            return Err(StakingError::CircuitBreakerOpened.into());
        }
        Ok(())
    }

    pub(crate) fn locked_token(&self, owner: &Address) -> Result<TokenId> {
        self.token_of(owner).ok_or(LockupError::UserHasNoPosition(*owner))
    }

    pub(crate) fn insert_position(&mut self, owner: Address, token_id: TokenId) {
        self.slots.insert(token_id, self.positions.len());
        self.positions.push(token_id);
        self.owners.insert(token_id, owner);
        self.tokens.insert(owner, token_id);
    }

    /// Take `token_id` out of the index by swapping the last entry into its slot.
    pub(crate) fn remove_position(&mut self, owner: &Address, token_id: TokenId) {
        if let Some(slot) = self.slots.remove(&token_id) {
            self.positions.swap_remove(slot);
            if let Some(moved) = self.positions.get(slot) {
                self.slots.insert(*moved, slot);
            }
        }
        self.owners.remove(&token_id);
        self.tokens.remove(owner);
    }

    /// Point the index entry of `old` at `new`, keeping its slot.
    pub(crate) fn replace_position(&mut self, owner: Address, old: TokenId, new: TokenId) {
        if let Some(slot) = self.slots.remove(&old) {
            if let Some(entry) = self.positions.get_mut(slot) {
                *entry = new;
                self.slots.insert(new, slot);
            }
        }
        self.owners.remove(&old);
        self.owners.insert(new, owner);
        self.tokens.insert(owner, new);
    }
}
