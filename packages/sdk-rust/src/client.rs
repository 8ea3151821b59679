//! [`StakingClient`]: the transaction layer over the staking ledger and lockup.

use lockup::{Lockup, LockupConfig, LockupError};
use primitive_types::U256;
use staking_nft::{
    Address, Context, Payout, PublicStaking, Receipt, Resource, Roles, TokenId, MAGIC_VALUE,
};
use tracing::{debug, warn};

use crate::{
    assets::{AssetLedger, InMemoryAssets},
    error::{Error, Result},
    types::{LockupInfo, PoolInfo, PositionInfo},
};

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Everything an operation may mutate besides assets.
#[derive(Debug, Clone)]
struct Engine {
    staking: PublicStaking<Roles>,
    lockup: Option<Lockup>,
}

impl Engine {
    fn lockup(&mut self) -> Result<(&mut Lockup, &mut PublicStaking<Roles>)> {
        match self.lockup.as_mut() {
            Some(lockup) => Ok((lockup, &mut self.staking)),
            None => Err(Error::LockupNotConfigured),
        }
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Runs engine operations at a simulated block height and settles their
/// receipts against an [`AssetLedger`].
///
/// Each operation executes on a copy of the ledger, lockup and balances. The
/// copy replaces the live state only if the operation and every transfer in
/// its receipt succeed, so a failed call leaves nothing behind.
///
/// ```rust
/// # use staking_sdk::{InMemoryAssets, StakingClient};
/// # use staking_nft::{Address, Resource, Roles};
/// # use primitive_types::U256;
/// let alice = Address::from_low_u64_be(0xa);
/// let mut assets = InMemoryAssets::new();
/// assets.credit(alice, Resource::Token, U256::from(100u8)).unwrap();
///
/// let mut client = StakingClient::new(Address::from_low_u64_be(1), Roles::default(), assets);
/// let id = client.mint(alice, U256::from(100u8)).unwrap().value;
/// assert_eq!(client.position_info(id).unwrap().shares, U256::from(100u8));
/// ```
#[derive(Debug, Clone)]
pub struct StakingClient<L = InMemoryAssets> {
    engine: Engine,
    assets: L,
    height: u64,
}

impl<L: AssetLedger + Clone> StakingClient<L> {
    /// Ledger at `address` governed by `roles`, starting at height 1.
    pub fn new(address: Address, roles: Roles, assets: L) -> Self {
        Self {
            engine: Engine {
                staking: PublicStaking::new(address, roles),
                lockup: None,
            },
            assets,
            height: 1,
        }
    }

    /// Attach a lockup over this ledger.
    pub fn with_lockup(mut self, config: LockupConfig) -> Result<Self> {
        self.engine.lockup = Some(Lockup::new(config)?);
        Ok(self)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn advance(&mut self, blocks: u64) -> u64 {
        self.height = self.height.saturating_add(blocks);
        self.height
    }

    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    pub fn assets(&self) -> &L {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut L {
        &mut self.assets
    }

    pub fn staking(&self) -> &PublicStaking<Roles> {
        &self.engine.staking
    }

    pub fn lockup(&self) -> Result<&Lockup> {
        self.engine.lockup.as_ref().ok_or(Error::LockupNotConfigured)
    }

    fn ctx(&self, caller: Address) -> Context {
        Context::new(caller, self.height)
    }

    fn execute<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Engine) -> Result<Receipt<T>>,
    ) -> Result<Receipt<T>> {
        let mut engine = self.engine.clone();
        let mut assets = self.assets.clone();
        let outcome = f(&mut engine).and_then(|receipt| {
            assets.apply(&receipt.transfers)?;
            Ok(receipt)
        });
        match outcome {
            Ok(receipt) => {
                self.engine = engine;
                self.assets = assets;
                debug!(op, height = self.height, transfers = receipt.transfers.len(), "committed");
                Ok(receipt)
            }
            Err(e) => {
                warn!(op, height = self.height, error = %e, "rejected");
                Err(e)
            }
        }
    }

    // ── Positions ─────────────────────────────────────────────────────────────

    pub fn mint(&mut self, caller: Address, shares: U256) -> Result<Receipt<TokenId>> {
        let ctx = self.ctx(caller);
        self.execute("mint", |e| Ok(e.staking.mint(&ctx, shares)?))
    }

    pub fn mint_to(
        &mut self,
        caller: Address,
        to: Address,
        shares: U256,
        lock_duration: u64,
    ) -> Result<Receipt<TokenId>> {
        let ctx = self.ctx(caller);
        self.execute("mint_to", |e| Ok(e.staking.mint_to(&ctx, to, shares, lock_duration)?))
    }

    pub fn burn(&mut self, caller: Address, token_id: TokenId) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("burn", |e| Ok(e.staking.burn(&ctx, token_id)?))
    }

    pub fn burn_to(&mut self, caller: Address, to: Address, token_id: TokenId) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("burn_to", |e| Ok(e.staking.burn_to(&ctx, to, token_id)?))
    }

    // ── Profits ───────────────────────────────────────────────────────────────

    /// Deposit with an explicit magic byte; [`Self::deposit`] supplies the right one.
    pub fn deposit_with_magic(
        &mut self,
        caller: Address,
        resource: Resource,
        magic: u8,
        amount: U256,
    ) -> Result<Receipt<()>> {
        let ctx = self.ctx(caller);
        self.execute("deposit", |e| Ok(e.staking.deposit(&ctx, resource, magic, amount)?))
    }

    pub fn deposit(&mut self, caller: Address, resource: Resource, amount: U256) -> Result<Receipt<()>> {
        self.deposit_with_magic(caller, resource, MAGIC_VALUE, amount)
    }

    pub fn collect(&mut self, caller: Address, token_id: TokenId, resource: Resource) -> Result<Receipt<U256>> {
        let ctx = self.ctx(caller);
        self.execute("collect", |e| Ok(e.staking.collect(&ctx, token_id, resource)?))
    }

    pub fn collect_to(
        &mut self,
        caller: Address,
        to: Address,
        token_id: TokenId,
        resource: Resource,
    ) -> Result<Receipt<U256>> {
        let ctx = self.ctx(caller);
        self.execute("collect_to", |e| Ok(e.staking.collect_to(&ctx, to, token_id, resource)?))
    }

    pub fn collect_all_profits(&mut self, caller: Address, token_id: TokenId) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("collect_all_profits", |e| Ok(e.staking.collect_all_profits(&ctx, token_id)?))
    }

    // ── Locks ─────────────────────────────────────────────────────────────────

    pub fn lock_position(
        &mut self,
        caller: Address,
        owner: Address,
        token_id: TokenId,
        duration: u64,
    ) -> Result<U256> {
        let ctx = self.ctx(caller);
        self.execute("lock_position", |e| {
            Ok(Receipt::new(e.staking.lock_position(&ctx, owner, token_id, duration)?))
        })
        .map(|r| r.value)
    }

    pub fn lock_own_position(&mut self, caller: Address, token_id: TokenId, duration: u64) -> Result<U256> {
        let ctx = self.ctx(caller);
        self.execute("lock_own_position", |e| {
            Ok(Receipt::new(e.staking.lock_own_position(&ctx, token_id, duration)?))
        })
        .map(|r| r.value)
    }

    pub fn lock_withdraw(&mut self, caller: Address, token_id: TokenId, duration: u64) -> Result<U256> {
        let ctx = self.ctx(caller);
        self.execute("lock_withdraw", |e| {
            Ok(Receipt::new(e.staking.lock_withdraw(&ctx, token_id, duration)?))
        })
        .map(|r| r.value)
    }

    // ── Admin ─────────────────────────────────────────────────────────────────

    /// Recover whatever the ledger's account holds above its reserve.
    pub fn skim_excess(&mut self, caller: Address, resource: Resource, to: Address) -> Result<Receipt<U256>> {
        let ctx = self.ctx(caller);
        let observed = self.assets.balance(&self.engine.staking.address(), resource);
        self.execute("skim_excess", |e| Ok(e.staking.skim_excess(&ctx, resource, to, observed)?))
    }

    pub fn trip_circuit_breaker(&mut self, caller: Address) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("trip_circuit_breaker", |e| Ok(Receipt::new(e.staking.trip_circuit_breaker(&ctx)?)))
            .map(|r| r.value)
    }

    pub fn reset_circuit_breaker(&mut self, caller: Address) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("reset_circuit_breaker", |e| Ok(Receipt::new(e.staking.reset_circuit_breaker(&ctx)?)))
            .map(|r| r.value)
    }

    // ── Ownership ─────────────────────────────────────────────────────────────

    pub fn approve(&mut self, caller: Address, to: Address, token_id: TokenId) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("approve", |e| Ok(Receipt::new(e.staking.approve(&ctx, to, token_id)?)))
            .map(|r| r.value)
    }

    pub fn transfer_from(&mut self, caller: Address, from: Address, to: Address, token_id: TokenId) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("transfer_from", |e| {
            Ok(Receipt::new(e.staking.transfer_from(&ctx, from, to, token_id)?))
        })
        .map(|r| r.value)
    }

    // ── Lockup ────────────────────────────────────────────────────────────────

    /// Approve the lockup on `token_id` and lock it in one step.
    pub fn lock_from_approval(&mut self, caller: Address, token_id: TokenId) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("lock_from_approval", |e| {
            let (lockup, staking) = e.lockup()?;
            staking.approve(&ctx, lockup.address(), token_id)?;
            lockup.lock_from_approval(staking, &ctx, token_id)?;
            Ok(Receipt::new(()))
        })
        .map(|r| r.value)
    }

    /// Transfer `token_id` to the lockup; the ledger then notifies it.
    pub fn lock_from_transfer(&mut self, caller: Address, token_id: TokenId) -> Result<()> {
        let ctx = self.ctx(caller);
        self.execute("lock_from_transfer", |e| {
            let (lockup, staking) = e.lockup()?;
            staking.transfer_from(&ctx, caller, lockup.address(), token_id)?;
            let notify = ctx.with_caller(staking.address());
            lockup.lock_from_transfer(staking, &notify, token_id, caller)?;
            Ok(Receipt::new(()))
        })
        .map(|r| r.value)
    }

    /// Stake the bonus pool's endowment, funded from its current token balance.
    pub fn create_bonus_staked_position(&mut self, caller: Address) -> Result<Receipt<TokenId>> {
        let ctx = self.ctx(caller);
        let bonus_pool = self.lockup()?.config().bonus_pool;
        let balance = self.assets.balance(&bonus_pool, Resource::Token);
        self.execute("create_bonus_staked_position", |e| {
            let (lockup, staking) = e.lockup()?;
            Ok(lockup.create_bonus_staked_position(staking, &ctx, balance)?)
        })
    }

    pub fn collect_locked_profits(&mut self, caller: Address) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("lockup_collect_all_profits", |e| {
            let (lockup, staking) = e.lockup()?;
            Ok(lockup.collect_all_profits(staking, &ctx)?)
        })
    }

    pub fn aggregate_profits(&mut self, caller: Address, batch: usize) -> Result<Receipt<bool>> {
        let ctx = self.ctx(caller);
        self.execute("aggregate_profits", |e| {
            let (lockup, staking) = e.lockup()?;
            Ok(lockup.aggregate_profits(staking, &ctx, batch)?)
        })
    }

    pub fn unlock_early(&mut self, caller: Address, exit_shares: U256, stake_exit: bool) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("unlock_early", |e| {
            let (lockup, staking) = e.lockup()?;
            Ok(lockup.unlock_early(staking, &ctx, exit_shares, stake_exit)?)
        })
    }

    pub fn unlock(&mut self, caller: Address, to: Address, stake_exit: bool) -> Result<Receipt<Payout>> {
        let ctx = self.ctx(caller);
        self.execute("unlock", |e| {
            let (lockup, staking) = e.lockup()?;
            Ok(lockup.unlock(staking, &ctx, to, stake_exit)?)
        })
    }

    // ── Read operations ───────────────────────────────────────────────────────

    /// Position state plus pending profits. Positions held by the lockup
    /// report the locking user as owner.
    pub fn position_info(&self, token_id: TokenId) -> Result<PositionInfo> {
        let staking = &self.engine.staking;
        let position = staking
            .get_position(token_id)
            .map_err(|_| Error::PositionNotFound(token_id))?;
        let holder = staking.owner_of(token_id)?;
        let locked_by = self.engine.lockup.as_ref().and_then(|l| l.owner_of(token_id));
        let pending = staking.estimate_all_profits(token_id)?;

        Ok(PositionInfo {
            token_id,
            owner: locked_by.unwrap_or(holder),
            shares: position.shares,
            free_after: position.free_after,
            withdraw_free_after: position.withdraw_free_after,
            pending_native: pending.native,
            pending_token: pending.token,
            locked: locked_by.is_some(),
        })
    }

    /// Every position `owner` holds directly or through the lockup.
    pub fn positions_of(&self, owner: &Address) -> Result<Vec<PositionInfo>> {
        self.engine
            .staking
            .position_ids()
            .map(|id| self.position_info(id))
            .filter(|info| !matches!(info, Ok(i) if i.owner != *owner))
            .collect()
    }

    pub fn pool_info(&self, resource: Resource) -> PoolInfo {
        let staking = &self.engine.staking;
        let pool = staking.get_pool(resource);
        PoolInfo {
            resource,
            reserve: pool.reserve,
            accumulator: pool.state.accumulator,
            slush: pool.state.slush,
            total_shares: staking.get_total_shares(),
        }
    }

    pub fn lockup_info(&self) -> Result<LockupInfo> {
        let lockup = self.lockup()?;
        Ok(LockupInfo {
            state: lockup.get_state(self.height),
            start_block: lockup.get_lockup_start_block(),
            end_block: lockup.get_lockup_end_block(),
            locked_positions: lockup.get_current_number_of_locked_positions(),
            total_shares_locked: lockup.get_total_current_shares_locked(),
            original_shares_locked: lockup.get_original_locked_shares(),
            payout_safe: lockup.payout_safe(),
            reward_pool_native: lockup.reward_pool().eth_reserve(),
            reward_pool_token: lockup.reward_pool().token_reserve(),
            bonus_token_id: lockup.bonus_pool().token_id(),
        })
    }

    /// What `owner` would take home from the lockup if they left now.
    pub fn estimate_locked_profits(&self, owner: &Address) -> Result<Payout> {
        let lockup = self.lockup()?;
        let token_id = lockup
            .token_of(owner)
            .ok_or(LockupError::UserHasNoPosition(*owner))?;
        Ok(lockup.estimate_profits(&self.engine.staking, token_id)?)
    }

    /// Shares of `owner`'s locked position and what it is owed through the
    /// reward pool and bonus settlement at the end of the lock.
    pub fn estimate_final_bonus_with_profits(&self, owner: &Address) -> Result<(U256, Payout)> {
        let lockup = self.lockup()?;
        let token_id = lockup
            .token_of(owner)
            .ok_or(LockupError::UserHasNoPosition(*owner))?;
        Ok(lockup.estimate_final_bonus_with_profits(&self.engine.staking, self.height, token_id)?)
    }
}
