//! Staking positions over an accumulator-based reward distribution engine.
//!
//! Two resources (native and token) are deposited into the ledger and shared
//! pro rata across every open position at O(1) cost per operation.
//!
//! Operations:
//!   mint / mint_to             open a position by staking tokens as shares
//!   deposit_native / _token    distribute a resource to current holders
//!   collect / collect_to       withdraw one resource's accrued profit
//!   collect_all_profits        withdraw both resources' accrued profit
//!   burn / burn_to             close a position, returning principal + profit
//!   lock_position              governance extends a position's burn lock
//!   lock_own_position          owner extends their own burn lock
//!   lock_withdraw              owner extends their own collect lock
//!   skim_excess                factory recovers balance above reserve
//!   trip / reset breaker       factory halts or resumes inflows
//!
//! Every operation returns a [`Receipt`] listing the transfers the caller's
//! transaction layer must apply. State is committed before the receipt is
//! returned.

pub mod constants;
pub mod context;
pub mod error;
pub mod instructions;
pub mod settlement;
pub mod state;

use std::collections::BTreeMap;

use primitive_types::U256;

pub use constants::*;
pub use context::{Authority, Context, Roles};
pub use error::{Result, StakingError};
pub use instructions::accumulator_math;
pub use settlement::{Receipt, Transfer};
pub use state::*;

// ─── Ledger ───────────────────────────────────────────────────────────────────

/// The position ledger and both resource pools.
#[derive(Debug, Clone)]
pub struct PublicStaking<A = Roles> {
    pub(crate) address: Address,
    pub(crate) authority: A,
    pub(crate) pools: [ResourcePool; 2],
    pub(crate) total_shares: U256,
    pub(crate) positions: BTreeMap<TokenId, Position>,
    pub(crate) owners: BTreeMap<TokenId, Address>,
    pub(crate) balances: BTreeMap<Address, u64>,
    pub(crate) approvals: BTreeMap<TokenId, Address>,
    pub(crate) latest_token_id: TokenId,
    pub(crate) circuit_breaker_open: bool,
}

impl<A: Authority> PublicStaking<A> {
    /// Empty ledger living at `address`.
    pub fn new(address: Address, authority: A) -> Self {
        Self {
            address,
            authority,
            pools: [ResourcePool::default(); 2],
            total_shares: U256::zero(),
            positions: BTreeMap::new(),
            owners: BTreeMap::new(),
            balances: BTreeMap::new(),
            approvals: BTreeMap::new(),
            latest_token_id: 0,
            circuit_breaker_open: false,
        }
    }

    // ── Positions ────────────────────────────────────────────────────────────

    /// Stake `shares` tokens from the caller into a new position they own.
    pub fn mint(&mut self, ctx: &Context, shares: U256) -> Result<Receipt<TokenId>> {
        instructions::mint::handler(self, ctx, ctx.caller, shares, 0)
    }

    /// Stake `shares` tokens from the caller into a new position owned by `to`.
    pub fn mint_to(
        &mut self,
        ctx: &Context,
        to: Address,
        shares: U256,
        lock_duration: u64,
    ) -> Result<Receipt<TokenId>> {
        instructions::mint::handler(self, ctx, to, shares, lock_duration)
    }

    /// Close a position; principal and profit go to the caller.
    pub fn burn(&mut self, ctx: &Context, token_id: TokenId) -> Result<Receipt<Payout>> {
        instructions::burn::handler(self, ctx, ctx.caller, token_id)
    }

    /// Close a position; principal and profit go to `to`.
    pub fn burn_to(
        &mut self,
        ctx: &Context,
        to: Address,
        token_id: TokenId,
    ) -> Result<Receipt<Payout>> {
        instructions::burn::handler(self, ctx, to, token_id)
    }

    // ── Profits ──────────────────────────────────────────────────────────────

    /// Distribute `amount` native units to current holders.
    pub fn deposit_native(&mut self, ctx: &Context, magic: u8, amount: U256) -> Result<Receipt<()>> {
        instructions::deposit::handler(self, ctx, Resource::Native, magic, amount)
    }

    /// Distribute `amount` tokens to current holders.
    pub fn deposit_token(&mut self, ctx: &Context, magic: u8, amount: U256) -> Result<Receipt<()>> {
        instructions::deposit::handler(self, ctx, Resource::Token, magic, amount)
    }

    pub fn deposit(
        &mut self,
        ctx: &Context,
        resource: Resource,
        magic: u8,
        amount: U256,
    ) -> Result<Receipt<()>> {
        instructions::deposit::handler(self, ctx, resource, magic, amount)
    }

    /// Withdraw accrued `resource` profit to the caller.
    pub fn collect(
        &mut self,
        ctx: &Context,
        token_id: TokenId,
        resource: Resource,
    ) -> Result<Receipt<U256>> {
        instructions::collect::handler(self, ctx, ctx.caller, token_id, resource)
    }

    /// Withdraw accrued `resource` profit to `to`.
    pub fn collect_to(
        &mut self,
        ctx: &Context,
        to: Address,
        token_id: TokenId,
        resource: Resource,
    ) -> Result<Receipt<U256>> {
        instructions::collect::handler(self, ctx, to, token_id, resource)
    }

    /// Withdraw both resources' accrued profit to the caller.
    pub fn collect_all_profits(&mut self, ctx: &Context, token_id: TokenId) -> Result<Receipt<Payout>> {
        instructions::collect::collect_all(self, ctx, ctx.caller, token_id)
    }

    // ── Locks ────────────────────────────────────────────────────────────────

    /// Governance locks `token_id`, which must belong to `owner`.
    pub fn lock_position(
        &mut self,
        ctx: &Context,
        owner: Address,
        token_id: TokenId,
        duration: u64,
    ) -> Result<U256> {
        instructions::lock::lock_position(self, ctx, owner, token_id, duration)
    }

    pub fn lock_own_position(&mut self, ctx: &Context, token_id: TokenId, duration: u64) -> Result<U256> {
        instructions::lock::lock_own_position(self, ctx, token_id, duration)
    }

    pub fn lock_withdraw(&mut self, ctx: &Context, token_id: TokenId, duration: u64) -> Result<U256> {
        instructions::lock::lock_withdraw(self, ctx, token_id, duration)
    }

    // ── Admin ────────────────────────────────────────────────────────────────

    /// Send whatever the ledger holds above its reserve to `to`.
    pub fn skim_excess(
        &mut self,
        ctx: &Context,
        resource: Resource,
        to: Address,
        observed_balance: U256,
    ) -> Result<Receipt<U256>> {
        instructions::skim_excess::handler(self, ctx, resource, to, observed_balance)
    }

    pub fn trip_circuit_breaker(&mut self, ctx: &Context) -> Result<()> {
        instructions::circuit_breaker::trip(self, ctx)
    }

    pub fn reset_circuit_breaker(&mut self, ctx: &Context) -> Result<()> {
        instructions::circuit_breaker::reset(self, ctx)
    }

    // ── Ownership ────────────────────────────────────────────────────────────

    pub fn approve(&mut self, ctx: &Context, to: Address, token_id: TokenId) -> Result<()> {
        instructions::ownership::approve(self, ctx, to, token_id)
    }

    pub fn transfer_from(
        &mut self,
        ctx: &Context,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<()> {
        instructions::ownership::transfer_from(self, ctx, from, to, token_id)
    }

    // ── Views ────────────────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn get_position(&self, token_id: TokenId) -> Result<Position> {
        self.position(token_id).copied()
    }

    pub fn get_accumulator(&self, resource: Resource) -> Accumulator {
        self.pools[resource.index()].state
    }

    pub fn get_pool(&self, resource: Resource) -> ResourcePool {
        self.pools[resource.index()]
    }

    pub fn get_total_shares(&self) -> U256 {
        self.total_shares
    }

    pub fn get_total_reserve(&self, resource: Resource) -> U256 {
        self.pools[resource.index()].reserve
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(StakingError::InvalidTokenId(token_id))
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn get_approved(&self, token_id: TokenId) -> Result<Option<Address>> {
        self.position(token_id)?;
        Ok(self.approvals.get(&token_id).copied())
    }

    /// Ids of every open position, ascending.
    pub fn position_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.positions.keys().copied()
    }

    pub fn get_latest_minted_position_id(&self) -> TokenId {
        self.latest_token_id
    }

    pub fn circuit_breaker_state(&self) -> bool {
        self.circuit_breaker_open
    }

    pub fn get_accumulator_scale_factor(&self) -> U256 {
        SCALE
    }

    pub fn get_max_mint_lock(&self) -> u64 {
        MAX_MINT_LOCK
    }

    pub fn get_max_governance_lock(&self) -> u64 {
        MAX_GOVERNANCE_LOCK
    }

    /// What `collect` would pay right now, without changing anything.
    pub fn estimate_collection(&self, token_id: TokenId, resource: Resource) -> Result<U256> {
        instructions::collect::estimate(self, token_id, resource)
    }

    pub fn estimate_all_profits(&self, token_id: TokenId) -> Result<Payout> {
        Ok(Payout::new(
            self.estimate_collection(token_id, Resource::Native)?,
            self.estimate_collection(token_id, Resource::Token)?,
        ))
    }

    pub fn estimate_excess(&self, resource: Resource, observed_balance: U256) -> Result<U256> {
        self.pools[resource.index()].excess(observed_balance)
    }

    // ── Internal guards ──────────────────────────────────────────────────────

    pub(crate) fn position(&self, token_id: TokenId) -> Result<&Position> {
        self.positions
            .get(&token_id)
            .ok_or(StakingError::InvalidTokenId(token_id))
    }

    pub(crate) fn require_owner(&self, token_id: TokenId, caller: &Address) -> Result<()> {
        if self.owner_of(token_id)? != *caller {
            return Err(StakingError::CallerNotTokenOwner(*caller));
        }
        Ok(())
    }

    pub(crate) fn require_circuit_breaker_closed(&self) -> Result<()> {
        if self.circuit_breaker_open {
            return Err(StakingError::CircuitBreakerOpened);
        }
        Ok(())
    }
}
