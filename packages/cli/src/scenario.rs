//! JSON scenarios: named actors, starting balances, an optional lockup and a
//! list of steps run through [`StakingClient`] at explicit block heights.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use lockup::LockupConfig;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use staking_nft::{Address, Payout, Receipt, Resource, Roles, TokenId, Transfer};
use staking_sdk::{AssetLedger, InMemoryAssets, LockupInfo, PoolInfo, PositionInfo, StakingClient};
use tracing::debug;

// ─── Amounts ──────────────────────────────────────────────────────────────────

/// Decimal amount, optionally with an exponent: `"1000"`, `"25519e21"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(pub U256);

pub fn parse_amount(s: &str) -> Result<U256> {
    let s = s.trim().replace('_', "");
    let (digits, exp) = match s.split_once(['e', 'E']) {
        Some((d, e)) => (d.to_string(), e.parse::<usize>().with_context(|| format!("bad exponent in '{s}'"))?),
        None => (s.clone(), 0),
    };
    let base = U256::from_dec_str(&digits).map_err(|e| anyhow!("'{s}' is not a decimal amount: {e:?}"))?;
    let scale = U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or_else(|| anyhow!("'{s}' overflows 256 bits"))?;
    base.checked_mul(scale).ok_or_else(|| anyhow!("'{s}' overflows 256 bits"))
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Amount(U256::from(n))),
            Raw::Text(s) => parse_amount(&s).map(Amount).map_err(serde::de::Error::custom),
        }
    }
}

// ─── Scenario file ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub roles: RoleNames,
    #[serde(default)]
    pub balances: Vec<Credit>,
    #[serde(default)]
    pub lockup: Option<LockupSpec>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoleNames {
    pub owner: String,
    pub governance: String,
    pub factory: String,
}

impl Default for RoleNames {
    fn default() -> Self {
        Self {
            owner: "owner".into(),
            governance: "governance".into(),
            factory: "factory".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credit {
    pub account: String,
    pub resource: Resource,
    pub amount: Amount,
}

/// Lockup parameters. Its participants are the actors `lockup`,
/// `reward_pool`, `bonus_pool` and `foundation`, plus the factory role.
#[derive(Debug, Clone, Deserialize)]
pub struct LockupSpec {
    pub start_block: u64,
    pub lock_duration: u64,
    pub total_bonus_amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Block height to run at; the previous height when omitted
    #[serde(default)]
    pub at: Option<u64>,
    /// The step must fail with an error whose message contains this text
    #[serde(default)]
    pub expect_error: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

/// A position by label (set on `mint`) or by raw id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PositionRef {
    Id(TokenId),
    Label(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Credit { account: String, resource: Resource, amount: Amount },
    Advance { blocks: u64 },
    Mint {
        caller: String,
        shares: Amount,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        lock: u64,
        #[serde(default)]
        label: Option<String>,
    },
    Deposit {
        caller: String,
        resource: Resource,
        amount: Amount,
        #[serde(default)]
        magic: Option<u8>,
    },
    Collect {
        caller: String,
        position: PositionRef,
        resource: Resource,
        #[serde(default)]
        to: Option<String>,
    },
    CollectAll { caller: String, position: PositionRef },
    Burn {
        caller: String,
        position: PositionRef,
        #[serde(default)]
        to: Option<String>,
    },
    LockPosition { caller: String, owner: String, position: PositionRef, duration: u64 },
    LockOwnPosition { caller: String, position: PositionRef, duration: u64 },
    LockWithdraw { caller: String, position: PositionRef, duration: u64 },
    SkimExcess { caller: String, resource: Resource, to: String },
    TripCircuitBreaker { caller: String },
    ResetCircuitBreaker { caller: String },
    Approve { caller: String, to: String, position: PositionRef },
    TransferFrom { caller: String, from: String, to: String, position: PositionRef },
    LockFromApproval { caller: String, position: PositionRef },
    LockFromTransfer { caller: String, position: PositionRef },
    CreateBonus { caller: String },
    CollectLocked { caller: String },
    Aggregate { caller: String, batch: usize },
    UnlockEarly {
        caller: String,
        shares: Amount,
        #[serde(default)]
        stake_exit: bool,
    },
    Unlock {
        caller: String,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        stake_exit: bool,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Credit { .. } => "credit",
            Action::Advance { .. } => "advance",
            Action::Mint { .. } => "mint",
            Action::Deposit { .. } => "deposit",
            Action::Collect { .. } => "collect",
            Action::CollectAll { .. } => "collect_all",
            Action::Burn { .. } => "burn",
            Action::LockPosition { .. } => "lock_position",
            Action::LockOwnPosition { .. } => "lock_own_position",
            Action::LockWithdraw { .. } => "lock_withdraw",
            Action::SkimExcess { .. } => "skim_excess",
            Action::TripCircuitBreaker { .. } => "trip_circuit_breaker",
            Action::ResetCircuitBreaker { .. } => "reset_circuit_breaker",
            Action::Approve { .. } => "approve",
            Action::TransferFrom { .. } => "transfer_from",
            Action::LockFromApproval { .. } => "lock_from_approval",
            Action::LockFromTransfer { .. } => "lock_from_transfer",
            Action::CreateBonus { .. } => "create_bonus",
            Action::CollectLocked { .. } => "collect_locked",
            Action::Aggregate { .. } => "aggregate",
            Action::UnlockEarly { .. } => "unlock_early",
            Action::Unlock { .. } => "unlock",
        }
    }
}

pub fn load(text: &str) -> Result<Scenario> {
    serde_json::from_str(text).context("Scenario is not valid JSON for the expected schema")
}

// ─── Actors ───────────────────────────────────────────────────────────────────

const LEDGER: &str = "staking";
const FIRST_ACTOR: u64 = 0x100;

/// Name ↔ address registry. Names get sequential addresses on first use;
/// `0x…` strings are taken as literal addresses.
#[derive(Debug, Default)]
pub struct Actors {
    by_name: BTreeMap<String, Address>,
}

impl Actors {
    pub fn resolve(&mut self, name: &str) -> Result<Address> {
        if name.starts_with("0x") {
            return Address::from_str(name).map_err(|e| anyhow!("bad address '{name}': {e}"));
        }
        if let Some(address) = self.by_name.get(name) {
            return Ok(*address);
        }
        let address = Address::from_low_u64_be(FIRST_ACTOR + self.by_name.len() as u64);
        self.by_name.insert(name.to_string(), address);
        Ok(address)
    }

    pub fn name_of(&self, address: &Address) -> String {
        self.by_name
            .iter()
            .find(|(_, a)| *a == address)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| format!("{address:?}"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.by_name.iter()
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TransferLine {
    pub resource: Resource,
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub height: u64,
    pub op: &'static str,
    pub ok: bool,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub transfers: Vec<TransferLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceLine {
    pub account: String,
    pub native: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub final_height: u64,
    pub steps: Vec<StepReport>,
    pub balances: Vec<BalanceLine>,
    pub pools: Vec<PoolInfo>,
    pub positions: Vec<PositionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockup: Option<LockupInfo>,
}

impl Report {
    #[cfg(test)]
    pub fn balance(&self, account: &str) -> Option<&BalanceLine> {
        self.balances.iter().find(|b| b.account == account)
    }
}

/// Receipt values as report JSON; amounts are decimal strings.
trait Render {
    fn render(&self) -> Value;
}

impl Render for () {
    fn render(&self) -> Value {
        Value::Null
    }
}

impl Render for bool {
    fn render(&self) -> Value {
        json!(self)
    }
}

impl Render for TokenId {
    fn render(&self) -> Value {
        json!(self)
    }
}

impl Render for U256 {
    fn render(&self) -> Value {
        json!(self.to_string())
    }
}

impl Render for Payout {
    fn render(&self) -> Value {
        json!({ "native": self.native.to_string(), "token": self.token.to_string() })
    }
}

type Outcome = std::result::Result<(Value, Vec<Transfer>), staking_sdk::Error>;

fn receipt<T: Render>(result: staking_sdk::Result<Receipt<T>>) -> Outcome {
    result.map(|r| (r.value.render(), r.transfers))
}

fn plain<T: Render>(result: staking_sdk::Result<T>) -> Outcome {
    result.map(|v| (v.render(), Vec::new()))
}

// ─── Runner ───────────────────────────────────────────────────────────────────

pub struct Runner {
    client: StakingClient,
    actors: Actors,
    labels: BTreeMap<String, TokenId>,
}

impl Runner {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let mut actors = Actors::default();
        let ledger = actors.resolve(LEDGER)?;
        let roles = Roles {
            owner: actors.resolve(&scenario.roles.owner)?,
            governance: actors.resolve(&scenario.roles.governance)?,
            factory: actors.resolve(&scenario.roles.factory)?,
        };

        let mut client = StakingClient::new(ledger, roles.clone(), InMemoryAssets::new());
        if let Some(spec) = &scenario.lockup {
            let config = LockupConfig {
                start_block: spec.start_block,
                lock_duration: spec.lock_duration,
                total_bonus_amount: spec.total_bonus_amount.0,
                lockup: actors.resolve("lockup")?,
                reward_pool: actors.resolve("reward_pool")?,
                bonus_pool: actors.resolve("bonus_pool")?,
                factory: roles.factory,
                foundation: actors.resolve("foundation")?,
            };
            client = client.with_lockup(config).context("Invalid lockup configuration")?;
        }

        let mut runner = Self {
            client,
            actors,
            labels: BTreeMap::new(),
        };
        for credit in &scenario.balances {
            runner.credit(&credit.account, credit.resource, credit.amount)?;
        }
        Ok(runner)
    }

    fn credit(&mut self, account: &str, resource: Resource, amount: Amount) -> Result<()> {
        let address = self.actors.resolve(account)?;
        self.client
            .assets_mut()
            .credit(address, resource, amount.0)
            .with_context(|| format!("Cannot credit {account}"))
    }

    fn position(&self, position: &PositionRef) -> Result<TokenId> {
        match position {
            PositionRef::Id(id) => Ok(*id),
            PositionRef::Label(label) => self
                .labels
                .get(label)
                .copied()
                .ok_or_else(|| anyhow!("Unknown position label '{label}'. Set it with \"label\" on a mint step.")),
        }
    }

    fn or_caller(&mut self, name: &Option<String>, caller: Address) -> Result<Address> {
        match name {
            Some(name) => self.actors.resolve(name),
            None => Ok(caller),
        }
    }

    /// Run one action. The outer error is a scenario mistake; the inner one
    /// is the engine rejecting the operation.
    fn apply(&mut self, action: &Action) -> Result<Outcome> {
        Ok(match action {
            Action::Credit { account, resource, amount } => {
                self.credit(account, *resource, *amount)?;
                Ok((Value::Null, Vec::new()))
            }
            Action::Advance { blocks } => Ok((json!(self.client.advance(*blocks)), Vec::new())),
            Action::Mint { caller, shares, to, lock, label } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.or_caller(to, caller)?;
                let result = self.client.mint_to(caller, to, shares.0, *lock);
                if let (Ok(r), Some(label)) = (&result, label) {
                    self.labels.insert(label.clone(), r.value);
                }
                receipt(result)
            }
            Action::Deposit { caller, resource, amount, magic } => {
                let caller = self.actors.resolve(caller)?;
                match magic {
                    Some(m) => receipt(self.client.deposit_with_magic(caller, *resource, *m, amount.0)),
                    None => receipt(self.client.deposit(caller, *resource, amount.0)),
                }
            }
            Action::Collect { caller, position, resource, to } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.or_caller(to, caller)?;
                let id = self.position(position)?;
                receipt(self.client.collect_to(caller, to, id, *resource))
            }
            Action::CollectAll { caller, position } => {
                let caller = self.actors.resolve(caller)?;
                let id = self.position(position)?;
                receipt(self.client.collect_all_profits(caller, id))
            }
            Action::Burn { caller, position, to } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.or_caller(to, caller)?;
                let id = self.position(position)?;
                receipt(self.client.burn_to(caller, to, id))
            }
            Action::LockPosition { caller, owner, position, duration } => {
                let caller = self.actors.resolve(caller)?;
                let owner = self.actors.resolve(owner)?;
                let id = self.position(position)?;
                plain(self.client.lock_position(caller, owner, id, *duration))
            }
            Action::LockOwnPosition { caller, position, duration } => {
                let caller = self.actors.resolve(caller)?;
                let id = self.position(position)?;
                plain(self.client.lock_own_position(caller, id, *duration))
            }
            Action::LockWithdraw { caller, position, duration } => {
                let caller = self.actors.resolve(caller)?;
                let id = self.position(position)?;
                plain(self.client.lock_withdraw(caller, id, *duration))
            }
            Action::SkimExcess { caller, resource, to } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.actors.resolve(to)?;
                receipt(self.client.skim_excess(caller, *resource, to))
            }
            Action::TripCircuitBreaker { caller } => {
                let caller = self.actors.resolve(caller)?;
                plain(self.client.trip_circuit_breaker(caller))
            }
            Action::ResetCircuitBreaker { caller } => {
                let caller = self.actors.resolve(caller)?;
                plain(self.client.reset_circuit_breaker(caller))
            }
            Action::Approve { caller, to, position } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.actors.resolve(to)?;
                let id = self.position(position)?;
                plain(self.client.approve(caller, to, id))
            }
            Action::TransferFrom { caller, from, to, position } => {
                let caller = self.actors.resolve(caller)?;
                let from = self.actors.resolve(from)?;
                let to = self.actors.resolve(to)?;
                let id = self.position(position)?;
                plain(self.client.transfer_from(caller, from, to, id))
            }
            Action::LockFromApproval { caller, position } => {
                let caller = self.actors.resolve(caller)?;
                let id = self.position(position)?;
                plain(self.client.lock_from_approval(caller, id))
            }
            Action::LockFromTransfer { caller, position } => {
                let caller = self.actors.resolve(caller)?;
                let id = self.position(position)?;
                plain(self.client.lock_from_transfer(caller, id))
            }
            Action::CreateBonus { caller } => {
                let caller = self.actors.resolve(caller)?;
                receipt(self.client.create_bonus_staked_position(caller))
            }
            Action::CollectLocked { caller } => {
                let caller = self.actors.resolve(caller)?;
                receipt(self.client.collect_locked_profits(caller))
            }
            Action::Aggregate { caller, batch } => {
                let caller = self.actors.resolve(caller)?;
                receipt(self.client.aggregate_profits(caller, *batch))
            }
            Action::UnlockEarly { caller, shares, stake_exit } => {
                let caller = self.actors.resolve(caller)?;
                receipt(self.client.unlock_early(caller, shares.0, *stake_exit))
            }
            Action::Unlock { caller, to, stake_exit } => {
                let caller = self.actors.resolve(caller)?;
                let to = self.or_caller(to, caller)?;
                receipt(self.client.unlock(caller, to, *stake_exit))
            }
        })
    }

    fn transfer_line(&self, transfer: &Transfer) -> TransferLine {
        TransferLine {
            resource: transfer.resource,
            from: self.actors.name_of(&transfer.from),
            to: self.actors.name_of(&transfer.to),
            amount: transfer.amount.to_string(),
        }
    }

    fn run_step(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        if let Some(at) = step.at {
            self.client.set_height(at);
        }
        let op = step.action.name();
        let outcome = self
            .apply(&step.action)
            .with_context(|| format!("Step {index} ({op})"))?;
        debug!(index, op, ok = outcome.is_ok(), "step");

        let mut report = StepReport {
            index,
            height: self.client.height(),
            op,
            ok: outcome.is_ok(),
            value: Value::Null,
            error: None,
            transfers: Vec::new(),
        };
        match (outcome, &step.expect_error) {
            (Ok((value, transfers)), None) => {
                report.value = value;
                report.transfers = transfers.iter().map(|t| self.transfer_line(t)).collect();
            }
            (Ok(_), Some(expected)) => {
                bail!("Step {index} ({op}) succeeded but was expected to fail with '{expected}'")
            }
            (Err(e), Some(expected)) if e.to_string().contains(expected.as_str()) => {
                report.error = Some(e.to_string());
            }
            (Err(e), _) => {
                return Err(anyhow::Error::new(e).context(format!("Step {index} ({op}) failed")));
            }
        }
        Ok(report)
    }

    fn finish(&self, scenario: &Scenario, steps: Vec<StepReport>) -> Result<Report> {
        let assets = self.client.assets();
        let balances = self
            .actors
            .iter()
            .map(|(name, address)| BalanceLine {
                account: name.clone(),
                native: assets.balance(address, Resource::Native).to_string(),
                token: assets.balance(address, Resource::Token).to_string(),
            })
            .collect();
        let positions = self
            .client
            .staking()
            .position_ids()
            .map(|id| self.client.position_info(id))
            .collect::<staking_sdk::Result<Vec<_>>>()?;

        Ok(Report {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            final_height: self.client.height(),
            steps,
            balances,
            pools: Resource::ALL.iter().map(|r| self.client.pool_info(*r)).collect(),
            positions,
            lockup: self.client.lockup_info().ok(),
        })
    }
}

/// Run every step in order. Any unexpected rejection aborts the run.
pub fn run(scenario: &Scenario) -> Result<Report> {
    let mut runner = Runner::new(scenario)?;
    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        steps.push(runner.run_step(index, step)?);
    }
    runner.finish(scenario, steps)
}
