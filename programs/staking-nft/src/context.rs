use serde::{Deserialize, Serialize};

use crate::state::Address;

/// Who is calling and at which block. Height is injected, never read from a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub caller: Address,
    pub height: u64,
}

impl Context {
    pub fn new(caller: Address, height: u64) -> Self {
        Self { caller, height }
    }

    /// Same block, different caller. Used when one component calls another.
    pub fn with_caller(&self, caller: Address) -> Self {
        Self { caller, height: self.height }
    }
}

/// Answers role questions for the ledger.
pub trait Authority {
    /// Administrative owner of the deployment.
    fn is_owner(&self, caller: &Address) -> bool;
    /// May lock positions on behalf of their owners.
    fn is_governance(&self, caller: &Address) -> bool;
    /// Factory-equivalent: skim excess, operate the circuit breaker.
    fn is_privileged(&self, caller: &Address) -> bool;
}

/// Fixed role table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub owner: Address,
    pub governance: Address,
    pub factory: Address,
}

impl Authority for Roles {
    fn is_owner(&self, caller: &Address) -> bool {
        *caller == self.owner
    }

    fn is_governance(&self, caller: &Address) -> bool {
        *caller == self.governance
    }

    fn is_privileged(&self, caller: &Address) -> bool {
        *caller == self.factory
    }
}
