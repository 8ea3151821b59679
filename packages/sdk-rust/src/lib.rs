//! Staking Rust SDK
//!
//! Transaction layer for the staking ledger and its lockup. Engine operations
//! only describe asset movements; the SDK runs them at a simulated block
//! height, settles their receipts against an [`AssetLedger`] and commits
//! everything or nothing.
//!
//! # Quick Start
//!
//! ```rust
//! use primitive_types::U256;
//! use staking_nft::{Address, Resource, Roles};
//! use staking_sdk::{InMemoryAssets, StakingClient};
//!
//! # fn main() -> Result<(), staking_sdk::Error> {
//! let alice  = Address::from_low_u64_be(0xa);
//! let funder = Address::from_low_u64_be(0xf);
//!
//! let mut assets = InMemoryAssets::new();
//! assets.credit(alice, Resource::Token, U256::from(1_000u16))?;
//! assets.credit(funder, Resource::Native, U256::from(500u16))?;
//!
//! let mut client = StakingClient::new(Address::from_low_u64_be(1), Roles::default(), assets);
//!
//! // 1. Stake
//! let id = client.mint(alice, U256::from(1_000u16))?.value;
//!
//! // 2. Distribute profits to stakers
//! client.deposit(funder, Resource::Native, U256::from(500u16))?;
//!
//! // 3. Collect a block later
//! client.advance(1);
//! let paid = client.collect(alice, id, Resource::Native)?.value;
//! assert_eq!(paid, U256::from(500u16));
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`StakingClient::mint`] | Stake tokens into a new position |
//! | [`StakingClient::deposit`] | Distribute native or token profits |
//! | [`StakingClient::collect`] | Withdraw one resource's accrued profit |
//! | [`StakingClient::burn`] | Close a position: principal plus profits |
//! | [`StakingClient::lock_from_approval`] | Enroll a position in the lockup |
//! | [`StakingClient::aggregate_profits`] | Settle the lockup once it ends |
//! | [`StakingClient::unlock`] | Final lockup payout |
//! | [`StakingClient::position_info`] | Position state and pending profits |
//! | [`StakingClient::lockup_info`] | Lockup phase and reward pool balances |

pub mod assets;
pub mod client;
pub mod error;
pub mod types;

pub use assets::{AssetLedger, InMemoryAssets};
pub use client::StakingClient;
pub use error::{Error, Result};
pub use types::*;
