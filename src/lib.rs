//! Session SDK for a ve(3,3) DEX.
//!
//! # Overview
//!
//! Client-side state and orchestration layer for one user's session
//! against a fixed set of known protocol contracts: an in-memory cache
//! of on-chain state (token balances, liquidity pairs, vote-escrow
//! positions, gauge/bribe rewards) plus multi-step transaction
//! orchestration (allowance check, approve, primary call, dependent
//! follow-ups, refresh) with lifecycle events published to subscribers.
//!
//! Build a [`session::Session`] from a [`Chain`] descriptor and a
//! wallet-capable provider, subscribe to [`types::Event`]s via
//! [`session::Session::subscribe`], then drive it with
//! [`types::Command`]s through [`session::Session::dispatch`].
//!
//! # Limitations/follow-ups
//!
//! * Cache merges are last-writer-wins per slice; a slow refresh
//!   started earlier can overwrite a fresher one. Accepted, not
//!   guarded.
//! * No client-side timeout on outbound calls; transaction deadlines
//!   are enforced on-chain via the deadline parameter only.
//! * Dispatch neither queues nor cancels: commands of the same type
//!   may run concurrently.

pub mod abi;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod num;
pub mod orchestrator;
pub mod quote;
pub mod session;
pub mod store;
pub mod types;

use alloy::primitives::Address;

/// Deployment descriptor: the fixed set of protocol contracts on one
/// chain, plus session-wide parameters.
#[derive(Clone, Debug)]
pub struct Chain {
    chain_id: u64,
    router: Address,
    factory: Address,
    voter: Address,
    voting_escrow: Address,
    distributor: Address,
    wrapped_native: Address,
    gov_token: Address,
    legacy_token: Address,
    redeemer: Address,
    route_assets: Vec<Address>,
    native_symbol: String,
    wrapped_native_symbol: String,
    deadline_window_secs: u64,
}

impl Chain {
    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        chain_id: u64,
        router: Address,
        factory: Address,
        voter: Address,
        voting_escrow: Address,
        distributor: Address,
        wrapped_native: Address,
        gov_token: Address,
        legacy_token: Address,
        redeemer: Address,
        route_assets: Vec<Address>,
        native_symbol: impl Into<String>,
        wrapped_native_symbol: impl Into<String>,
    ) -> Self {
        Self {
            chain_id,
            router,
            factory,
            voter,
            voting_escrow,
            distributor,
            wrapped_native,
            gov_token,
            legacy_token,
            redeemer,
            route_assets,
            native_symbol: native_symbol.into(),
            wrapped_native_symbol: wrapped_native_symbol.into(),
            deadline_window_secs: types::DEFAULT_DEADLINE_WINDOW,
        }
    }

    /// Overrides the contract-enforced transaction deadline window
    /// (default 600 seconds from submission).
    pub fn with_deadline_window(mut self, secs: u64) -> Self {
        self.deadline_window_secs = secs;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn voter(&self) -> Address {
        self.voter
    }

    pub fn voting_escrow(&self) -> Address {
        self.voting_escrow
    }

    pub fn distributor(&self) -> Address {
        self.distributor
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn gov_token(&self) -> Address {
        self.gov_token
    }

    pub fn legacy_token(&self) -> Address {
        self.legacy_token
    }

    pub fn redeemer(&self) -> Address {
        self.redeemer
    }

    /// Allow-listed intermediate tokens for two-hop swap routes.
    pub fn route_assets(&self) -> &[Address] {
        &self.route_assets
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    pub fn wrapped_native_symbol(&self) -> &str {
        &self.wrapped_native_symbol
    }

    pub fn deadline_window_secs(&self) -> u64 {
        self.deadline_window_secs
    }
}
