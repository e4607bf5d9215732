//! The session: command router plus per-command handlers.
//!
//! One [`Session`] covers one account against one [`Chain`] deployment.
//! Commands go in through [`Session::dispatch`], which routes each to
//! exactly one handler, spawns it and returns immediately; results come
//! back through [`crate::notify::Notifier`] events. Handlers of the
//! same command may run concurrently: there is no queueing and no
//! cancellation. A handler that fails logs the failure and emits
//! [`Event::Error`] with the message, except for the suppressed error
//! class, which is only logged.

mod liquidity;
mod rewards;
mod swap;
mod sync;
mod vest;

pub use vest::prepare_votes;

use std::sync::{Arc, Mutex};

use alloy::{
    primitives::{Address, U256},
    providers::DynProvider,
};
use futures::future::BoxFuture;
use tracing::warn;

use crate::{
    Chain,
    error::DexError,
    gateway::Gateway,
    notify::{Notifier, SubscriptionId},
    num::parse_fixed,
    orchestrator::Orchestrator,
    store::{Store, StoreDelta},
    types::{Asset, Command, Event, RouteAsset},
};

/// External index service: token lists, route assets with USD prices
/// and the pair index. Out-of-scope collaborator, injected; the
/// default [`NoIndex`] returns empty lists, so an unreachable index
/// degrades configuration instead of failing it.
pub trait IndexApi: Send + Sync {
    fn base_assets(&self) -> BoxFuture<'_, Result<Vec<Asset>, DexError>>;
    fn route_assets(&self) -> BoxFuture<'_, Result<Vec<RouteAsset>, DexError>>;
    fn pair_addresses(&self) -> BoxFuture<'_, Result<Vec<Address>, DexError>>;
}

/// Index stub used when no index service is configured.
pub struct NoIndex;

impl IndexApi for NoIndex {
    fn base_assets(&self) -> BoxFuture<'_, Result<Vec<Asset>, DexError>> {
        Box::pin(futures::future::ready(Ok(vec![])))
    }

    fn route_assets(&self) -> BoxFuture<'_, Result<Vec<RouteAsset>, DexError>> {
        Box::pin(futures::future::ready(Ok(vec![])))
    }

    fn pair_addresses(&self) -> BoxFuture<'_, Result<Vec<Address>, DexError>> {
        Box::pin(futures::future::ready(Ok(vec![])))
    }
}

/// Persisted list of user-added assets, injected. The default keeps
/// them in memory for the lifetime of the session.
pub trait AssetList: Send + Sync {
    fn load(&self) -> Vec<Asset>;
    fn save(&self, asset: &Asset);
}

#[derive(Default)]
pub struct MemoryAssetList {
    assets: Mutex<Vec<Asset>>,
}

impl AssetList for MemoryAssetList {
    fn load(&self) -> Vec<Asset> {
        self.assets.lock().expect("asset list poisoned").clone()
    }

    fn save(&self, asset: &Asset) {
        let mut assets = self.assets.lock().expect("asset list poisoned");
        if !assets.iter().any(|a| a.address == asset.address) {
            assets.push(asset.clone());
        }
    }
}

pub struct Session {
    provider: DynProvider,
    chain: Chain,
    notifier: Arc<Notifier>,
    store: Store,
    gateway: Gateway,
    orchestrator: Orchestrator,
    index_api: Arc<dyn IndexApi>,
    asset_list: Arc<dyn AssetList>,
}

impl Session {
    /// Builds a session over a wallet-capable provider. The provider
    /// must be able to sign and send transactions for `account`.
    pub fn new(provider: DynProvider, chain: Chain, account: Address) -> Self {
        let notifier = Arc::new(Notifier::new());
        Self {
            gateway: Gateway::new(provider.clone(), chain.clone(), account),
            orchestrator: Orchestrator::new(
                provider.clone(),
                Arc::clone(&notifier),
                chain.clone(),
                account,
            ),
            store: Store::new(Arc::clone(&notifier)),
            provider,
            notifier,
            chain,
            index_api: Arc::new(NoIndex),
            asset_list: Arc::new(MemoryAssetList::default()),
        }
    }

    pub fn with_index_api(mut self, index_api: Arc<dyn IndexApi>) -> Self {
        self.index_api = index_api;
        self
    }

    pub fn with_asset_list(mut self, asset_list: Arc<dyn AssetList>) -> Self {
        self.asset_list = asset_list;
        self
    }

    pub fn account(&self) -> Address {
        self.gateway.account()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id)
    }

    /// Routes a command to its handler and returns without awaiting it.
    /// Handler failures surface as [`Event::Error`]. Clone the `Arc` to
    /// keep dispatching.
    pub fn dispatch(self: Arc<Self>, command: Command) {
        let session = self;
        tokio::spawn(async move {
            let label = command_label(&command);
            if let Err(err) = session.handle(command).await {
                report_failure(&session.notifier, label, &err);
            }
        });
    }

    async fn handle(&self, command: Command) -> Result<(), DexError> {
        match command {
            Command::Configure => self.configure().await,
            Command::GetBalances => self.get_balances().await,
            Command::SearchAsset { address } => self.search_asset(address).await,
            Command::CreatePairAndStake(content) => self.create_pair(content, true).await,
            Command::CreatePairAndDeposit(content) => self.create_pair(content, false).await,
            Command::AddLiquidity(content) => self.add_liquidity(content, false).await,
            Command::AddLiquidityAndStake(content) => self.add_liquidity(content, true).await,
            Command::StakeLiquidity(content) => self.stake_liquidity(content).await,
            Command::UnstakeLiquidity(content) => self.unstake_liquidity(content).await,
            Command::QuoteAddLiquidity(content) => self.quote_add_liquidity(content).await,
            Command::GetLiquidityBalances { pair } => self.get_liquidity_balances(pair).await,
            Command::RemoveLiquidity(content) => self.remove_liquidity(content, false).await,
            Command::UnstakeAndRemoveLiquidity(content) => {
                self.remove_liquidity(content, true).await
            }
            Command::QuoteRemoveLiquidity(content) => self.quote_remove_liquidity(content).await,
            Command::CreateGauge { pair } => self.create_gauge(pair).await,
            Command::QuoteSwap(content) => self.quote_swap(content).await,
            Command::Swap(content) => self.swap(content).await,
            Command::WrapUnwrap(content) => self.wrap_unwrap(content).await,
            Command::Redeem { from_amount } => self.redeem(&from_amount).await,
            Command::GetVestNfts => self.get_vest_nfts().await,
            Command::CreateVest {
                amount,
                lock_duration,
            } => self.create_vest(&amount, lock_duration).await,
            Command::IncreaseVestAmount { token_id, amount } => {
                self.increase_vest_amount(token_id, &amount).await
            }
            Command::IncreaseVestDuration {
                token_id,
                lock_duration,
            } => self.increase_vest_duration(token_id, lock_duration).await,
            Command::WithdrawVest { token_id } => self.withdraw_vest(token_id).await,
            Command::Vote { token_id, votes } => self.vote(token_id, votes).await,
            Command::GetVestVotes { token_id } => self.get_vest_votes(token_id).await,
            Command::CreateBribe {
                pair,
                asset,
                amount,
            } => self.create_bribe(pair, asset, &amount).await,
            Command::GetVestBalances { token_id } => self.get_vest_balances(token_id).await,
            Command::GetRewardBalances { token_id } => self.get_reward_balances(token_id).await,
            Command::ClaimBribe { pair, token_id } => self.claim_bribe(pair, token_id).await,
            Command::ClaimReward { pair } => self.claim_reward(pair).await,
            Command::ClaimVeDist { token_id } => self.claim_ve_dist(token_id).await,
            Command::ClaimAllRewards { token_id } => self.claim_all_rewards(token_id).await,
        }
    }

    /// Scales a user-typed decimal amount to the asset's raw
    /// fixed-point integer. Zero and malformed amounts are invalid for
    /// every command that spends.
    fn raw_amount(asset: &Asset, amount: &str) -> Result<U256, DexError> {
        let raw = parse_fixed(amount, asset.decimals)
            .ok_or_else(|| DexError::InvalidRequest(format!("bad amount: {amount}")))?;
        if raw.is_zero() {
            return Err(DexError::InvalidRequest("amount is zero".to_string()));
        }
        Ok(raw)
    }

    /// Balance refresh run after a confirmed transaction chain. Errors
    /// here degrade to stale balances, never to a failed chain.
    async fn refresh_after_tx(&self) {
        let mut assets = self.store.base_assets();
        self.gateway.refresh_balances(&mut assets).await;
        self.store.merge(StoreDelta::base_assets(assets));
    }
}

/// Failure reporting for spawned handlers: always logged, surfaced as
/// an error event unless the error class is suppressed (spurious
/// method-not-found responses stay silent).
fn report_failure(notifier: &Notifier, command: &'static str, err: &DexError) {
    warn!(command, %err, "command failed");
    if !err.is_suppressed() {
        notifier.emit(Event::Error(err.to_string()));
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Configure => "configure",
        Command::GetBalances => "get_balances",
        Command::SearchAsset { .. } => "search_asset",
        Command::CreatePairAndStake(_) => "create_pair_and_stake",
        Command::CreatePairAndDeposit(_) => "create_pair_and_deposit",
        Command::AddLiquidity(_) => "add_liquidity",
        Command::AddLiquidityAndStake(_) => "add_liquidity_and_stake",
        Command::StakeLiquidity(_) => "stake_liquidity",
        Command::UnstakeLiquidity(_) => "unstake_liquidity",
        Command::QuoteAddLiquidity(_) => "quote_add_liquidity",
        Command::GetLiquidityBalances { .. } => "get_liquidity_balances",
        Command::RemoveLiquidity(_) => "remove_liquidity",
        Command::UnstakeAndRemoveLiquidity(_) => "unstake_and_remove_liquidity",
        Command::QuoteRemoveLiquidity(_) => "quote_remove_liquidity",
        Command::CreateGauge { .. } => "create_gauge",
        Command::QuoteSwap(_) => "quote_swap",
        Command::Swap(_) => "swap",
        Command::WrapUnwrap(_) => "wrap_unwrap",
        Command::Redeem { .. } => "redeem",
        Command::GetVestNfts => "get_vest_nfts",
        Command::CreateVest { .. } => "create_vest",
        Command::IncreaseVestAmount { .. } => "increase_vest_amount",
        Command::IncreaseVestDuration { .. } => "increase_vest_duration",
        Command::WithdrawVest { .. } => "withdraw_vest",
        Command::Vote { .. } => "vote",
        Command::GetVestVotes { .. } => "get_vest_votes",
        Command::CreateBribe { .. } => "create_bribe",
        Command::GetVestBalances { .. } => "get_vest_balances",
        Command::GetRewardBalances { .. } => "get_reward_balances",
        Command::ClaimBribe { .. } => "claim_bribe",
        Command::ClaimReward { .. } => "claim_reward",
        Command::ClaimVeDist { .. } => "claim_ve_dist",
        Command::ClaimAllRewards { .. } => "claim_all_rewards",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppressed_failures_emit_no_error_event() {
        let notifier = Notifier::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        notifier.subscribe(move |event| sink.lock().unwrap().push(format!("{event:?}")));

        report_failure(
            &notifier,
            "swap",
            &DexError::MethodNotFound("method not found".to_string()),
        );
        assert!(events.lock().unwrap().is_empty());

        report_failure(&notifier, "swap", &DexError::NoRoute);
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("Error"));
    }
}
