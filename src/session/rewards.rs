//! Bribe and reward handlers: bribe creation, claimable aggregation
//! and the claim family.

use alloy::primitives::{Address, U256};
use tracing::warn;

use super::Session;
use crate::{
    abi::{bribe, distributor, gauge},
    error::DexError,
    store::StoreDelta,
    types::{Asset, Event, Pair, Rewards, TokenId, TxQueue, TxStep, VeDistReward},
};

impl Session {
    /// Funds a new bribe stream on a pair's bribe contract.
    pub(super) async fn create_bribe(
        &self,
        pair: Address,
        asset: Asset,
        amount: &str,
    ) -> Result<(), DexError> {
        let stored = self.stored_pair(pair)?;
        let bribe_address = stored
            .gauge
            .as_ref()
            .map(|gauge| gauge.bribe_address)
            .filter(|address| *address != Address::ZERO)
            .ok_or_else(|| {
                DexError::InvalidRequest(format!("pair {pair} has no bribe contract"))
            })?;
        let raw = Self::raw_amount(&asset, amount)?;

        let allow = TxStep::new(format!("Checking your {} allowance", asset.symbol));
        let create = TxStep::new("Create bribe");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Create bribe on {}", stored.symbol),
            "Rewards",
            "Bribe Created",
            vec![allow.clone(), create.clone()],
        )));

        let allowance = self.gateway.allowance(asset.address, bribe_address).await?;
        self.orchestrator
            .ensure_allowance(
                allow.uuid(),
                &asset,
                bribe_address,
                "bribe contract",
                allowance,
                raw,
            )
            .await?;

        let instance = bribe::Bribe::new(bribe_address, self.provider.clone());
        self.orchestrator
            .submit(create.uuid(), instance.notifyRewardAmount(asset.address, raw))
            .await?;

        self.notifier.emit(Event::BribeCreated);
        self.refresh_after_tx().await;
        Ok(())
    }

    /// Aggregates everything claimable for one vote-escrow position:
    /// bribe streams with accrued amounts, gauges with earned emission,
    /// the claimable rebase distribution. Per-pair read failures drop
    /// that pair from the view.
    pub(super) async fn get_reward_balances(&self, token_id: TokenId) -> Result<(), DexError> {
        let snapshot = self.store.snapshot();
        let gov_decimals = self.gov_decimals();

        let mut bribes: Vec<Pair> = vec![];
        let mut rewards: Vec<Pair> = vec![];
        for pair in &snapshot.pairs {
            let Some(stored_gauge) = &pair.gauge else {
                continue;
            };

            if stored_gauge.bribe_address != Address::ZERO {
                let earned: Vec<_> = self
                    .gateway
                    .bribe_rewards(
                        stored_gauge.bribe_address,
                        token_id,
                        &snapshot.base_assets,
                        &snapshot.route_assets,
                    )
                    .await
                    .into_iter()
                    .filter(|reward| !reward.earned.is_zero())
                    .collect();
                if !earned.is_empty() {
                    let mut with_bribes = pair.clone();
                    if let Some(gauge) = &mut with_bribes.gauge {
                        gauge.bribes = earned;
                    }
                    bribes.push(with_bribes);
                }
            }

            match self
                .gateway
                .gauge_state(stored_gauge.address, pair.address)
                .await
            {
                Ok(state) if !state.rewards_earned.is_zero() => rewards.push(pair.clone()),
                Ok(_) => {}
                Err(err) => {
                    warn!(pair = %pair.address, %err, "gauge earned read failed, skipping pair")
                }
            }
        }

        let mut ve_dist = vec![];
        match futures::try_join!(
            self.gateway.claimable(token_id, gov_decimals),
            self.gateway.lock_state(token_id, gov_decimals),
        ) {
            Ok((claimable, lock)) if !claimable.is_zero() => {
                ve_dist.push(VeDistReward {
                    token_id,
                    lock_value: lock.voting_power,
                    claimable,
                });
            }
            Ok(_) => {}
            Err(err) => warn!(token_id, %err, "rebase claimable read failed, skipping"),
        }

        let rewards = Rewards {
            bribes,
            rewards,
            ve_dist,
        };
        self.store.merge(StoreDelta::rewards(rewards.clone()));
        self.notifier.emit(Event::RewardBalancesReturned(rewards));
        Ok(())
    }

    pub(super) async fn claim_bribe(
        &self,
        pair: Address,
        token_id: TokenId,
    ) -> Result<(), DexError> {
        let stored = self.stored_pair(pair)?;
        let (bribe_address, tokens) = bribe_claim_target(&stored)?;

        let step = TxStep::new("Claim your bribes");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Claim bribes on {}", stored.symbol),
            "Rewards",
            "Rewards Claimed",
            vec![step.clone()],
        )));

        let instance = bribe::Bribe::new(bribe_address, self.provider.clone());
        self.orchestrator
            .submit(
                step.uuid(),
                instance.getRewardForOwner(U256::from(token_id), tokens),
            )
            .await?;

        self.notifier.emit(Event::RewardClaimed);
        self.refresh_rewards(token_id).await;
        Ok(())
    }

    pub(super) async fn claim_reward(&self, pair: Address) -> Result<(), DexError> {
        let stored = self.stored_pair(pair)?;
        let gauge_address = stored
            .gauge
            .as_ref()
            .map(|gauge| gauge.address)
            .ok_or_else(|| DexError::InvalidRequest(format!("pair {pair} has no gauge")))?;

        let step = TxStep::new("Claim your rewards");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Claim rewards on {}", stored.symbol),
            "Rewards",
            "Rewards Claimed",
            vec![step.clone()],
        )));

        let instance = gauge::Gauge::new(gauge_address, self.provider.clone());
        self.orchestrator
            .submit(
                step.uuid(),
                instance.getReward(self.gateway.account(), vec![self.chain.gov_token()]),
            )
            .await?;

        self.notifier.emit(Event::RewardClaimed);
        self.refresh_after_tx().await;
        Ok(())
    }

    pub(super) async fn claim_ve_dist(&self, token_id: TokenId) -> Result<(), DexError> {
        let step = TxStep::new("Claim your distribution");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Claim distribution for #{token_id}"),
            "Rewards",
            "Rewards Claimed",
            vec![step.clone()],
        )));

        let instance = distributor::Distributor::new(self.chain.distributor(), self.provider.clone());
        self.orchestrator
            .submit(step.uuid(), instance.claim(U256::from(token_id)))
            .await?;

        self.notifier.emit(Event::RewardClaimed);
        self.refresh_rewards(token_id).await;
        Ok(())
    }

    /// Claims everything in the cached reward view as one sequential
    /// chain: bribes first, then gauge emissions, then the rebase
    /// distribution. A step failure halts the remainder of the chain.
    pub(super) async fn claim_all_rewards(&self, token_id: TokenId) -> Result<(), DexError> {
        let rewards = self.store.snapshot().rewards;
        if rewards.bribes.is_empty() && rewards.rewards.is_empty() && rewards.ve_dist.is_empty() {
            return Err(DexError::InvalidRequest("nothing to claim".to_string()));
        }

        let bribe_steps: Vec<TxStep> = rewards
            .bribes
            .iter()
            .map(|pair| TxStep::new(format!("Claim bribes on {}", pair.symbol)))
            .collect();
        let reward_steps: Vec<TxStep> = rewards
            .rewards
            .iter()
            .map(|pair| TxStep::new(format!("Claim rewards on {}", pair.symbol)))
            .collect();
        let dist_step = (!rewards.ve_dist.is_empty())
            .then(|| TxStep::new("Claim your distribution"));

        let mut steps: Vec<TxStep> = bribe_steps.iter().chain(&reward_steps).cloned().collect();
        if let Some(step) = &dist_step {
            steps.push(step.clone());
        }
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            "Claim all rewards",
            "Rewards",
            "Rewards Claimed",
            steps,
        )));

        for (pair, step) in rewards.bribes.iter().zip(&bribe_steps) {
            let (bribe_address, tokens) = bribe_claim_target(pair)?;
            let instance = bribe::Bribe::new(bribe_address, self.provider.clone());
            self.orchestrator
                .submit(
                    step.uuid(),
                    instance.getRewardForOwner(U256::from(token_id), tokens),
                )
                .await?;
        }

        for (pair, step) in rewards.rewards.iter().zip(&reward_steps) {
            let gauge_address = pair
                .gauge
                .as_ref()
                .map(|gauge| gauge.address)
                .ok_or_else(|| {
                    DexError::InvalidRequest(format!("pair {} has no gauge", pair.address))
                })?;
            let instance = gauge::Gauge::new(gauge_address, self.provider.clone());
            self.orchestrator
                .submit(
                    step.uuid(),
                    instance.getReward(self.gateway.account(), vec![self.chain.gov_token()]),
                )
                .await?;
        }

        if let Some(step) = &dist_step {
            let instance =
                distributor::Distributor::new(self.chain.distributor(), self.provider.clone());
            self.orchestrator
                .submit(step.uuid(), instance.claim(U256::from(token_id)))
                .await?;
        }

        self.notifier.emit(Event::RewardClaimed);
        self.refresh_after_tx().await;
        self.refresh_rewards(token_id).await;
        Ok(())
    }

    /// Post-claim reward view refresh; failure keeps the stale view.
    async fn refresh_rewards(&self, token_id: TokenId) {
        if let Err(err) = self.get_reward_balances(token_id).await {
            warn!(token_id, %err, "reward refresh after claim failed");
        }
    }
}

/// Bribe contract plus the reward token addresses to claim from it.
fn bribe_claim_target(pair: &Pair) -> Result<(Address, Vec<Address>), DexError> {
    let gauge = pair.gauge.as_ref().ok_or_else(|| {
        DexError::InvalidRequest(format!("pair {} has no gauge", pair.address))
    })?;
    if gauge.bribe_address == Address::ZERO {
        return Err(DexError::InvalidRequest(format!(
            "pair {} has no bribe contract",
            pair.address
        )));
    }
    let tokens: Vec<Address> = gauge
        .bribes
        .iter()
        .map(|reward| reward.token.address)
        .collect();
    if tokens.is_empty() {
        return Err(DexError::InvalidRequest(format!(
            "no bribe reward streams on pair {}",
            pair.address
        )));
    }
    Ok((gauge.bribe_address, tokens))
}
