//! Ledger read gateway: all contract reads come through here.
//!
//! Raw integer results are normalized to decimal-scaled domain values
//! (divide by `10^decimals`, then format) before they leave this
//! module. Independent reads against the same state are batched via
//! multicall where possible; a single failing read never aborts its
//! siblings: it is logged and substituted with a safe default (zero
//! balance, empty list) so a partial failure degrades the refresh
//! instead of killing it.

use alloy::{
    primitives::{Address, I256, U256},
    providers::{DynProvider, Provider},
};
use fastnum::{D256, UD256};
use itertools::Itertools;
use tracing::warn;

use crate::{
    Chain,
    abi::{bribe, distributor, erc20, factory, gauge, pair, router, voter, voting_escrow},
    error::DexError,
    num::Converter,
    types::{Asset, BribeReward, NATIVE_ADDRESS, RouteAsset, TokenId, VestNft},
};

/// Vote-escrow lock state, decimal-scaled.
#[derive(Clone, Copy, Debug)]
pub struct LockState {
    pub amount: UD256,
    pub end: u64,
    pub voting_power: UD256,
}

/// Raw pair state used to build or refresh a [`crate::types::Pair`].
#[derive(Clone, Debug)]
pub struct PairOnChain {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub stable: bool,
    pub symbol: String,
    pub decimals: u8,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_supply: U256,
    pub balance: U256,
}

/// Per-caller gauge state, raw.
#[derive(Clone, Debug)]
pub struct GaugeOnChain {
    pub address: Address,
    pub balance: U256,
    pub total_supply: U256,
    pub weight: I256,
    pub rewards_earned: U256,
}

pub struct Gateway {
    provider: DynProvider,
    chain: Chain,
    account: Address,
}

impl Gateway {
    pub fn new(provider: DynProvider, chain: Chain, account: Address) -> Self {
        Self {
            provider,
            chain,
            account,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// ERC-20 metadata for an unknown token address.
    pub async fn token_metadata(&self, address: Address) -> Result<Asset, DexError> {
        let token = erc20::Erc20::new(address, self.provider.clone());
        let symbol_call = token.symbol();
        let name_call = token.name();
        let decimals_call = token.decimals();
        let balance_call = token.balanceOf(self.account);
        let (symbol, name, decimals, balance) = futures::try_join!(
            symbol_call.call().into_future(),
            name_call.call().into_future(),
            decimals_call.call().into_future(),
            balance_call.call().into_future(),
        )
        .map_err(DexError::from)?;

        let voter = voter::Voter::new(self.chain.voter(), self.provider.clone());
        // Whitelist status is cosmetic; default to false if the read fails
        let whitelisted = voter
            .isWhitelisted(address)
            .call()
            .await
            .unwrap_or_else(|err| {
                warn!(%address, %err, "whitelist check failed, assuming false");
                false
            });

        Ok(Asset {
            address,
            symbol,
            name,
            decimals,
            balance: Converter::new(decimals).from_unsigned(balance),
            whitelisted,
            local: true,
        })
    }

    /// Refreshes balances for every asset in place. The native sentinel
    /// reads the account's chain balance; ERC-20s go out as one
    /// multicall batch. A failing item keeps its previous balance.
    pub async fn refresh_balances(&self, assets: &mut [Asset]) {
        let erc20_idx: Vec<usize> = assets
            .iter()
            .positions(|a| !a.is_native())
            .collect::<Vec<_>>();

        if erc20_idx.len() > 1 {
            let tokens = erc20_idx
                .iter()
                .map(|i| erc20::Erc20::new(assets[*i].address, self.provider.clone()))
                .collect::<Vec<_>>();
            let multicall = self.provider.multicall().dynamic().extend(
                tokens
                    .iter()
                    .map(|token| token.balanceOf(self.account))
                    .collect::<Vec<_>>(),
            );
            match multicall.try_aggregate(false).await {
                Ok(results) => {
                    for (i, result) in erc20_idx.iter().zip(results) {
                        match result {
                            Ok(raw) => {
                                assets[*i].balance =
                                    Converter::new(assets[*i].decimals).from_unsigned(raw);
                            }
                            Err(err) => {
                                warn!(address = %assets[*i].address, ?err, "balance read failed");
                            }
                        }
                    }
                }
                Err(err) => warn!(%err, "balance multicall failed, keeping stale balances"),
            }
        } else if let Some(i) = erc20_idx.first() {
            // Single read: no point in a batch round trip
            let token = erc20::Erc20::new(assets[*i].address, self.provider.clone());
            match token.balanceOf(self.account).call().await {
                Ok(raw) => {
                    assets[*i].balance = Converter::new(assets[*i].decimals).from_unsigned(raw);
                }
                Err(err) => warn!(address = %assets[*i].address, %err, "balance read failed"),
            }
        }

        if let Some(native) = assets.iter_mut().find(|a| a.is_native()) {
            match self.provider.get_balance(self.account).await {
                Ok(raw) => native.balance = Converter::new(native.decimals).from_unsigned(raw),
                Err(err) => warn!(%err, "native balance read failed"),
            }
        }
    }

    /// Current allowance granted by the session account to `spender`.
    /// The native sentinel needs no approval and reports `U256::MAX`.
    pub async fn allowance(&self, token: Address, spender: Address) -> Result<U256, DexError> {
        if token == NATIVE_ADDRESS {
            return Ok(U256::MAX);
        }
        erc20::Erc20::new(token, self.provider.clone())
            .allowance(self.account, spender)
            .call()
            .await
            .map_err(DexError::from)
    }

    /// Canonical pair address for a token pair + stability, zero when
    /// the pair does not exist yet.
    pub async fn pair_address(
        &self,
        token_a: Address,
        token_b: Address,
        stable: bool,
    ) -> Result<Address, DexError> {
        factory::PairFactory::new(self.chain.factory(), self.provider.clone())
            .getPair(token_a, token_b, stable)
            .call()
            .await
            .map_err(DexError::from)
    }

    /// Full pair state at its canonical address.
    pub async fn pair_state(&self, address: Address) -> Result<PairOnChain, DexError> {
        let instance = pair::Pair::new(address, self.provider.clone());
        let token0_call = instance.token0();
        let token1_call = instance.token1();
        let stable_call = instance.stable();
        let symbol_call = instance.symbol();
        let decimals_call = instance.decimals();
        let reserves_call = instance.getReserves();
        let total_supply_call = instance.totalSupply();
        let balance_call = instance.balanceOf(self.account);
        let (token0, token1, stable, symbol, decimals, reserves, total_supply, balance) =
            futures::try_join!(
                token0_call.call().into_future(),
                token1_call.call().into_future(),
                stable_call.call().into_future(),
                symbol_call.call().into_future(),
                decimals_call.call().into_future(),
                reserves_call.call().into_future(),
                total_supply_call.call().into_future(),
                balance_call.call().into_future(),
            )
            .map_err(DexError::from)?;

        Ok(PairOnChain {
            address,
            token0,
            token1,
            stable,
            symbol,
            decimals,
            reserve0: reserves.reserve0,
            reserve1: reserves.reserve1,
            total_supply,
            balance,
        })
    }

    /// Gauge address attached to a pair, zero when none exists.
    pub async fn gauge_address(&self, pair: Address) -> Result<Address, DexError> {
        voter::Voter::new(self.chain.voter(), self.provider.clone())
            .gauges(pair)
            .call()
            .await
            .map_err(DexError::from)
    }

    /// Bribe contract attached to a gauge.
    pub async fn bribe_address(&self, gauge: Address) -> Result<Address, DexError> {
        voter::Voter::new(self.chain.voter(), self.provider.clone())
            .bribes(gauge)
            .call()
            .await
            .map_err(DexError::from)
    }

    /// Total vote-escrow supply, decimal-scaled.
    pub async fn ve_total_supply(&self, gov_decimals: u8) -> Result<UD256, DexError> {
        let raw = voting_escrow::VotingEscrow::new(self.chain.voting_escrow(), self.provider.clone())
            .totalSupply()
            .call()
            .await
            .map_err(DexError::from)?;
        Ok(Converter::new(gov_decimals).from_unsigned(raw))
    }

    /// Per-caller gauge state plus the pair's voting weight.
    pub async fn gauge_state(
        &self,
        gauge_address: Address,
        pair_address: Address,
    ) -> Result<GaugeOnChain, DexError> {
        let instance = gauge::Gauge::new(gauge_address, self.provider.clone());
        let voter_instance = voter::Voter::new(self.chain.voter(), self.provider.clone());
        let balance_call = instance.balanceOf(self.account);
        let total_supply_call = instance.totalSupply();
        let weight_call = voter_instance.weights(pair_address);
        let earned_call = instance.earned(self.chain.gov_token(), self.account);
        let (balance, total_supply, weight, rewards_earned) = futures::try_join!(
            balance_call.call().into_future(),
            total_supply_call.call().into_future(),
            weight_call.call().into_future(),
            earned_call.call().into_future(),
        )
        .map_err(DexError::from)?;

        Ok(GaugeOnChain {
            address: gauge_address,
            balance,
            total_supply,
            weight,
            rewards_earned,
        })
    }

    /// Bribe contract reward streams for one vote-escrow position.
    /// Reward tokens are resolved against the known asset list; unknown
    /// tokens fall back to on-chain metadata. Failing items are
    /// dropped, not fatal.
    pub async fn bribe_rewards(
        &self,
        bribe_address: Address,
        token_id: TokenId,
        known_assets: &[Asset],
        route_assets: &[RouteAsset],
    ) -> Vec<BribeReward> {
        let instance = bribe::Bribe::new(bribe_address, self.provider.clone());
        let length: usize = match instance.rewardsListLength().call().await {
            Ok(len) => len.to(),
            Err(err) => {
                warn!(%bribe_address, %err, "bribe rewards list length read failed");
                return vec![];
            }
        };

        let mut rewards = Vec::with_capacity(length);
        for index in 0..length {
            match self
                .bribe_reward_at(&instance, index, token_id, known_assets, route_assets)
                .await
            {
                Ok(reward) => rewards.push(reward),
                Err(err) => {
                    warn!(%bribe_address, index, %err, "bribe reward read failed, skipping")
                }
            }
        }
        rewards
    }

    async fn bribe_reward_at(
        &self,
        instance: &bribe::Bribe::BribeInstance<DynProvider>,
        index: usize,
        token_id: TokenId,
        known_assets: &[Asset],
        route_assets: &[RouteAsset],
    ) -> Result<BribeReward, DexError> {
        let token_address = instance.rewards(U256::from(index)).call().await?;
        let token = match known_assets.iter().find(|a| a.address == token_address) {
            Some(asset) => asset.clone(),
            None => self.token_metadata(token_address).await?,
        };

        let reward_rate_call = instance.rewardRate(token_address);
        let earned_call = instance.earned(token_address, U256::from(token_id));
        let (reward_rate, earned) = futures::try_join!(
            reward_rate_call.call().into_future(),
            earned_call.call().into_future(),
        )
        .map_err(DexError::from)?;

        let converter = Converter::new(token.decimals);
        let earned: UD256 = converter.from_unsigned(earned);
        let price = route_assets
            .iter()
            .find(|r| r.address == token_address)
            .map(|r| r.price)
            .unwrap_or_default();
        // f64 is fine here: the USD figure is display-only
        let usd_value = earned.to_string().parse::<f64>().unwrap_or_default() * price;

        Ok(BribeReward {
            token,
            reward_rate: converter.from_unsigned(reward_rate),
            earned,
            usd_value,
        })
    }

    /// All vote-escrow positions owned by the session account.
    pub async fn vest_nfts(&self, gov_decimals: u8) -> Result<Vec<VestNft>, DexError> {
        let instance =
            voting_escrow::VotingEscrow::new(self.chain.voting_escrow(), self.provider.clone());
        let count: usize = instance
            .balanceOf(self.account)
            .call()
            .await
            .map_err(DexError::from)?
            .to();

        if count == 0 {
            return Ok(vec![]);
        }

        let ids: Vec<U256> = if count > 1 {
            self.provider
                .multicall()
                .dynamic()
                .extend(
                    (0..count)
                        .map(|i| instance.tokenOfOwnerByIndex(self.account, U256::from(i)))
                        .collect::<Vec<_>>(),
                )
                .aggregate()
                .await
                .map_err(DexError::from)?
        } else {
            vec![
                instance
                    .tokenOfOwnerByIndex(self.account, U256::ZERO)
                    .call()
                    .await
                    .map_err(DexError::from)?,
            ]
        };

        let gov_converter = Converter::new(gov_decimals);
        let nft_futs = ids.iter().map(|id| async {
            let locked_call = instance.locked(*id);
            let voting_power_call = instance.balanceOfNFT(*id);
            let (locked, voting_power) = futures::try_join!(
                locked_call.call().into_future(),
                voting_power_call.call().into_future(),
            )?;
            Ok::<_, alloy::contract::Error>(VestNft {
                id: id.to(),
                lock_ends: locked.end.to(),
                lock_amount: gov_converter.from_unsigned(U256::from(locked.amount.unsigned_abs())),
                lock_value: gov_converter.from_unsigned(voting_power),
            })
        });

        futures::future::try_join_all(nft_futs)
            .await
            .map_err(DexError::from)
    }

    /// Lock state of a single position.
    pub async fn lock_state(
        &self,
        token_id: TokenId,
        gov_decimals: u8,
    ) -> Result<LockState, DexError> {
        let instance =
            voting_escrow::VotingEscrow::new(self.chain.voting_escrow(), self.provider.clone());
        let id = U256::from(token_id);
        let locked_call = instance.locked(id);
        let voting_power_call = instance.balanceOfNFT(id);
        let (locked, voting_power) = futures::try_join!(
            locked_call.call().into_future(),
            voting_power_call.call().into_future(),
        )
        .map_err(DexError::from)?;

        let converter = Converter::new(gov_decimals);
        Ok(LockState {
            amount: converter.from_unsigned(U256::from(locked.amount.unsigned_abs())),
            end: locked.end.to(),
            voting_power: converter.from_unsigned(voting_power),
        })
    }

    /// Raw vote weights of one position across the given pairs, one
    /// multicall. Failing items read as zero.
    pub async fn votes(&self, token_id: TokenId, pairs: &[Address]) -> Vec<I256> {
        if pairs.is_empty() {
            return vec![];
        }
        let instance = voter::Voter::new(self.chain.voter(), self.provider.clone());
        let id = U256::from(token_id);

        if pairs.len() == 1 {
            return vec![instance.votes(id, pairs[0]).call().await.unwrap_or_else(|err| {
                warn!(pair = %pairs[0], %err, "vote read failed, defaulting to zero");
                I256::ZERO
            })];
        }

        let multicall = self.provider.multicall().dynamic().extend(
            pairs
                .iter()
                .map(|pair| instance.votes(id, *pair))
                .collect::<Vec<_>>(),
        );
        match multicall.try_aggregate(false).await {
            Ok(results) => results
                .into_iter()
                .zip(pairs)
                .map(|(result, pair)| {
                    result.unwrap_or_else(|err| {
                        warn!(%pair, ?err, "vote read failed, defaulting to zero");
                        I256::ZERO
                    })
                })
                .collect(),
            Err(err) => {
                warn!(%err, "votes multicall failed, defaulting to zero");
                vec![I256::ZERO; pairs.len()]
            }
        }
    }

    /// Total voting weight across all pairs.
    pub async fn total_weight(&self, gov_decimals: u8) -> Result<D256, DexError> {
        let weight = voter::Voter::new(self.chain.voter(), self.provider.clone())
            .totalWeight()
            .call()
            .await
            .map_err(DexError::from)?;
        Ok(Converter::new(gov_decimals).from_signed(weight))
    }

    /// Claimable rebase distribution for one position.
    pub async fn claimable(&self, token_id: TokenId, gov_decimals: u8) -> Result<UD256, DexError> {
        let raw = distributor::Distributor::new(self.chain.distributor(), self.provider.clone())
            .claimable(U256::from(token_id))
            .call()
            .await
            .map_err(DexError::from)?;
        Ok(Converter::new(gov_decimals).from_unsigned(raw))
    }

    /// Output amounts for a batch of candidate routes, one multicall.
    /// A failed or empty candidate yields `None` (zero liquidity or
    /// nonexistent pools are expected, not errors).
    pub async fn amounts_out(
        &self,
        amount_in: U256,
        candidates: &[Vec<router::Router::Route>],
    ) -> Result<Vec<Option<Vec<U256>>>, DexError> {
        let instance = router::Router::new(self.chain.router(), self.provider.clone());

        if candidates.len() == 1 {
            return Ok(vec![
                instance
                    .getAmountsOut(amount_in, candidates[0].clone())
                    .call()
                    .await
                    .ok(),
            ]);
        }

        let multicall = self.provider.multicall().dynamic().extend(
            candidates
                .iter()
                .map(|routes| instance.getAmountsOut(amount_in, routes.clone()))
                .collect::<Vec<_>>(),
        );
        let results = multicall
            .try_aggregate(false)
            .await
            .map_err(DexError::from)?;
        Ok(results.into_iter().map(|r| r.ok()).collect())
    }

    /// Pool reserves for one route leg, ordered (from, to).
    pub async fn leg_reserves(
        &self,
        from: Address,
        to: Address,
        stable: bool,
    ) -> Result<(U256, U256), DexError> {
        let reserves = router::Router::new(self.chain.router(), self.provider.clone())
            .getReserves(from, to, stable)
            .call()
            .await
            .map_err(DexError::from)?;
        Ok((reserves.reserveA, reserves.reserveB))
    }
}
