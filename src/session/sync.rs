//! Configuration and cache refresh: token lists, pair index, balances.

use alloy::primitives::Address;
use fastnum::{D256, UD256};
use tracing::warn;

use super::Session;
use crate::{
    Chain,
    error::DexError,
    num::Converter,
    store::StoreDelta,
    types::{Asset, Event, Gauge, NATIVE_ADDRESS, Pair, ProtocolMetrics, RouteAsset},
};

fn native_asset(chain: &Chain) -> Asset {
    Asset {
        address: NATIVE_ADDRESS,
        symbol: chain.native_symbol().to_string(),
        name: format!("{} (native)", chain.native_symbol()),
        decimals: 18,
        balance: UD256::ZERO,
        whitelisted: true,
        local: false,
    }
}

impl Session {
    /// Loads everything the session needs into the cache: governance
    /// and vote-escrow token metadata, route assets and token list from
    /// the index service (best effort), the pair index, protocol
    /// metrics. Emits `Configured`, then chains a balance refresh.
    pub(super) async fn configure(&self) -> Result<(), DexError> {
        let gov_token = self.gateway.token_metadata(self.chain.gov_token()).await?;
        let ve_token = Asset {
            address: self.chain.voting_escrow(),
            symbol: format!("ve{}", gov_token.symbol),
            name: format!("Vested {}", gov_token.name),
            decimals: gov_token.decimals,
            balance: UD256::ZERO,
            whitelisted: true,
            local: false,
        };

        let route_assets = self.index_api.route_assets().await.unwrap_or_else(|err| {
            warn!(%err, "route asset fetch failed, continuing without");
            vec![]
        });

        let mut base_assets = vec![native_asset(&self.chain)];
        match self.index_api.base_assets().await {
            Ok(listed) => {
                for asset in listed {
                    if !base_assets.iter().any(|a| a.address == asset.address) {
                        base_assets.push(asset);
                    }
                }
            }
            Err(err) => warn!(%err, "token list fetch failed, continuing without"),
        }
        for asset in self.asset_list.load() {
            if !base_assets.iter().any(|a| a.address == asset.address) {
                base_assets.push(asset);
            }
        }
        if !base_assets.iter().any(|a| a.address == gov_token.address) {
            base_assets.push(gov_token.clone());
        }
        self.gateway.refresh_balances(&mut base_assets).await;

        let metrics = self.load_metrics(gov_token.decimals).await;

        let pair_addresses = self.index_api.pair_addresses().await.unwrap_or_else(|err| {
            warn!(%err, "pair index fetch failed, continuing without");
            vec![]
        });
        let pairs = self
            .load_pairs(&pair_addresses, &base_assets, &route_assets, metrics.total_weight)
            .await;

        self.store.merge(StoreDelta {
            base_assets: Some(base_assets),
            route_assets: Some(route_assets),
            pairs: Some(pairs),
            gov_token: Some(gov_token),
            ve_token: Some(ve_token),
            metrics: Some(metrics),
            ..Default::default()
        });
        self.notifier.emit(Event::Configured);

        // Chained balance refresh; its failure does not undo
        // configuration
        if let Err(err) = self.get_balances().await {
            warn!(%err, "post-configure balance refresh failed");
            self.notifier.emit(Event::Error(err.to_string()));
        }
        Ok(())
    }

    /// Full refresh of everything balance-like: asset balances, pair
    /// and gauge state, vest positions, protocol metrics. Partial
    /// failures degrade to stale or default values.
    pub(super) async fn get_balances(&self) -> Result<(), DexError> {
        let mut assets = self.store.base_assets();
        self.gateway.refresh_balances(&mut assets).await;
        self.notifier.emit(Event::BaseAssetsUpdated(assets.clone()));

        let snapshot = self.store.snapshot();
        let gov_decimals = self.gov_decimals();
        let metrics = self.load_metrics(gov_decimals).await;

        let pair_addresses: Vec<Address> =
            snapshot.pairs.iter().map(|pair| pair.address).collect();
        let pairs = self
            .load_pairs(
                &pair_addresses,
                &assets,
                &snapshot.route_assets,
                metrics.total_weight,
            )
            .await;

        let vest_nfts = match self.gateway.vest_nfts(gov_decimals).await {
            Ok(nfts) => Some(nfts),
            Err(err) => {
                warn!(%err, "vest position refresh failed, keeping stale positions");
                None
            }
        };

        self.store.merge(StoreDelta {
            base_assets: Some(assets),
            pairs: Some(pairs),
            vest_nfts,
            metrics: Some(metrics),
            ..Default::default()
        });
        Ok(())
    }

    /// Asset lookup by address: cache hit first, on-chain ERC-20
    /// metadata otherwise. Found assets are saved to the user-added
    /// list and appended to the cache.
    pub(super) async fn search_asset(&self, address: Address) -> Result<(), DexError> {
        if let Some(asset) = self.store.snapshot().asset(address) {
            self.notifier.emit(Event::AssetSearched(asset.clone()));
            return Ok(());
        }

        let asset = self.gateway.token_metadata(address).await?;
        self.asset_list.save(&asset);

        let mut base_assets = self.store.base_assets();
        base_assets.push(asset.clone());
        self.store.merge(StoreDelta::base_assets(base_assets));

        self.notifier.emit(Event::AssetSearched(asset));
        Ok(())
    }

    /// Refreshes a single pair in place.
    pub(super) async fn get_liquidity_balances(&self, address: Address) -> Result<(), DexError> {
        let snapshot = self.store.snapshot();
        let pair = self
            .load_pair(
                address,
                &snapshot.base_assets,
                &snapshot.route_assets,
                snapshot.metrics.total_weight,
            )
            .await?;

        let mut pairs = snapshot.pairs;
        match pairs.iter_mut().find(|p| p.address == address) {
            Some(existing) => *existing = pair,
            None => pairs.push(pair),
        }
        self.store.merge(StoreDelta::pairs(pairs));
        Ok(())
    }

    pub(super) fn gov_decimals(&self) -> u8 {
        self.store
            .snapshot()
            .gov_token
            .as_ref()
            .map(|asset| asset.decimals)
            .unwrap_or(18)
    }

    async fn load_metrics(&self, gov_decimals: u8) -> ProtocolMetrics {
        let total_weight = self
            .gateway
            .total_weight(gov_decimals)
            .await
            .unwrap_or_else(|err| {
                warn!(%err, "total weight read failed, defaulting to zero");
                D256::ZERO
            });
        let ve_total_supply = self
            .gateway
            .ve_total_supply(gov_decimals)
            .await
            .unwrap_or_else(|err| {
                warn!(%err, "ve total supply read failed, defaulting to zero");
                UD256::ZERO
            });
        ProtocolMetrics {
            total_weight,
            ve_total_supply,
        }
    }

    async fn load_pairs(
        &self,
        addresses: &[Address],
        known_assets: &[Asset],
        route_assets: &[RouteAsset],
        total_weight: D256,
    ) -> Vec<Pair> {
        let loads = addresses
            .iter()
            .map(|address| self.load_pair(*address, known_assets, route_assets, total_weight));
        futures::future::join_all(loads)
            .await
            .into_iter()
            .zip(addresses)
            .filter_map(|(result, address)| match result {
                Ok(pair) => Some(pair),
                Err(err) => {
                    warn!(%address, %err, "pair load failed, dropping from refresh");
                    None
                }
            })
            .collect()
    }

    /// Builds the full domain view of one pair: on-chain state, token
    /// resolution, attached gauge with its vote weight and bribe
    /// streams.
    pub(super) async fn load_pair(
        &self,
        address: Address,
        known_assets: &[Asset],
        route_assets: &[RouteAsset],
        total_weight: D256,
    ) -> Result<Pair, DexError> {
        let state = self.gateway.pair_state(address).await?;
        let token0 = self.resolve_asset(state.token0, known_assets).await?;
        let token1 = self.resolve_asset(state.token1, known_assets).await?;

        let converter0 = Converter::new(token0.decimals);
        let converter1 = Converter::new(token1.decimals);
        let pair_converter = Converter::new(state.decimals);
        let reserve0 = converter0.from_unsigned(state.reserve0);
        let reserve1 = converter1.from_unsigned(state.reserve1);
        let total_supply = pair_converter.from_unsigned(state.total_supply);

        let gauge = match self.gateway.gauge_address(address).await? {
            gauge_address if gauge_address == Address::ZERO => None,
            gauge_address => Some(
                self.load_gauge(
                    gauge_address,
                    address,
                    reserve0,
                    reserve1,
                    total_supply,
                    known_assets,
                    route_assets,
                    total_weight,
                )
                .await?,
            ),
        };

        Ok(Pair {
            address,
            symbol: state.symbol,
            decimals: state.decimals,
            token0,
            token1,
            stable: state.stable,
            reserve0,
            reserve1,
            total_supply,
            balance: pair_converter.from_unsigned(state.balance),
            gauge,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn load_gauge(
        &self,
        gauge_address: Address,
        pair_address: Address,
        pair_reserve0: UD256,
        pair_reserve1: UD256,
        pair_total_supply: UD256,
        known_assets: &[Asset],
        route_assets: &[RouteAsset],
        total_weight: D256,
    ) -> Result<Gauge, DexError> {
        let state = self.gateway.gauge_state(gauge_address, pair_address).await?;
        let bribe_address = self.gateway.bribe_address(gauge_address).await?;

        let gov_decimals = self.gov_decimals();
        let gov_converter = Converter::new(gov_decimals);
        let lp_converter = Converter::new(18);
        let total_supply: UD256 = lp_converter.from_unsigned(state.total_supply);

        // Reserves attributed to the staked share of the pool
        let staked_ratio = if pair_total_supply.is_zero() {
            UD256::ZERO
        } else {
            total_supply / pair_total_supply
        };

        let weight: D256 = gov_converter.from_signed(state.weight);
        let weight_percent = if total_weight.is_zero() {
            D256::ZERO
        } else {
            weight / total_weight * D256::from(100)
        };

        let bribes = if bribe_address == Address::ZERO {
            vec![]
        } else {
            // Refresh cycles read bribe accrual against position 0;
            // reward queries re-read with the caller's actual position
            self.gateway
                .bribe_rewards(bribe_address, 0, known_assets, route_assets)
                .await
        };

        Ok(Gauge {
            address: gauge_address,
            bribe_address,
            balance: lp_converter.from_unsigned(state.balance),
            total_supply,
            reserve0: pair_reserve0 * staked_ratio,
            reserve1: pair_reserve1 * staked_ratio,
            weight,
            weight_percent,
            rewards_earned: gov_converter.from_unsigned(state.rewards_earned),
            bribes,
        })
    }

    async fn resolve_asset(
        &self,
        address: Address,
        known_assets: &[Asset],
    ) -> Result<Asset, DexError> {
        match known_assets.iter().find(|a| a.address == address) {
            Some(asset) => Ok(asset.clone()),
            None => self.gateway.token_metadata(address).await,
        }
    }
}
