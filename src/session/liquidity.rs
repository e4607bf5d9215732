//! Liquidity handlers: pair creation, deposit, withdrawal, gauge
//! staking and the add/remove quotes.

use alloy::primitives::{Address, TxHash, U256};
use tracing::warn;

use super::Session;
use crate::{
    abi::{gauge, pair as pair_abi, router, voter},
    error::DexError,
    num::{Converter, parse_fixed},
    orchestrator::{join_independent, min_after_slippage},
    quote::{AddLiquidityQuote, RemoveLiquidityQuote},
    types::{
        Asset, CreatePair, AddLiquidity, Event, Pair, QuoteAddLiquidity, QuoteRemoveLiquidity,
        RemoveLiquidity, StakeLiquidity, TokenId, TxQueue, TxStep,
    },
};

/// The pool-share token of a pair, viewed as an asset for allowance
/// handling.
fn lp_asset(pair: &Pair) -> Asset {
    Asset {
        address: pair.address,
        symbol: pair.symbol.clone(),
        name: pair.symbol.clone(),
        decimals: pair.decimals,
        balance: pair.balance,
        whitelisted: true,
        local: false,
    }
}

/// Router entrypoint plan for a two-sided deposit. A native side routes
/// through the ETH-style variant with its amount as call value; the
/// token arguments are flipped accordingly when the native asset is
/// token1.
#[derive(Clone, Debug, PartialEq, Eq)]
enum DepositCall {
    Eth {
        token: Address,
        token_desired: U256,
        token_min: U256,
        native_value: U256,
        native_min: U256,
    },
    Plain {
        token0: Address,
        token1: Address,
        desired0: U256,
        desired1: U256,
        min0: U256,
        min1: U256,
    },
}

fn deposit_call(
    token0: &Asset,
    token1: &Asset,
    raw0: U256,
    raw1: U256,
    min0: U256,
    min1: U256,
) -> DepositCall {
    if token0.is_native() {
        DepositCall::Eth {
            token: token1.address,
            token_desired: raw1,
            token_min: min1,
            native_value: raw0,
            native_min: min0,
        }
    } else if token1.is_native() {
        DepositCall::Eth {
            token: token0.address,
            token_desired: raw0,
            token_min: min0,
            native_value: raw1,
            native_min: min1,
        }
    } else {
        DepositCall::Plain {
            token0: token0.address,
            token1: token1.address,
            desired0: raw0,
            desired1: raw1,
            min0,
            min1,
        }
    }
}

impl Session {
    pub(super) fn stored_pair(&self, address: Address) -> Result<Pair, DexError> {
        self.store
            .snapshot()
            .pair(address)
            .cloned()
            .ok_or(DexError::PairNotFound(address))
    }

    /// Creates a new pair by depositing initial liquidity; with
    /// `stake`, chains gauge creation and staking of the received
    /// pool shares behind the deposit.
    pub(super) async fn create_pair(
        &self,
        content: CreatePair,
        stake: bool,
    ) -> Result<(), DexError> {
        let CreatePair {
            token0,
            token1,
            amount0,
            amount1,
            stable,
            slippage,
            token_id,
        } = content;
        let raw0 = Self::raw_amount(&token0, &amount0)?;
        let raw1 = Self::raw_amount(&token1, &amount1)?;

        let wrapped = self.chain.wrapped_native();
        let addr0 = token0.route_address(wrapped);
        let addr1 = token1.route_address(wrapped);
        if self.gateway.pair_address(addr0, addr1, stable).await? != Address::ZERO {
            return Err(DexError::PairExists);
        }

        let allow0 = TxStep::new(format!("Checking your {} allowance", token0.symbol));
        let allow1 = TxStep::new(format!("Checking your {} allowance", token1.symbol));
        let deposit = TxStep::new("Create liquidity pair");
        let mut steps = vec![allow0.clone(), allow1.clone(), deposit.clone()];
        let stake_steps = stake.then(|| {
            let create_gauge = TxStep::new("Create gauge");
            let allow_lp = TxStep::new("Checking your pool allowance");
            let stake_lp = TxStep::new("Stake LP tokens into gauge");
            steps.extend([create_gauge.clone(), allow_lp.clone(), stake_lp.clone()]);
            (create_gauge, allow_lp, stake_lp)
        });
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Create pair {}/{}", token0.symbol, token1.symbol),
            "Liquidity",
            "Pair Created",
            steps,
        )));

        self.resolve_pair_allowances(&token0, raw0, &allow0, &token1, raw1, &allow1)
            .await?;
        self.deposit_liquidity(&token0, &token1, raw0, raw1, stable, &slippage, &deposit)
            .await?;

        let pair_address = self.gateway.pair_address(addr0, addr1, stable).await?;
        self.notifier.emit(Event::PairCreated(pair_address));

        if let Some((create_gauge, allow_lp, stake_lp)) = stake_steps {
            let voter_instance = voter::Voter::new(self.chain.voter(), self.provider.clone());
            self.orchestrator
                .submit(create_gauge.uuid(), voter_instance.createGauge(pair_address))
                .await?;

            let gauge_address = self.gateway.gauge_address(pair_address).await?;
            // The pair is too new to be cached; read its token metadata
            // so the allowance step names the real pool symbol
            let lp = self.gateway.token_metadata(pair_address).await?;
            self.stake_full_balance(&lp, gauge_address, token_id, &allow_lp, &stake_lp)
                .await?;
            self.notifier.emit(Event::LiquidityStaked);
        }

        self.refresh_after_tx().await;
        Ok(())
    }

    /// Deposits into an existing pair; with `stake`, chains staking of
    /// the received pool shares into the pair's gauge.
    pub(super) async fn add_liquidity(
        &self,
        content: AddLiquidity,
        stake: bool,
    ) -> Result<(), DexError> {
        let AddLiquidity {
            token0,
            token1,
            amount0,
            amount1,
            pair,
            stable,
            slippage,
            token_id,
        } = content;
        let raw0 = Self::raw_amount(&token0, &amount0)?;
        let raw1 = Self::raw_amount(&token1, &amount1)?;
        let stored = self.stored_pair(pair)?;
        let gauge_address = match (stake, &stored.gauge) {
            (false, _) => None,
            (true, Some(gauge)) => Some(gauge.address),
            (true, None) => {
                return Err(DexError::InvalidRequest(format!(
                    "pair {pair} has no gauge to stake into"
                )));
            }
        };

        let allow0 = TxStep::new(format!("Checking your {} allowance", token0.symbol));
        let allow1 = TxStep::new(format!("Checking your {} allowance", token1.symbol));
        let deposit = TxStep::new("Deposit tokens into the pool");
        let mut steps = vec![allow0.clone(), allow1.clone(), deposit.clone()];
        let stake_steps = gauge_address.map(|gauge_address| {
            let allow_lp = TxStep::new(format!("Checking your {} allowance", stored.symbol));
            let stake_lp = TxStep::new("Stake LP tokens into gauge");
            steps.extend([allow_lp.clone(), stake_lp.clone()]);
            (gauge_address, allow_lp, stake_lp)
        });
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Add liquidity to {}", stored.symbol),
            "Liquidity",
            "Liquidity Added",
            steps,
        )));

        self.resolve_pair_allowances(&token0, raw0, &allow0, &token1, raw1, &allow1)
            .await?;
        self.deposit_liquidity(&token0, &token1, raw0, raw1, stable, &slippage, &deposit)
            .await?;
        self.notifier.emit(Event::LiquidityAdded);

        if let Some((gauge_address, allow_lp, stake_lp)) = stake_steps {
            self.stake_full_balance(&lp_asset(&stored), gauge_address, token_id, &allow_lp, &stake_lp)
                .await?;
            self.notifier.emit(Event::LiquidityStaked);
        }

        self.refresh_after_tx().await;
        self.refresh_pair(pair).await;
        Ok(())
    }

    pub(super) async fn stake_liquidity(&self, content: StakeLiquidity) -> Result<(), DexError> {
        let stored = self.stored_pair(content.pair)?;
        let gauge_address = stored
            .gauge
            .as_ref()
            .map(|gauge| gauge.address)
            .ok_or_else(|| {
                DexError::InvalidRequest(format!("pair {} has no gauge", content.pair))
            })?;

        let raw = match &content.amount {
            Some(amount) => parse_fixed(amount, stored.decimals)
                .ok_or_else(|| DexError::InvalidRequest(format!("bad amount: {amount}")))?,
            None => {
                pair_abi::Pair::new(content.pair, self.provider.clone())
                    .balanceOf(self.gateway.account())
                    .call()
                    .await?
            }
        };
        if raw.is_zero() {
            return Err(DexError::InvalidRequest("nothing to stake".to_string()));
        }

        let allow_lp = TxStep::new(format!("Checking your {} allowance", stored.symbol));
        let stake_lp = TxStep::new("Stake LP tokens into gauge");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Stake {} into gauge", stored.symbol),
            "Liquidity",
            "Liquidity Staked",
            vec![allow_lp.clone(), stake_lp.clone()],
        )));

        let allowance = self.gateway.allowance(content.pair, gauge_address).await?;
        self.orchestrator
            .ensure_allowance(
                allow_lp.uuid(),
                &lp_asset(&stored),
                gauge_address,
                "gauge",
                allowance,
                raw,
            )
            .await?;

        let gauge_instance = gauge::Gauge::new(gauge_address, self.provider.clone());
        self.orchestrator
            .submit(
                stake_lp.uuid(),
                gauge_instance.deposit(raw, U256::from(content.token_id.unwrap_or(0))),
            )
            .await?;

        self.notifier.emit(Event::LiquidityStaked);
        self.refresh_pair(content.pair).await;
        Ok(())
    }

    pub(super) async fn unstake_liquidity(&self, content: StakeLiquidity) -> Result<(), DexError> {
        let stored = self.stored_pair(content.pair)?;
        let gauge_address = stored
            .gauge
            .as_ref()
            .map(|gauge| gauge.address)
            .ok_or_else(|| {
                DexError::InvalidRequest(format!("pair {} has no gauge", content.pair))
            })?;
        let gauge_instance = gauge::Gauge::new(gauge_address, self.provider.clone());

        let raw = match &content.amount {
            Some(amount) => parse_fixed(amount, stored.decimals)
                .ok_or_else(|| DexError::InvalidRequest(format!("bad amount: {amount}")))?,
            None => {
                gauge_instance
                    .balanceOf(self.gateway.account())
                    .call()
                    .await?
            }
        };
        if raw.is_zero() {
            return Err(DexError::InvalidRequest("nothing to unstake".to_string()));
        }

        let unstake = TxStep::new("Unstake LP tokens from gauge");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Unstake {} from gauge", stored.symbol),
            "Liquidity",
            "Liquidity Unstaked",
            vec![unstake.clone()],
        )));

        self.orchestrator
            .submit(unstake.uuid(), gauge_instance.withdraw(raw))
            .await?;

        self.notifier.emit(Event::LiquidityUnstaked);
        self.refresh_pair(content.pair).await;
        Ok(())
    }

    /// Withdraws liquidity; with `unstake`, the pool shares are pulled
    /// out of the gauge first.
    pub(super) async fn remove_liquidity(
        &self,
        content: RemoveLiquidity,
        unstake: bool,
    ) -> Result<(), DexError> {
        let stored = self.stored_pair(content.pair)?;
        let raw = parse_fixed(&content.amount, stored.decimals)
            .ok_or_else(|| DexError::InvalidRequest(format!("bad amount: {}", content.amount)))?;
        if raw.is_zero() {
            return Err(DexError::InvalidRequest("nothing to remove".to_string()));
        }

        let router_instance = router::Router::new(self.chain.router(), self.provider.clone());
        let quoted = router_instance
            .quoteRemoveLiquidity(
                stored.token0.address,
                stored.token1.address,
                stored.stable,
                raw,
            )
            .call()
            .await?;
        let min0 = min_after_slippage(quoted.amountA, &content.slippage);
        let min1 = min_after_slippage(quoted.amountB, &content.slippage);

        let unstake_step = unstake.then(|| TxStep::new("Unstake LP tokens from gauge"));
        let allow_lp = TxStep::new(format!("Checking your {} allowance", stored.symbol));
        let remove = TxStep::new("Remove liquidity");
        let mut steps = vec![allow_lp.clone(), remove.clone()];
        if let Some(step) = &unstake_step {
            steps.insert(0, step.clone());
        }
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Remove liquidity from {}", stored.symbol),
            "Liquidity",
            "Liquidity Removed",
            steps,
        )));

        if let Some(step) = &unstake_step {
            let gauge_address = stored
                .gauge
                .as_ref()
                .map(|gauge| gauge.address)
                .ok_or_else(|| {
                    DexError::InvalidRequest(format!("pair {} has no gauge", content.pair))
                })?;
            let gauge_instance = gauge::Gauge::new(gauge_address, self.provider.clone());
            self.orchestrator
                .submit(step.uuid(), gauge_instance.withdraw(raw))
                .await?;
            self.notifier.emit(Event::LiquidityUnstaked);
        }

        let allowance = self
            .gateway
            .allowance(content.pair, self.chain.router())
            .await?;
        self.orchestrator
            .ensure_allowance(
                allow_lp.uuid(),
                &lp_asset(&stored),
                self.chain.router(),
                "router",
                allowance,
                raw,
            )
            .await?;

        self.orchestrator
            .submit(
                remove.uuid(),
                router_instance.removeLiquidity(
                    stored.token0.address,
                    stored.token1.address,
                    stored.stable,
                    raw,
                    min0,
                    min1,
                    self.gateway.account(),
                    self.orchestrator.deadline(),
                ),
            )
            .await?;

        self.notifier.emit(Event::LiquidityRemoved);
        self.refresh_after_tx().await;
        self.refresh_pair(content.pair).await;
        Ok(())
    }

    pub(super) async fn quote_add_liquidity(
        &self,
        content: QuoteAddLiquidity,
    ) -> Result<(), DexError> {
        let raw0 = Self::raw_amount(&content.token0, &content.amount0)?;
        let raw1 = Self::raw_amount(&content.token1, &content.amount1)?;
        let wrapped = self.chain.wrapped_native();

        let quoted = router::Router::new(self.chain.router(), self.provider.clone())
            .quoteAddLiquidity(
                content.token0.route_address(wrapped),
                content.token1.route_address(wrapped),
                content.stable,
                raw0,
                raw1,
            )
            .call()
            .await?;

        self.notifier
            .emit(Event::QuoteAddLiquidityReturned(AddLiquidityQuote {
                amount0: Converter::new(content.token0.decimals).from_unsigned(quoted.amountA),
                amount1: Converter::new(content.token1.decimals).from_unsigned(quoted.amountB),
                liquidity: Converter::new(18).from_unsigned(quoted.liquidity),
            }));
        Ok(())
    }

    pub(super) async fn quote_remove_liquidity(
        &self,
        content: QuoteRemoveLiquidity,
    ) -> Result<(), DexError> {
        let stored = self.stored_pair(content.pair)?;
        let raw = parse_fixed(&content.amount, stored.decimals)
            .ok_or_else(|| DexError::InvalidRequest(format!("bad amount: {}", content.amount)))?;

        let quoted = router::Router::new(self.chain.router(), self.provider.clone())
            .quoteRemoveLiquidity(
                stored.token0.address,
                stored.token1.address,
                stored.stable,
                raw,
            )
            .call()
            .await?;

        self.notifier
            .emit(Event::QuoteRemoveLiquidityReturned(RemoveLiquidityQuote {
                amount0: Converter::new(stored.token0.decimals).from_unsigned(quoted.amountA),
                amount1: Converter::new(stored.token1.decimals).from_unsigned(quoted.amountB),
            }));
        Ok(())
    }

    pub(super) async fn create_gauge(&self, pair: Address) -> Result<(), DexError> {
        let step = TxStep::new("Create gauge");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            "Create liquidity gauge",
            "Liquidity",
            "Gauge Created",
            vec![step.clone()],
        )));

        let voter_instance = voter::Voter::new(self.chain.voter(), self.provider.clone());
        self.orchestrator
            .submit(step.uuid(), voter_instance.createGauge(pair))
            .await?;

        self.notifier.emit(Event::GaugeCreated);
        self.refresh_pair(pair).await;
        Ok(())
    }

    /// Resolves the two deposit-side allowance steps concurrently.
    async fn resolve_pair_allowances(
        &self,
        token0: &Asset,
        raw0: U256,
        step0: &TxStep,
        token1: &Asset,
        raw1: U256,
        step1: &TxStep,
    ) -> Result<(), DexError> {
        let router_address = self.chain.router();
        let (allowance0, allowance1) = futures::try_join!(
            self.gateway.allowance(token0.address, router_address),
            self.gateway.allowance(token1.address, router_address),
        )?;
        // Both approvals run to completion even when the other fails:
        // an approval already broadcast must still see its receipt and
        // emit its terminal event
        join_independent(
            self.orchestrator.ensure_allowance(
                step0.uuid(),
                token0,
                router_address,
                "router",
                allowance0,
                raw0,
            ),
            self.orchestrator.ensure_allowance(
                step1.uuid(),
                token1,
                router_address,
                "router",
                allowance1,
                raw1,
            ),
        )
        .await
    }

    /// Submits the deposit through the ETH-style router entrypoint when
    /// one side is the native sentinel (native amount as call value),
    /// the plain entrypoint otherwise.
    #[allow(clippy::too_many_arguments)]
    async fn deposit_liquidity(
        &self,
        token0: &Asset,
        token1: &Asset,
        raw0: U256,
        raw1: U256,
        stable: bool,
        slippage: &str,
        step: &TxStep,
    ) -> Result<TxHash, DexError> {
        let router_instance = router::Router::new(self.chain.router(), self.provider.clone());
        let account = self.gateway.account();
        let deadline = self.orchestrator.deadline();
        let min0 = min_after_slippage(raw0, slippage);
        let min1 = min_after_slippage(raw1, slippage);

        match deposit_call(token0, token1, raw0, raw1, min0, min1) {
            DepositCall::Eth {
                token,
                token_desired,
                token_min,
                native_value,
                native_min,
            } => {
                let call = router_instance
                    .addLiquidityETH(
                        token,
                        stable,
                        token_desired,
                        token_min,
                        native_min,
                        account,
                        deadline,
                    )
                    .value(native_value);
                self.orchestrator.submit(step.uuid(), call).await
            }
            DepositCall::Plain {
                token0,
                token1,
                desired0,
                desired1,
                min0,
                min1,
            } => {
                let call = router_instance.addLiquidity(
                    token0, token1, stable, desired0, desired1, min0, min1, account, deadline,
                );
                self.orchestrator.submit(step.uuid(), call).await
            }
        }
    }

    /// Stakes the account's entire unstaked pool-share balance.
    async fn stake_full_balance(
        &self,
        lp: &Asset,
        gauge_address: Address,
        token_id: Option<TokenId>,
        allow_step: &TxStep,
        stake_step: &TxStep,
    ) -> Result<(), DexError> {
        let pair_instance = pair_abi::Pair::new(lp.address, self.provider.clone());
        let balance = pair_instance
            .balanceOf(self.gateway.account())
            .call()
            .await?;

        let allowance = self.gateway.allowance(lp.address, gauge_address).await?;
        self.orchestrator
            .ensure_allowance(
                allow_step.uuid(),
                lp,
                gauge_address,
                "gauge",
                allowance,
                balance,
            )
            .await?;

        let gauge_instance = gauge::Gauge::new(gauge_address, self.provider.clone());
        self.orchestrator
            .submit(
                stake_step.uuid(),
                gauge_instance.deposit(balance, U256::from(token_id.unwrap_or(0))),
            )
            .await?;
        Ok(())
    }

    /// Post-transaction pair refresh; failure keeps the stale entry.
    pub(super) async fn refresh_pair(&self, address: Address) {
        if let Err(err) = self.get_liquidity_balances(address).await {
            warn!(%address, %err, "pair refresh after transaction failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NATIVE_ADDRESS;
    use fastnum::udec256;

    fn asset(address: Address, symbol: &str) -> Asset {
        Asset {
            address,
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 18,
            balance: udec256!(0),
            whitelisted: true,
            local: false,
        }
    }

    #[test]
    fn test_deposit_routes_native_token0_through_eth_variant() {
        let native = asset(NATIVE_ADDRESS, "ETH");
        let token = asset(Address::with_last_byte(2), "TKN");
        let plan = deposit_call(
            &native,
            &token,
            U256::from(100),
            U256::from(200),
            U256::from(98),
            U256::from(196),
        );
        assert_eq!(
            plan,
            DepositCall::Eth {
                token: token.address,
                token_desired: U256::from(200),
                token_min: U256::from(196),
                native_value: U256::from(100),
                native_min: U256::from(98),
            }
        );
    }

    #[test]
    fn test_deposit_flips_arguments_for_native_token1() {
        let token = asset(Address::with_last_byte(2), "TKN");
        let native = asset(NATIVE_ADDRESS, "ETH");
        let plan = deposit_call(
            &token,
            &native,
            U256::from(200),
            U256::from(100),
            U256::from(196),
            U256::from(98),
        );
        assert_eq!(
            plan,
            DepositCall::Eth {
                token: token.address,
                token_desired: U256::from(200),
                token_min: U256::from(196),
                native_value: U256::from(100),
                native_min: U256::from(98),
            }
        );
    }

    #[test]
    fn test_deposit_without_native_side_stays_plain() {
        let a = asset(Address::with_last_byte(1), "A");
        let b = asset(Address::with_last_byte(2), "B");
        let plan = deposit_call(
            &a,
            &b,
            U256::from(10),
            U256::from(20),
            U256::from(9),
            U256::from(19),
        );
        assert_eq!(
            plan,
            DepositCall::Plain {
                token0: a.address,
                token1: b.address,
                desired0: U256::from(10),
                desired1: U256::from(20),
                min0: U256::from(9),
                min1: U256::from(19),
            }
        );
    }

    #[test]
    fn test_lp_asset_carries_pair_identity() {
        let pair = Pair {
            address: Address::with_last_byte(7),
            symbol: "vAMM-A/B".to_string(),
            decimals: 18,
            token0: asset(Address::with_last_byte(1), "A"),
            token1: asset(Address::with_last_byte(2), "B"),
            stable: false,
            reserve0: udec256!(0),
            reserve1: udec256!(0),
            total_supply: udec256!(0),
            balance: udec256!(5),
            gauge: None,
        };
        let lp = lp_asset(&pair);
        assert_eq!(lp.address, pair.address);
        assert_eq!(lp.symbol, "vAMM-A/B");
        assert_eq!(lp.decimals, 18);
        assert_eq!(lp.balance, udec256!(5));
    }
}
