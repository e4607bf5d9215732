//! Swap handlers: quoting, execution, native wrap/unwrap and legacy
//! token redemption.

use alloy::primitives::U256;
use tracing::warn;

use super::Session;
use crate::{
    abi::{redeemer, router, wrapped_native},
    error::DexError,
    num::Converter,
    orchestrator::min_after_slippage,
    quote::{LegFlow, SwapQuote, enumerate_candidates, price_impact, select_best},
    types::{Event, QuoteSwapInput, Swap, TxQueue, TxStep, WrapUnwrap},
};

impl Session {
    /// Quotes the best route for a swap. Candidates are enumerated
    /// against the cached route-asset list, priced in one batched
    /// router read and reduced to the strictly-best final output.
    /// No positive-output candidate is the no-route condition: the
    /// quote returns empty and the command fails.
    pub(super) async fn quote_swap(&self, content: QuoteSwapInput) -> Result<(), DexError> {
        let QuoteSwapInput {
            from_asset,
            to_asset,
            from_amount,
        } = content;
        let raw_in = Self::raw_amount(&from_asset, &from_amount)?;

        let wrapped = self.chain.wrapped_native();
        let from = from_asset.route_address(wrapped);
        let to = to_asset.route_address(wrapped);
        if from == to {
            // Wrap/unwrap territory, not a swap
            self.notifier.emit(Event::QuoteSwapReturned(None));
            return Ok(());
        }

        let route_assets = self.store.route_assets();
        let candidates = enumerate_candidates(from, to, &route_assets);
        let call_routes: Vec<Vec<router::Router::Route>> = candidates
            .iter()
            .map(|candidate| candidate.legs.iter().map(|leg| leg.to_call()).collect())
            .collect();
        let amounts = self.gateway.amounts_out(raw_in, &call_routes).await?;

        let Some((index, receive_amounts)) = select_best(&candidates, &amounts) else {
            self.notifier.emit(Event::QuoteSwapReturned(None));
            return Err(DexError::NoRoute);
        };
        let legs = candidates[index].legs.clone();

        let mut flows = Vec::with_capacity(legs.len());
        for (leg, hop) in legs.iter().zip(receive_amounts.windows(2)) {
            let (reserve_in, reserve_out) = if leg.stable {
                (U256::ZERO, U256::ZERO)
            } else {
                self.gateway
                    .leg_reserves(leg.from, leg.to, leg.stable)
                    .await
                    .unwrap_or_else(|err| {
                        warn!(from = %leg.from, to = %leg.to, %err,
                            "reserve read failed, leg excluded from price impact");
                        (U256::ZERO, U256::ZERO)
                    })
            };
            flows.push(LegFlow {
                amount_in: hop[0],
                amount_out: hop[1],
                reserve_in,
                reserve_out,
                stable: leg.stable,
            });
        }

        let final_out = receive_amounts.last().copied().unwrap_or_default();
        let quote = SwapQuote {
            from_address: from_asset.address,
            to_address: to_asset.address,
            from_amount: Converter::new(from_asset.decimals).from_unsigned(raw_in),
            legs,
            receive_amounts,
            final_value: Converter::new(to_asset.decimals).from_unsigned(final_out),
            price_impact: price_impact(&flows),
        };
        self.notifier.emit(Event::QuoteSwapReturned(Some(quote)));
        Ok(())
    }

    /// Executes a previously quoted swap with a slippage-scaled minimum
    /// output. Native endpoints go through the ETH-style router
    /// entrypoints.
    pub(super) async fn swap(&self, content: Swap) -> Result<(), DexError> {
        let Swap {
            from_asset,
            to_asset,
            from_amount,
            quote,
            slippage,
        } = content;
        let raw_in = Self::raw_amount(&from_asset, &from_amount)?;
        let quoted_out = quote
            .receive_amounts
            .last()
            .copied()
            .ok_or_else(|| DexError::InvalidRequest("quote has no amounts".to_string()))?;
        let min_out = min_after_slippage(quoted_out, &slippage);

        let allow = TxStep::new(format!("Checking your {} allowance", from_asset.symbol));
        let swap_step = TxStep::new(format!(
            "Swap {} for {}",
            from_asset.symbol, to_asset.symbol
        ));
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Swap {} for {}", from_asset.symbol, to_asset.symbol),
            "Swap",
            "Swap Successful",
            vec![allow.clone(), swap_step.clone()],
        )));

        let router_address = self.chain.router();
        let allowance = self
            .gateway
            .allowance(from_asset.address, router_address)
            .await?;
        self.orchestrator
            .ensure_allowance(
                allow.uuid(),
                &from_asset,
                router_address,
                "router",
                allowance,
                raw_in,
            )
            .await?;

        let routes: Vec<router::Router::Route> =
            quote.legs.iter().map(|leg| leg.to_call()).collect();
        let instance = router::Router::new(router_address, self.provider.clone());
        let account = self.gateway.account();
        let deadline = self.orchestrator.deadline();

        if from_asset.is_native() {
            let call = instance
                .swapExactETHForTokens(min_out, routes, account, deadline)
                .value(raw_in);
            self.orchestrator.submit(swap_step.uuid(), call).await?;
        } else if to_asset.is_native() {
            let call = instance.swapExactTokensForETH(raw_in, min_out, routes, account, deadline);
            self.orchestrator.submit(swap_step.uuid(), call).await?;
        } else {
            let call =
                instance.swapExactTokensForTokens(raw_in, min_out, routes, account, deadline);
            self.orchestrator.submit(swap_step.uuid(), call).await?;
        }

        self.notifier.emit(Event::SwapReturned);
        self.refresh_after_tx().await;
        Ok(())
    }

    /// Wraps the native currency into its canonical wrapped token, or
    /// unwraps back. Exactly two asset pairings are legal.
    pub(super) async fn wrap_unwrap(&self, content: WrapUnwrap) -> Result<(), DexError> {
        let WrapUnwrap {
            from_asset,
            to_asset,
            from_amount,
        } = content;
        let raw = Self::raw_amount(&from_asset, &from_amount)?;
        let wrapped = self.chain.wrapped_native();
        let instance = wrapped_native::WrappedNative::new(wrapped, self.provider.clone());

        let wrap = if from_asset.is_native() && to_asset.address == wrapped {
            true
        } else if from_asset.address == wrapped && to_asset.is_native() {
            false
        } else {
            return Err(DexError::WrapAssets);
        };

        let step = TxStep::new(if wrap {
            format!("Wrap {}", from_asset.symbol)
        } else {
            format!("Unwrap {}", from_asset.symbol)
        });
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Swap {} for {}", from_asset.symbol, to_asset.symbol),
            "Swap",
            "Swap Successful",
            vec![step.clone()],
        )));

        if wrap {
            self.orchestrator
                .submit(step.uuid(), instance.deposit().value(raw))
                .await?;
        } else {
            self.orchestrator
                .submit(step.uuid(), instance.withdraw(raw))
                .await?;
        }

        self.notifier.emit(Event::WrapUnwrapReturned);
        self.refresh_after_tx().await;
        Ok(())
    }

    /// Redeems the legacy governance token for the current one, one
    /// way.
    pub(super) async fn redeem(&self, from_amount: &str) -> Result<(), DexError> {
        let legacy_address = self.chain.legacy_token();
        let legacy = match self.store.snapshot().asset(legacy_address) {
            Some(asset) => asset.clone(),
            None => self.gateway.token_metadata(legacy_address).await?,
        };
        let raw = Self::raw_amount(&legacy, from_amount)?;

        let allow = TxStep::new(format!("Checking your {} allowance", legacy.symbol));
        let redeem_step = TxStep::new(format!("Redeem your {}", legacy.symbol));
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Redeem {}", legacy.symbol),
            "Redeem",
            "Redeem Successful",
            vec![allow.clone(), redeem_step.clone()],
        )));

        let redeemer_address = self.chain.redeemer();
        let allowance = self
            .gateway
            .allowance(legacy_address, redeemer_address)
            .await?;
        self.orchestrator
            .ensure_allowance(
                allow.uuid(),
                &legacy,
                redeemer_address,
                "redeemer",
                allowance,
                raw,
            )
            .await?;

        let instance = redeemer::Redeemer::new(redeemer_address, self.provider.clone());
        self.orchestrator
            .submit(redeem_step.uuid(), instance.redeem(raw))
            .await?;

        self.notifier.emit(Event::RedeemReturned);
        self.refresh_after_tx().await;
        Ok(())
    }
}
