//! Transaction orchestration: one on-chain call per step, lifecycle
//! events at every transition.
//!
//! A step goes Pending as soon as gas estimation begins, Submitted when
//! the network returns a transaction hash (broadcast, not yet
//! confirmed) and Confirmed/Rejected on receipt. Gas limit comes from
//! estimation against the target call; the EIP-1559 fee pair is fetched
//! immediately before each send and never cached across steps.

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{
    contract::{CallBuilder, CallDecoder},
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, Provider},
};
use fastnum::{UD256, decimal::Context};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    Chain,
    abi::erc20,
    error::DexError,
    notify::Notifier,
    num::Converter,
    types::{Asset, Event, TxStepStatus},
};

/// True when an approval transaction must be submitted before the
/// dependent call may spend `amount`. The native sentinel always has
/// infinite allowance.
pub fn needs_approval(asset: &Asset, allowance: U256, amount: U256) -> bool {
    !asset.is_native() && allowance < amount
}

/// Slippage-adjusted minimum amount: `amount * (100 - slippage) / 100`,
/// truncated to an integer. An unparseable slippage string tolerates
/// nothing (0%).
pub fn min_after_slippage(amount: U256, slippage_percent: &str) -> U256 {
    let slippage = UD256::from_str(slippage_percent, Context::default()).unwrap_or(UD256::ZERO);
    let factor = (UD256::from(100u32) - slippage.min(UD256::from(100u32))) / UD256::from(100u32);
    let raw = Converter::new(0);
    raw.to_unsigned(raw.from_unsigned::<4>(amount) * factor)
}

/// Awaits two independent step routines to completion, then reports the
/// first failure if either failed. Neither routine is cancelled when
/// the other fails, so a step whose transaction was already broadcast
/// still sees its receipt and emits its terminal event.
pub async fn join_independent<A, B>(a: A, b: B) -> Result<(), DexError>
where
    A: Future<Output = Result<(), DexError>>,
    B: Future<Output = Result<(), DexError>>,
{
    let (first, second) = futures::join!(a, b);
    first.and(second)
}

pub struct Orchestrator {
    provider: DynProvider,
    notifier: Arc<Notifier>,
    chain: Chain,
    account: Address,
}

impl Orchestrator {
    pub fn new(
        provider: DynProvider,
        notifier: Arc<Notifier>,
        chain: Chain,
        account: Address,
    ) -> Self {
        Self {
            provider,
            notifier,
            chain,
            account,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Contract-enforced transaction deadline: a fixed window from
    /// submission time. The orchestrator applies no client-side
    /// timeout of its own.
    pub fn deadline(&self) -> U256 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        U256::from(now + self.chain.deadline_window_secs())
    }

    /// Runs one step to completion: estimate, price, send, await the
    /// receipt. Emits the full lifecycle on the step UUID. Any failure
    /// rejects the step and halts the caller's dependent chain via the
    /// returned error; the suppressed error class (spurious
    /// method-not-found responses from some providers) is returned but
    /// not reported as a rejection.
    pub async fn submit<P, D>(
        &self,
        uuid: Uuid,
        call: CallBuilder<P, D>,
    ) -> Result<TxHash, DexError>
    where
        P: Provider + Clone,
        D: CallDecoder,
    {
        self.notifier.emit(Event::TxPending { uuid });

        match self.execute(uuid, call).await {
            Ok(hash) => Ok(hash),
            Err(err) => {
                if !err.is_suppressed() {
                    self.notifier.emit(Event::TxRejected {
                        uuid,
                        error: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    async fn execute<P, D>(&self, uuid: Uuid, call: CallBuilder<P, D>) -> Result<TxHash, DexError>
    where
        P: Provider + Clone,
        D: CallDecoder,
    {
        let call = call.from(self.account);

        let gas = call.estimate_gas().await.map_err(DexError::from)?;
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(DexError::from)?;
        debug!(%uuid, gas, max_fee = fees.max_fee_per_gas, "sending transaction");

        let pending = call
            .gas(gas)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .send()
            .await
            .map_err(DexError::from)?;

        let hash = *pending.tx_hash();
        self.notifier.emit(Event::TxSubmitted { uuid, hash });

        let receipt = pending.get_receipt().await.map_err(DexError::from)?;
        if !receipt.status() {
            return Err(DexError::Reverted(format!(
                "transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        self.notifier.emit(Event::TxConfirmed {
            uuid,
            hash: receipt.transaction_hash,
        });
        Ok(receipt.transaction_hash)
    }

    /// Resolves one allowance step: skipped as `Done` when the current
    /// allowance already covers `amount` (or the asset is native),
    /// otherwise submits exactly one max-approval and waits for it.
    pub async fn ensure_allowance(
        &self,
        uuid: Uuid,
        asset: &Asset,
        spender: Address,
        spender_label: &str,
        allowance: U256,
        amount: U256,
    ) -> Result<(), DexError> {
        if !needs_approval(asset, allowance, amount) {
            self.notifier.emit(Event::TxStatus {
                uuid,
                description: Some(format!("Allowance on {} sufficient", asset.symbol)),
                status: Some(TxStepStatus::Done),
            });
            return Ok(());
        }

        self.notifier.emit(Event::TxStatus {
            uuid,
            description: Some(format!(
                "Allow the {} to spend your {}",
                spender_label, asset.symbol
            )),
            status: None,
        });
        let token = erc20::Erc20::new(asset.address, self.provider.clone());
        self.submit(uuid, token.approve(spender, U256::MAX)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastnum::udec256;

    fn asset(address: Address) -> Asset {
        Asset {
            address,
            symbol: "TKN".to_string(),
            name: "Token".to_string(),
            decimals: 18,
            balance: udec256!(0),
            whitelisted: true,
            local: false,
        }
    }

    #[test]
    fn test_needs_approval_only_below_amount() {
        let token = asset(Address::with_last_byte(1));
        assert!(needs_approval(
            &token,
            U256::from(99),
            U256::from(100)
        ));
        assert!(!needs_approval(
            &token,
            U256::from(100),
            U256::from(100)
        ));
        assert!(!needs_approval(
            &token,
            U256::from(101),
            U256::from(100)
        ));
    }

    #[test]
    fn test_native_never_needs_approval() {
        let native = asset(crate::types::NATIVE_ADDRESS);
        assert!(!needs_approval(&native, U256::ZERO, U256::MAX));
    }

    #[tokio::test]
    async fn test_join_independent_never_cancels_survivor() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let finished = AtomicBool::new(false);
        let failing = async { Err(DexError::Reverted("execution reverted".to_string())) };
        let surviving = async {
            // Suspend once, like a receipt wait would
            tokio::task::yield_now().await;
            finished.store(true, Ordering::SeqCst);
            Ok(())
        };

        let result = join_independent(failing, surviving).await;
        assert!(matches!(result, Err(DexError::Reverted(_))));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_join_independent_reports_first_error() {
        let a = async { Err(DexError::Timeout) };
        let b = async { Err(DexError::NoRoute) };
        assert!(matches!(join_independent(a, b).await, Err(DexError::Timeout)));

        let ok = async { Ok(()) };
        let failing = async { Err(DexError::NoRoute) };
        assert!(matches!(
            join_independent(ok, failing).await,
            Err(DexError::NoRoute)
        ));
    }

    #[test]
    fn test_min_after_slippage() {
        assert_eq!(
            min_after_slippage(U256::from(1000), "2"),
            U256::from(980)
        );
        assert_eq!(
            min_after_slippage(U256::from(1000), "0.5"),
            U256::from(995)
        );
        assert_eq!(min_after_slippage(U256::from(1000), "0"), U256::from(1000));
        // Garbage tolerates nothing
        assert_eq!(
            min_after_slippage(U256::from(1000), "abc"),
            U256::from(1000)
        );
    }
}
