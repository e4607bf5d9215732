//! The closed command surface dispatched by the session.
//!
//! Each variant carries the command-specific content; amounts arrive as
//! decimal strings exactly as typed in the UI and are scaled to raw
//! fixed-point integers at the gateway boundary.

use alloy::primitives::Address;

use super::{Asset, TokenId};
use crate::quote::SwapQuote;

#[derive(Clone, Debug)]
pub enum Command {
    /// Load token lists, route assets and the pair index into the cache.
    Configure,
    /// Refresh all asset balances and pair/gauge/reward state.
    GetBalances,
    /// Look up an asset by address: cache first, then on-chain metadata.
    SearchAsset { address: Address },
    CreatePairAndStake(CreatePair),
    CreatePairAndDeposit(CreatePair),
    AddLiquidity(AddLiquidity),
    StakeLiquidity(StakeLiquidity),
    AddLiquidityAndStake(AddLiquidity),
    QuoteAddLiquidity(QuoteAddLiquidity),
    GetLiquidityBalances { pair: Address },
    RemoveLiquidity(RemoveLiquidity),
    UnstakeAndRemoveLiquidity(RemoveLiquidity),
    QuoteRemoveLiquidity(QuoteRemoveLiquidity),
    UnstakeLiquidity(StakeLiquidity),
    CreateGauge { pair: Address },
    QuoteSwap(QuoteSwapInput),
    Swap(Swap),
    WrapUnwrap(WrapUnwrap),
    /// Redeem the legacy governance token for the current one.
    Redeem { from_amount: String },
    GetVestNfts,
    CreateVest { amount: String, lock_duration: u64 },
    IncreaseVestAmount { token_id: TokenId, amount: String },
    IncreaseVestDuration { token_id: TokenId, lock_duration: u64 },
    WithdrawVest { token_id: TokenId },
    Vote { token_id: TokenId, votes: Vec<VoteInput> },
    GetVestVotes { token_id: TokenId },
    CreateBribe { pair: Address, asset: Asset, amount: String },
    GetVestBalances { token_id: TokenId },
    GetRewardBalances { token_id: TokenId },
    ClaimBribe { pair: Address, token_id: TokenId },
    ClaimReward { pair: Address },
    ClaimVeDist { token_id: TokenId },
    ClaimAllRewards { token_id: TokenId },
}

#[derive(Clone, Debug)]
pub struct CreatePair {
    pub token0: Asset,
    pub token1: Asset,
    pub amount0: String,
    pub amount1: String,
    pub stable: bool,
    pub slippage: String,
    /// Vote-escrow position to attach when staking into the new gauge.
    pub token_id: Option<TokenId>,
}

#[derive(Clone, Debug)]
pub struct AddLiquidity {
    pub token0: Asset,
    pub token1: Asset,
    pub amount0: String,
    pub amount1: String,
    pub pair: Address,
    pub stable: bool,
    pub slippage: String,
    pub token_id: Option<TokenId>,
}

#[derive(Clone, Debug)]
pub struct StakeLiquidity {
    pub pair: Address,
    /// Pool-share amount; the full unstaked (or staked, for unstake)
    /// balance when absent.
    pub amount: Option<String>,
    pub token_id: Option<TokenId>,
}

#[derive(Clone, Debug)]
pub struct RemoveLiquidity {
    pub pair: Address,
    pub amount: String,
    pub slippage: String,
}

#[derive(Clone, Debug)]
pub struct QuoteAddLiquidity {
    pub token0: Asset,
    pub token1: Asset,
    pub amount0: String,
    pub amount1: String,
    pub stable: bool,
}

#[derive(Clone, Debug)]
pub struct QuoteRemoveLiquidity {
    pub pair: Address,
    pub amount: String,
}

#[derive(Clone, Debug)]
pub struct QuoteSwapInput {
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub from_amount: String,
}

#[derive(Clone, Debug)]
pub struct Swap {
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub from_amount: String,
    pub quote: SwapQuote,
    /// User-tolerated deviation between quoted and executed output,
    /// percent.
    pub slippage: String,
}

#[derive(Clone, Debug)]
pub struct WrapUnwrap {
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub from_amount: String,
}

/// One vote entry as entered in the UI: signed percentage weight for a
/// pair. Entries with value exactly 0 are filtered before submission.
#[derive(Clone, Debug)]
pub struct VoteInput {
    pub address: Address,
    pub value: String,
}
