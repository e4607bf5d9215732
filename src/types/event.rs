//! Events published by the session to UI subscribers.

use alloy::primitives::{Address, TxHash};
use uuid::Uuid;

use super::{Asset, Rewards, TxQueue, TxStepStatus, VeDistReward, VestNft, Vote};
use crate::quote::{AddLiquidityQuote, RemoveLiquidityQuote, SwapQuote};

/// Session event surface.
///
/// `StoreUpdated` carries no payload: subscribers re-read the store.
/// Transaction lifecycle events carry the step UUID and, once known,
/// the transaction hash; the UI renders `TxRejected` errors verbatim.
#[derive(Clone, Debug)]
pub enum Event {
    Configured,
    StoreUpdated,
    BaseAssetsUpdated(Vec<Asset>),
    AssetSearched(Asset),

    TxAdded(TxQueue),
    /// Step description and/or status updated outside the
    /// pending/submitted/confirmed flow (e.g. allowance resolution).
    TxStatus {
        uuid: Uuid,
        description: Option<String>,
        status: Option<TxStepStatus>,
    },
    TxPending {
        uuid: Uuid,
    },
    TxSubmitted {
        uuid: Uuid,
        hash: TxHash,
    },
    TxConfirmed {
        uuid: Uuid,
        hash: TxHash,
    },
    TxRejected {
        uuid: Uuid,
        error: String,
    },

    QuoteSwapReturned(Option<SwapQuote>),
    QuoteAddLiquidityReturned(AddLiquidityQuote),
    QuoteRemoveLiquidityReturned(RemoveLiquidityQuote),

    SwapReturned,
    WrapUnwrapReturned,
    RedeemReturned,
    PairCreated(Address),
    LiquidityAdded,
    LiquidityStaked,
    LiquidityRemoved,
    LiquidityUnstaked,
    GaugeCreated,
    VestCreated,
    VestIncreased,
    VestWithdrawn,
    VestNftsReturned(Vec<VestNft>),
    VestBalancesReturned(Vec<VeDistReward>),
    VestVotesReturned(Vec<Vote>),
    VoteReturned,
    BribeCreated,
    RewardBalancesReturned(Rewards),
    RewardClaimed,

    /// Generic error carrying a descriptive message.
    Error(String),
}
