//! Domain entities held by the domain cache.
//!
//! All amounts are decimal-scaled ([`fastnum`] decimals produced by
//! [`crate::num::Converter`]); raw fixed-point integers never leave the
//! gateway layer.

use alloy::primitives::Address;
use fastnum::{D256, UD256};

use super::TokenId;

/// Sentinel address for the chain's native currency. The native asset
/// has no contract, is always treated as having infinite allowance and
/// routes through the ETH-style contract call variants.
pub const NATIVE_ADDRESS: Address = Address::ZERO;

/// A fungible asset known to the session.
///
/// Created on first discovery (protocol list load or on-chain lookup),
/// balance refreshed on every balance cycle. Only user-added assets
/// (`local`) can be removed.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct Asset {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[debug("{balance}")]
    pub balance: UD256,
    pub whitelisted: bool,
    /// True when added by the user rather than the protocol token list.
    pub local: bool,
}

impl Asset {
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_ADDRESS
    }

    /// Address used in routes and pool lookups: the wrapped-native
    /// token stands in for the native sentinel.
    pub fn route_address(&self, wrapped_native: Address) -> Address {
        if self.is_native() {
            wrapped_native
        } else {
            self.address
        }
    }
}

/// Allow-listed intermediate token for multi-hop swap routes, with its
/// index-service USD price when available.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RouteAsset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub price: f64,
}

/// A liquidity pool for two assets, stable-curve or volatile-curve.
///
/// The composite identity is (token0, token1, stable); `address` is the
/// canonical on-chain identifier once the pair exists. token0/token1
/// ordering always matches the canonical on-chain pair.
#[derive(Clone, derive_more::Debug)]
pub struct Pair {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub token0: Asset,
    pub token1: Asset,
    pub stable: bool,
    #[debug("{reserve0}")]
    pub reserve0: UD256,
    #[debug("{reserve1}")]
    pub reserve1: UD256,
    #[debug("{total_supply}")]
    pub total_supply: UD256,
    /// Caller's unstaked pool-share balance.
    #[debug("{balance}")]
    pub balance: UD256,
    pub gauge: Option<Gauge>,
}

impl Pair {
    /// True when this pair pools the given two tokens at the given
    /// stability, in either input order.
    pub fn matches(&self, token_a: Address, token_b: Address, stable: bool) -> bool {
        self.stable == stable
            && ((self.token0.address == token_a && self.token1.address == token_b)
                || (self.token0.address == token_b && self.token1.address == token_a))
    }
}

/// Staking contract attached to a pair, distributing protocol-token
/// rewards proportional to voting weight. 0-or-1 per pair.
#[derive(Clone, derive_more::Debug)]
pub struct Gauge {
    pub address: Address,
    pub bribe_address: Address,
    /// Caller's staked pool-share balance.
    #[debug("{balance}")]
    pub balance: UD256,
    #[debug("{total_supply}")]
    pub total_supply: UD256,
    /// Pool reserves attributed to the staked supply.
    #[debug("{reserve0}")]
    pub reserve0: UD256,
    #[debug("{reserve1}")]
    pub reserve1: UD256,
    #[debug("{weight}")]
    pub weight: D256,
    /// Share of the total voting weight, percent.
    #[debug("{weight_percent}")]
    pub weight_percent: D256,
    /// Claimable protocol-token emission for the caller.
    #[debug("{rewards_earned}")]
    pub rewards_earned: UD256,
    pub bribes: Vec<BribeReward>,
}

/// One reward stream attached to a gauge's bribe contract.
/// Recomputed per refresh, never persisted.
#[derive(Clone, derive_more::Debug)]
pub struct BribeReward {
    pub token: Asset,
    #[debug("{reward_rate}")]
    pub reward_rate: UD256,
    /// Accrued unclaimed amount for the caller's current vote-escrow
    /// position.
    #[debug("{earned}")]
    pub earned: UD256,
    /// USD valuation from the index price map; zero when unpriced.
    pub usd_value: f64,
}

/// A vote-escrow position: locked governance tokens with time-decaying
/// voting power. Logically removed by a post-expiry withdraw (balance
/// drops to zero).
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct VestNft {
    pub id: TokenId,
    pub lock_ends: u64,
    #[debug("{lock_amount}")]
    pub lock_amount: UD256,
    #[debug("{lock_value}")]
    pub lock_value: UD256,
}

/// Current vote of one vote-escrow position on one pair, as a signed
/// percentage of the position's total absolute vote weight.
/// Ephemeral, recomputed per query.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct Vote {
    pub pair: Address,
    #[debug("{percent}")]
    pub percent: D256,
}

/// Claimable rebase distribution for one vote-escrow position.
#[derive(Clone, derive_more::Debug)]
pub struct VeDistReward {
    pub token_id: TokenId,
    #[debug("{lock_value}")]
    pub lock_value: UD256,
    #[debug("{claimable}")]
    pub claimable: UD256,
}

/// Aggregated claimable-reward view for one vote-escrow position.
#[derive(Clone, Debug, Default)]
pub struct Rewards {
    /// Pairs whose gauge bribes have accrued amounts for the position.
    pub bribes: Vec<Pair>,
    /// Pairs whose gauges have claimable protocol-token emission.
    pub rewards: Vec<Pair>,
    pub ve_dist: Vec<VeDistReward>,
}

/// Protocol-wide figures refreshed alongside pair state.
#[derive(Clone, derive_more::Debug, Default)]
pub struct ProtocolMetrics {
    #[debug("{total_weight}")]
    pub total_weight: D256,
    #[debug("{ve_total_supply}")]
    pub ve_total_supply: UD256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use fastnum::udec256;

    fn asset(addr: Address) -> Asset {
        Asset {
            address: addr,
            symbol: "T".to_string(),
            name: "Token".to_string(),
            decimals: 18,
            balance: udec256!(0),
            whitelisted: true,
            local: false,
        }
    }

    #[test]
    fn test_native_routes_through_wrapped() {
        let wnative = address!("0x826551890Dc65655a0Aceca109aB11AbDbD7a07B");
        let native = asset(NATIVE_ADDRESS);
        assert!(native.is_native());
        assert_eq!(native.route_address(wnative), wnative);

        let erc20 = asset(address!("0x4e71A2E537B7f9D9413D3991D37958c0b5e1e503"));
        assert!(!erc20.is_native());
        assert_eq!(erc20.route_address(wnative), erc20.address);
    }

    #[test]
    fn test_route_asset_from_index_json() {
        let json = r#"{
            "address": "0x826551890Dc65655a0Aceca109aB11AbDbD7a07B",
            "symbol": "USDC",
            "decimals": 6,
            "price": 0.9997
        }"#;
        let asset: RouteAsset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.symbol, "USDC");
        assert_eq!(asset.decimals, 6);
        assert!((asset.price - 0.9997).abs() < f64::EPSILON);

        // Price is optional in the index payload
        let unpriced: RouteAsset = serde_json::from_str(
            r#"{"address": "0x826551890Dc65655a0Aceca109aB11AbDbD7a07B", "symbol": "USDC", "decimals": 6}"#,
        )
        .unwrap();
        assert_eq!(unpriced.price, 0.0);
    }

    #[test]
    fn test_pair_matches_either_order() {
        let a = address!("0x4e71A2E537B7f9D9413D3991D37958c0b5e1e503");
        let b = address!("0x826551890Dc65655a0Aceca109aB11AbDbD7a07B");
        let pair = Pair {
            address: address!("0x30b983f0a016AD1191464cf5ab9067b6FcF4F822"),
            symbol: "vAMM-A/B".to_string(),
            decimals: 18,
            token0: asset(a),
            token1: asset(b),
            stable: false,
            reserve0: udec256!(0),
            reserve1: udec256!(0),
            total_supply: udec256!(0),
            balance: udec256!(0),
            gauge: None,
        };
        assert!(pair.matches(a, b, false));
        assert!(pair.matches(b, a, false));
        assert!(!pair.matches(a, b, true));
    }
}
