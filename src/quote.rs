//! Swap and liquidity quoting.
//!
//! Pure computation: candidate routes are enumerated deterministically,
//! their output amounts come back from one batched router read, and the
//! best candidate is picked by final output amount. Nothing in here
//! mutates the cache.

use alloy::primitives::{Address, I256, U256};
use fastnum::{D256, UD256};

use crate::{abi::router::Router, num::Converter, types::RouteAsset};

/// One hop of a swap route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteLeg {
    pub from: Address,
    pub to: Address,
    pub stable: bool,
}

impl RouteLeg {
    pub fn to_call(&self) -> Router::Route {
        Router::Route {
            from: self.from,
            to: self.to,
            stable: self.stable,
        }
    }
}

/// A candidate route: direct, or two hops through a route asset.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapCandidate {
    pub legs: Vec<RouteLeg>,
    pub route_asset: Option<RouteAsset>,
}

/// Selected quote, published with `Event::QuoteSwapReturned` and passed
/// back verbatim by the swap command.
#[derive(Clone, derive_more::Debug)]
pub struct SwapQuote {
    pub from_address: Address,
    pub to_address: Address,
    #[debug("{from_amount}")]
    pub from_amount: UD256,
    pub legs: Vec<RouteLeg>,
    /// Raw per-hop amounts, input first, final output last.
    pub receive_amounts: Vec<U256>,
    /// Final output, decimal-scaled to the destination asset.
    #[debug("{final_value}")]
    pub final_value: UD256,
    /// Marginal price impact, percent.
    #[debug("{price_impact}")]
    pub price_impact: D256,
}

#[derive(Clone, derive_more::Debug)]
pub struct AddLiquidityQuote {
    #[debug("{amount0}")]
    pub amount0: UD256,
    #[debug("{amount1}")]
    pub amount1: UD256,
    #[debug("{liquidity}")]
    pub liquidity: UD256,
}

#[derive(Clone, derive_more::Debug)]
pub struct RemoveLiquidityQuote {
    #[debug("{amount0}")]
    pub amount0: UD256,
    #[debug("{amount1}")]
    pub amount1: UD256,
}

/// Per-leg flow data for price impact: raw amounts moved and the
/// pool reserves they moved against.
#[derive(Clone, Copy, Debug)]
pub struct LegFlow {
    pub amount_in: U256,
    pub amount_out: U256,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub stable: bool,
}

/// Enumerates candidate routes from `from` to `to` (both already
/// rewritten to their route addresses, so the native sentinel never
/// appears here).
///
/// Two-hop routes through each allow-listed route asset come first, in
/// all four stability combinations, but only when neither endpoint is
/// itself a route asset; the direct stable and direct volatile routes
/// are always appended last.
pub fn enumerate_candidates(
    from: Address,
    to: Address,
    route_assets: &[RouteAsset],
) -> Vec<SwapCandidate> {
    let endpoint_is_route_asset = route_assets
        .iter()
        .any(|asset| asset.address == from || asset.address == to);

    let mut candidates = Vec::with_capacity(route_assets.len() * 4 + 2);

    if !endpoint_is_route_asset {
        for asset in route_assets {
            for (first_stable, second_stable) in
                [(true, true), (false, false), (true, false), (false, true)]
            {
                candidates.push(SwapCandidate {
                    legs: vec![
                        RouteLeg {
                            from,
                            to: asset.address,
                            stable: first_stable,
                        },
                        RouteLeg {
                            from: asset.address,
                            to,
                            stable: second_stable,
                        },
                    ],
                    route_asset: Some(asset.clone()),
                });
            }
        }
    }

    for stable in [true, false] {
        candidates.push(SwapCandidate {
            legs: vec![RouteLeg { from, to, stable }],
            route_asset: None,
        });
    }

    candidates
}

/// Picks the candidate with the strictly greatest final output amount.
///
/// `amounts` pairs with `candidates` by index; a `None` entry is a
/// failed or empty read and counts as zero output. Returns the winning
/// index and its raw per-hop amounts, or `None` when no candidate
/// produced positive output (the no-route condition). Equal outputs
/// resolve to the later candidate (strictly-greater comparison in the
/// reduce).
pub fn select_best(
    candidates: &[SwapCandidate],
    amounts: &[Option<Vec<U256>>],
) -> Option<(usize, Vec<U256>)> {
    let mut best: Option<(usize, Vec<U256>)> = None;
    for (index, amounts) in amounts.iter().enumerate().take(candidates.len()) {
        let Some(amounts) = amounts else {
            continue;
        };
        let Some(final_out) = amounts.last().copied() else {
            continue;
        };
        if final_out.is_zero() {
            continue;
        }
        best = match best {
            Some((best_index, best_amounts))
                if best_amounts.last().copied().unwrap_or_default() > final_out =>
            {
                Some((best_index, best_amounts))
            }
            _ => Some((index, amounts.clone())),
        };
    }
    best
}

/// Marginal price impact over the route, percent.
///
/// Each volatile leg contributes the ratio of marginal prices
/// `(out/reserve_out) / (in/reserve_in)`; stable legs contribute a
/// neutral 1 since constant-sum-like pricing has negligible marginal
/// impact at the tracked precision. Impact is `(1 - product) * 100`.
pub fn price_impact(legs: &[LegFlow]) -> D256 {
    let raw = Converter::new(0);
    let to_decimal = |value: U256| -> D256 { raw.from_signed(I256::from_raw(value)) };
    let mut total_ratio = D256::ONE;

    for leg in legs {
        if leg.stable {
            continue;
        }
        if leg.reserve_in.is_zero() || leg.reserve_out.is_zero() || leg.amount_in.is_zero() {
            continue;
        }
        let ratio = (to_decimal(leg.amount_out) / to_decimal(leg.reserve_out))
            / (to_decimal(leg.amount_in) / to_decimal(leg.reserve_in));
        total_ratio = total_ratio * ratio;
    }

    (D256::ONE - total_ratio) * D256::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_asset(address: Address, symbol: &str) -> RouteAsset {
        RouteAsset {
            address,
            symbol: symbol.to_string(),
            decimals: 18,
            price: 1.0,
        }
    }

    fn addr(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    #[test]
    fn test_enumerate_direct_and_two_hop() {
        let usdc = route_asset(addr(10), "USDC");
        let wnative = route_asset(addr(11), "WNATIVE");
        let candidates = enumerate_candidates(addr(1), addr(2), &[usdc.clone(), wnative]);

        // 2 route assets * 4 stability combinations + direct stable + direct volatile
        assert_eq!(candidates.len(), 10);
        assert!(candidates[..8].iter().all(|c| c.legs.len() == 2));
        assert_eq!(
            candidates[0].legs,
            vec![
                RouteLeg {
                    from: addr(1),
                    to: usdc.address,
                    stable: true
                },
                RouteLeg {
                    from: usdc.address,
                    to: addr(2),
                    stable: true
                },
            ]
        );
        // Direct routes come last: stable then volatile
        assert_eq!(candidates[8].legs.len(), 1);
        assert!(candidates[8].legs[0].stable);
        assert!(!candidates[9].legs[0].stable);
    }

    #[test]
    fn test_no_two_hop_when_endpoint_is_route_asset() {
        let usdc = route_asset(addr(10), "USDC");
        let candidates = enumerate_candidates(usdc.address, addr(2), &[usdc.clone()]);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.legs.len() == 1));

        let candidates = enumerate_candidates(addr(1), usdc.address, &[usdc]);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_select_best_takes_strictly_greatest() {
        let candidates = enumerate_candidates(addr(1), addr(2), &[]);
        let amounts = vec![
            Some(vec![U256::from(100), U256::from(90)]),
            Some(vec![U256::from(100), U256::from(95)]),
        ];
        let (index, winning) = select_best(&candidates, &amounts).unwrap();
        assert_eq!(index, 1);
        assert_eq!(winning.last().copied(), Some(U256::from(95)));
    }

    #[test]
    fn test_select_best_ignores_failures() {
        let candidates = enumerate_candidates(addr(1), addr(2), &[route_asset(addr(10), "USDC")]);
        let mut amounts: Vec<Option<Vec<U256>>> = vec![None; candidates.len()];
        amounts[3] = Some(vec![U256::from(100), U256::from(50), U256::from(42)]);
        let (index, _) = select_best(&candidates, &amounts).unwrap();
        assert_eq!(index, 3);
    }

    #[test]
    fn test_all_failed_or_zero_is_no_route() {
        let candidates = enumerate_candidates(addr(1), addr(2), &[]);
        assert!(select_best(&candidates, &[None, None]).is_none());
        let zeros = vec![
            Some(vec![U256::from(100), U256::ZERO]),
            Some(vec![U256::from(100), U256::ZERO]),
        ];
        assert!(select_best(&candidates, &zeros).is_none());
    }

    #[test]
    fn test_price_impact_volatile_leg() {
        // Swap 100 into a 10_000/10_000 pool, receive 97:
        // ratio = (97/10_000) / (100/10_000) = 0.97 -> 3% impact
        let legs = [LegFlow {
            amount_in: U256::from(100),
            amount_out: U256::from(97),
            reserve_in: U256::from(10_000),
            reserve_out: U256::from(10_000),
            stable: false,
        }];
        assert_eq!(price_impact(&legs), D256::from(3));
    }

    #[test]
    fn test_price_impact_stable_legs_are_neutral() {
        let legs = [
            LegFlow {
                amount_in: U256::from(100),
                amount_out: U256::from(1),
                reserve_in: U256::from(10_000),
                reserve_out: U256::from(10_000),
                stable: true,
            },
            LegFlow {
                amount_in: U256::from(100),
                amount_out: U256::from(99),
                reserve_in: U256::from(10_000),
                reserve_out: U256::from(10_000),
                stable: false,
            },
        ];
        assert_eq!(price_impact(&legs), D256::from(1));
    }
}
