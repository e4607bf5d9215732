//! End-to-end quote pipeline over simulated constant-product pools:
//! candidate enumeration, batched-amount shaped inputs, best-route
//! selection and price impact.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use vedex_sdk::quote::{
    LegFlow, SwapCandidate, enumerate_candidates, price_impact, select_best,
};
use vedex_sdk::types::RouteAsset;

fn addr(byte: u8) -> Address {
    Address::with_last_byte(byte)
}

fn route_asset(address: Address, symbol: &str) -> RouteAsset {
    RouteAsset {
        address,
        symbol: symbol.to_string(),
        decimals: 18,
        price: 1.0,
    }
}

/// Volatile pools keyed by unordered token pair.
struct Pools {
    reserves: HashMap<(Address, Address), (U256, U256)>,
}

impl Pools {
    fn new() -> Self {
        Self {
            reserves: HashMap::new(),
        }
    }

    fn add(&mut self, a: Address, b: Address, reserve_a: u64, reserve_b: u64) {
        self.reserves
            .insert((a, b), (U256::from(reserve_a), U256::from(reserve_b)));
        self.reserves
            .insert((b, a), (U256::from(reserve_b), U256::from(reserve_a)));
    }

    fn get(&self, from: Address, to: Address) -> Option<(U256, U256)> {
        self.reserves.get(&(from, to)).copied()
    }

    /// Constant-product output, no fee.
    fn swap(&self, from: Address, to: Address, amount_in: U256) -> Option<U256> {
        let (reserve_in, reserve_out) = self.get(from, to)?;
        Some(amount_in * reserve_out / (reserve_in + amount_in))
    }

    /// What the batched router read would return for one candidate:
    /// per-hop amounts input-first, `None` when any hop has no pool.
    /// Stable pools are not simulated, so stable candidates read as
    /// failed.
    fn amounts_for(&self, candidate: &SwapCandidate, amount_in: U256) -> Option<Vec<U256>> {
        let mut amounts = vec![amount_in];
        for leg in &candidate.legs {
            if leg.stable {
                return None;
            }
            let out = self.swap(leg.from, leg.to, *amounts.last().unwrap())?;
            amounts.push(out);
        }
        Some(amounts)
    }
}

#[test]
fn test_two_hop_beats_shallow_direct_pool() {
    let (token_a, token_b, usdc) = (addr(1), addr(2), addr(10));
    let mut pools = Pools::new();
    // Thin direct pool, deep pools through the route asset
    pools.add(token_a, token_b, 1_000, 1_000);
    pools.add(token_a, usdc, 1_000_000, 1_000_000);
    pools.add(usdc, token_b, 1_000_000, 1_000_000);

    let candidates = enumerate_candidates(token_a, token_b, &[route_asset(usdc, "USDC")]);
    let amount_in = U256::from(500);
    let amounts: Vec<Option<Vec<U256>>> = candidates
        .iter()
        .map(|candidate| pools.amounts_for(candidate, amount_in))
        .collect();

    let (index, winning) = select_best(&candidates, &amounts).unwrap();
    assert_eq!(candidates[index].legs.len(), 2);
    assert_eq!(candidates[index].route_asset.as_ref().unwrap().address, usdc);

    // Direct 1000/1000 pool yields 333 for 500 in; the deep two-hop
    // path must strictly beat it
    let direct_out = pools.swap(token_a, token_b, amount_in).unwrap();
    assert!(winning.last().copied().unwrap() > direct_out);
}

#[test]
fn test_direct_pool_wins_when_no_route_asset_path() {
    let (token_a, token_b, usdc) = (addr(1), addr(2), addr(10));
    let mut pools = Pools::new();
    pools.add(token_a, token_b, 1_000_000, 1_000_000);
    // No pools against the route asset at all

    let candidates = enumerate_candidates(token_a, token_b, &[route_asset(usdc, "USDC")]);
    let amounts: Vec<Option<Vec<U256>>> = candidates
        .iter()
        .map(|candidate| pools.amounts_for(candidate, U256::from(1_000)))
        .collect();

    let (index, winning) = select_best(&candidates, &amounts).unwrap();
    assert_eq!(candidates[index].legs.len(), 1);
    assert!(!candidates[index].legs[0].stable);
    assert_eq!(winning.len(), 2);
}

#[test]
fn test_no_pools_is_no_route() {
    let candidates = enumerate_candidates(addr(1), addr(2), &[route_asset(addr(10), "USDC")]);
    let pools = Pools::new();
    let amounts: Vec<Option<Vec<U256>>> = candidates
        .iter()
        .map(|candidate| pools.amounts_for(candidate, U256::from(1_000)))
        .collect();
    assert!(select_best(&candidates, &amounts).is_none());
}

#[test]
fn test_price_impact_grows_with_trade_size() {
    let (token_a, token_b) = (addr(1), addr(2));
    let mut pools = Pools::new();
    pools.add(token_a, token_b, 1_000_000, 1_000_000);

    let impact_of = |amount_in: u64| {
        let amount_in = U256::from(amount_in);
        let amount_out = pools.swap(token_a, token_b, amount_in).unwrap();
        let (reserve_in, reserve_out) = pools.get(token_a, token_b).unwrap();
        price_impact(&[LegFlow {
            amount_in,
            amount_out,
            reserve_in,
            reserve_out,
            stable: false,
        }])
    };

    let small = impact_of(100);
    let large = impact_of(100_000);
    assert!(small > fastnum::dec256!(0));
    assert!(large > small);
    assert!(large < fastnum::dec256!(100));
}

#[test]
fn test_two_hop_impact_compounds_over_legs() {
    let (token_a, token_b, usdc) = (addr(1), addr(2), addr(10));
    let mut pools = Pools::new();
    pools.add(token_a, usdc, 1_000_000, 1_000_000);
    pools.add(usdc, token_b, 1_000_000, 1_000_000);

    let amount_in = U256::from(50_000);
    let mid = pools.swap(token_a, usdc, amount_in).unwrap();
    let out = pools.swap(usdc, token_b, mid).unwrap();

    let legs = [
        LegFlow {
            amount_in,
            amount_out: mid,
            reserve_in: U256::from(1_000_000),
            reserve_out: U256::from(1_000_000),
            stable: false,
        },
        LegFlow {
            amount_in: mid,
            amount_out: out,
            reserve_in: U256::from(1_000_000),
            reserve_out: U256::from(1_000_000),
            stable: false,
        },
    ];
    let single = price_impact(&legs[..1]);
    let both = price_impact(&legs);
    assert!(both > single);
}
