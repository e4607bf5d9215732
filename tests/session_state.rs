//! Cache, notifier and transaction-record behavior exercised together,
//! the way the session drives them.

use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash, U256};
use fastnum::udec256;
use vedex_sdk::{
    notify::Notifier,
    orchestrator::{min_after_slippage, needs_approval},
    session::prepare_votes,
    store::{Store, StoreDelta},
    types::{
        Asset, Event, NATIVE_ADDRESS, TxQueue, TxStep, TxStepStatus, VoteInput,
    },
};

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
fn test_subscribers_see_merges_in_order() {
    let notifier = Arc::new(Notifier::new());
    let store = Store::new(Arc::clone(&notifier));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    notifier.subscribe(move |event| {
        sink.lock().unwrap().push(format!("{event:?}"));
    });

    store.merge(StoreDelta::base_assets(vec![asset(
        Address::with_last_byte(1),
        "A",
    )]));
    notifier.emit(Event::Configured);
    store.merge(StoreDelta::vest_nfts(vec![]));

    let seen = events.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "StoreUpdated");
    assert_eq!(seen[1], "Configured");
    assert_eq!(seen[2], "StoreUpdated");
}

#[test]
fn test_unsubscribed_callback_stops_receiving() {
    let notifier = Notifier::new();
    let count = Arc::new(Mutex::new(0usize));

    let sink = Arc::clone(&count);
    let id = notifier.subscribe(move |_| *sink.lock().unwrap() += 1);

    notifier.emit(Event::Configured);
    notifier.unsubscribe(id);
    notifier.emit(Event::Configured);

    assert_eq!(*count.lock().unwrap(), 1);
}

/// An approve-then-call chain where the allowance turns out to be
/// sufficient: the allowance step skips straight to Done, the primary
/// step walks the full lifecycle, and the record is terminal at the
/// end.
#[test]
fn test_record_with_skipped_allowance_step() {
    let token = asset(Address::with_last_byte(9), "TKN");
    let allowance = U256::from(1_000);
    let amount = U256::from(500);

    let mut allow = TxStep::new(format!("Checking your {} allowance", token.symbol));
    let mut swap = TxStep::new("Swap TKN for OTHER");
    let queue = TxQueue::new(
        "Swap TKN for OTHER",
        "Swap",
        "Swap Successful",
        vec![allow.clone(), swap.clone()],
    );
    assert!(!queue.is_terminal());

    assert!(!needs_approval(&token, allowance, amount));
    allow.advance(TxStepStatus::Done).unwrap();

    let hash = TxHash::with_last_byte(7);
    swap.advance(TxStepStatus::Pending).unwrap();
    swap.advance(TxStepStatus::Submitted(hash)).unwrap();
    swap.advance(TxStepStatus::Confirmed(hash)).unwrap();

    let finished = TxQueue::new(
        "Swap TKN for OTHER",
        "Swap",
        "Swap Successful",
        vec![allow, swap],
    );
    assert!(finished.is_terminal());
}

/// The native sentinel never produces an approval, regardless of
/// amount.
#[test]
fn test_native_sentinel_skips_approval() {
    let native = asset(NATIVE_ADDRESS, "ETH");
    assert!(!needs_approval(&native, U256::ZERO, U256::MAX));

    let erc20 = asset(Address::with_last_byte(1), "TKN");
    assert!(needs_approval(&erc20, U256::ZERO, U256::from(1)));
}

/// A rejected step freezes the whole record as terminal even with
/// later steps still waiting.
#[test]
fn test_rejection_terminates_record() {
    let mut first = TxStep::new("Approve");
    let second = TxStep::new("Swap");

    first.advance(TxStepStatus::Pending).unwrap();
    first
        .advance(TxStepStatus::Rejected("execution reverted".to_string()))
        .unwrap();

    let queue = TxQueue::new("Swap", "Swap", "Swap Successful", vec![first, second]);
    assert!(queue.is_terminal());
}

#[test]
fn test_slippage_scaled_minimum_out() {
    let quoted = U256::from(1_000_000u64);
    assert_eq!(min_after_slippage(quoted, "2"), U256::from(980_000u64));
    assert_eq!(min_after_slippage(quoted, "0.1"), U256::from(999_000u64));
}

#[test]
fn test_vote_preparation_for_submission() {
    let votes = vec![
        VoteInput {
            address: Address::with_last_byte(1),
            value: "60".to_string(),
        },
        VoteInput {
            address: Address::with_last_byte(2),
            value: "0".to_string(),
        },
        VoteInput {
            address: Address::with_last_byte(3),
            value: "-40".to_string(),
        },
    ];

    let (pools, weights) = prepare_votes(&votes).unwrap();
    assert_eq!(
        pools,
        vec![Address::with_last_byte(1), Address::with_last_byte(3)]
    );
    assert_eq!(weights[0].to_string(), "6000");
    assert_eq!(weights[1].to_string(), "-4000");
}
