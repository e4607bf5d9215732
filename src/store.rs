//! Domain cache: the in-memory authoritative snapshot of session state.
//!
//! Single mutation entrypoint ([`Store::merge`]), read-by-many. Merges
//! are shallow and last-writer-wins per top-level slice; concurrent
//! refreshes racing on the same slice resolve to whichever merge runs
//! last. That stale-overwrite window is an accepted property of the
//! design, deliberately left without sequence-number guards.

use std::sync::{Arc, Mutex};

use crate::{
    notify::Notifier,
    types::{Asset, Event, Pair, ProtocolMetrics, Rewards, RouteAsset, VestNft},
};

/// Full cache state. Cloned out on read; entity collections are owned
/// here exclusively.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub base_assets: Vec<Asset>,
    pub route_assets: Vec<RouteAsset>,
    pub pairs: Vec<Pair>,
    pub gov_token: Option<Asset>,
    pub ve_token: Option<Asset>,
    pub vest_nfts: Vec<VestNft>,
    pub rewards: Rewards,
    pub metrics: ProtocolMetrics,
}

impl Snapshot {
    pub fn asset(&self, address: alloy::primitives::Address) -> Option<&Asset> {
        self.base_assets.iter().find(|a| a.address == address)
    }

    pub fn pair(&self, address: alloy::primitives::Address) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.address == address)
    }
}

/// Partial update: one optional entry per top-level slice.
#[derive(Clone, Debug, Default)]
pub struct StoreDelta {
    pub base_assets: Option<Vec<Asset>>,
    pub route_assets: Option<Vec<RouteAsset>>,
    pub pairs: Option<Vec<Pair>>,
    pub gov_token: Option<Asset>,
    pub ve_token: Option<Asset>,
    pub vest_nfts: Option<Vec<VestNft>>,
    pub rewards: Option<Rewards>,
    pub metrics: Option<ProtocolMetrics>,
}

impl StoreDelta {
    pub fn base_assets(assets: Vec<Asset>) -> Self {
        Self {
            base_assets: Some(assets),
            ..Default::default()
        }
    }

    pub fn pairs(pairs: Vec<Pair>) -> Self {
        Self {
            pairs: Some(pairs),
            ..Default::default()
        }
    }

    pub fn vest_nfts(nfts: Vec<VestNft>) -> Self {
        Self {
            vest_nfts: Some(nfts),
            ..Default::default()
        }
    }

    pub fn rewards(rewards: Rewards) -> Self {
        Self {
            rewards: Some(rewards),
            ..Default::default()
        }
    }
}

/// The domain cache. Mutation goes through [`Self::merge`] only; every
/// merge notifies subscribers with [`Event::StoreUpdated`] (no payload,
/// subscribers re-read).
pub struct Store {
    snapshot: Mutex<Snapshot>,
    notifier: Arc<Notifier>,
}

impl Store {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::default()),
            notifier,
        }
    }

    /// Current state of the whole cache.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().expect("store snapshot poisoned").clone()
    }

    pub fn base_assets(&self) -> Vec<Asset> {
        self.snapshot().base_assets
    }

    pub fn route_assets(&self) -> Vec<RouteAsset> {
        self.snapshot().route_assets
    }

    pub fn pairs(&self) -> Vec<Pair> {
        self.snapshot().pairs
    }

    pub fn vest_nfts(&self) -> Vec<VestNft> {
        self.snapshot().vest_nfts
    }

    /// Shallow-merges the delta: every `Some` slice replaces the
    /// current value of that slice wholesale, `None` slices are left
    /// untouched. Notifies subscribers afterwards.
    pub fn merge(&self, delta: StoreDelta) {
        {
            let mut snapshot = self.snapshot.lock().expect("store snapshot poisoned");
            if let Some(base_assets) = delta.base_assets {
                snapshot.base_assets = base_assets;
            }
            if let Some(route_assets) = delta.route_assets {
                snapshot.route_assets = route_assets;
            }
            if let Some(pairs) = delta.pairs {
                snapshot.pairs = pairs;
            }
            if let Some(gov_token) = delta.gov_token {
                snapshot.gov_token = Some(gov_token);
            }
            if let Some(ve_token) = delta.ve_token {
                snapshot.ve_token = Some(ve_token);
            }
            if let Some(vest_nfts) = delta.vest_nfts {
                snapshot.vest_nfts = vest_nfts;
            }
            if let Some(rewards) = delta.rewards {
                snapshot.rewards = rewards;
            }
            if let Some(metrics) = delta.metrics {
                snapshot.metrics = metrics;
            }
        }
        self.notifier.emit(Event::StoreUpdated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use fastnum::udec256;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn asset(symbol: &str) -> Asset {
        Asset {
            address: address!("0x4e71A2E537B7f9D9413D3991D37958c0b5e1e503"),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 18,
            balance: udec256!(0),
            whitelisted: true,
            local: false,
        }
    }

    #[test]
    fn test_merge_keeps_unrelated_slices() {
        let store = Store::new(Arc::new(Notifier::new()));

        store.merge(StoreDelta::base_assets(vec![asset("A")]));
        store.merge(StoreDelta {
            vest_nfts: Some(vec![]),
            ..Default::default()
        });

        let snapshot = store.snapshot();
        assert_eq!(snapshot.base_assets.len(), 1);
        assert_eq!(snapshot.base_assets[0].symbol, "A");
        assert!(snapshot.vest_nfts.is_empty());
    }

    #[test]
    fn test_merge_overwrites_only_named_slice() {
        let store = Store::new(Arc::new(Notifier::new()));

        store.merge(StoreDelta::base_assets(vec![asset("A")]));
        store.merge(StoreDelta {
            gov_token: Some(asset("GOV")),
            ..Default::default()
        });
        store.merge(StoreDelta::base_assets(vec![asset("B"), asset("C")]));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.base_assets.len(), 2);
        assert_eq!(snapshot.base_assets[0].symbol, "B");
        assert_eq!(snapshot.gov_token.unwrap().symbol, "GOV");
    }

    #[test]
    fn test_every_merge_notifies() {
        let notifier = Arc::new(Notifier::new());
        let store = Store::new(Arc::clone(&notifier));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        notifier.subscribe(move |event| {
            if matches!(event, Event::StoreUpdated) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.merge(StoreDelta::default());
        store.merge(StoreDelta::base_assets(vec![]));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
