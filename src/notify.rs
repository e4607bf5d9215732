//! Publish/subscribe bus decoupling cache mutation and transaction
//! lifecycle from UI re-render triggers.
//!
//! Delivery is synchronous, in subscription order, in-process only: no
//! persistence, no replay. Each emit reads the subscriber list at its
//! start, so an emit performed from inside a callback observes the
//! list as it stands at that moment.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use crate::types::Event;

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`Notifier::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Notifier {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .expect("notifier subscribers poisoned")
            .push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .expect("notifier subscribers poisoned")
            .retain(|(sub_id, _)| *sub_id != id);
    }

    /// Invokes all current subscribers with the event, in subscription
    /// order. The lock is held only while reading the list, never
    /// across a callback, so callbacks are free to subscribe,
    /// unsubscribe or emit re-entrantly.
    pub fn emit(&self, event: Event) {
        let subscribers: Vec<Callback> = self
            .subscribers
            .lock()
            .expect("notifier subscribers poisoned")
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in subscribers {
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collected() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let push = {
            let log = Arc::clone(&log);
            move |entry: &str| log.lock().unwrap().push(entry.to_string())
        };
        (log, push)
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let notifier = Notifier::new();
        let (log, push) = collected();

        let push_a = push.clone();
        notifier.subscribe(move |_| push_a("a"));
        let push_b = push.clone();
        notifier.subscribe(move |_| push_b("b"));
        let push_c = push;
        notifier.subscribe(move |_| push_c("c"));

        notifier.emit(Event::StoreUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribed_not_invoked() {
        let notifier = Notifier::new();
        let (log, push) = collected();

        let push_a = push.clone();
        let id = notifier.subscribe(move |_| push_a("a"));
        let push_b = push;
        notifier.subscribe(move |_| push_b("b"));

        notifier.unsubscribe(id);
        notifier.emit(Event::StoreUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_reentrant_emit_sees_current_list() {
        let notifier = Arc::new(Notifier::new());
        let (log, push) = collected();

        let inner = Arc::clone(&notifier);
        let push_outer = push.clone();
        notifier.subscribe(move |event| {
            if matches!(event, Event::Configured) {
                push_outer("outer");
                inner.emit(Event::StoreUpdated);
            }
        });
        let push_inner = push;
        notifier.subscribe(move |event| {
            if matches!(event, Event::StoreUpdated) {
                push_inner("inner");
            }
        });

        notifier.emit(Event::Configured);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }
}
