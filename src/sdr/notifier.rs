//! Per-node subscriber lists for value-change and destruction events.
//!
//! Listeners are invoked synchronously, in registration order, on the thread that mutated
//! or destroyed the node, before the triggering call returns. Delivery iterates over a
//! snapshot of the subscriber list taken under the lock, so a listener may subscribe to or
//! unsubscribe from other nodes while it runs. A listener must not mutate the node that is
//! notifying it.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

/// An event delivered to the subscribers of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdrEvent {
    /// The node's value changed; fired once per successful mutating call.
    ValueChanged,
    /// The node is about to release its storage; fired exactly once.
    Destroyed,
}

/// Handle returned by a subscription, used to unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

/// A subscriber callback.
pub type Listener = Arc<dyn Fn(SdrEvent) + Send + Sync>;

/// Ordered collection of listeners attached to one node.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    next_token: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionToken, Listener)>>,
}

impl ChangeNotifier {
    /// Registers `listener` behind all existing subscribers.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        lock!(self.subscribers).push((token, listener));
        token
    }

    /// Removes the listener registered under `token`.
    ///
    /// Returns `false` if no such listener exists; calling it twice is harmless.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = lock!(self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != token);
        subscribers.len() != before
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        lock!(self.subscribers).len()
    }

    /// Delivers `event` to every listener in registration order.
    pub fn notify(&self, event: SdrEvent) {
        let snapshot: Vec<Listener> = lock!(self.subscribers)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    /// Delivers [`SdrEvent::Destroyed`] and drops every listener.
    pub fn notify_destroyed(&self) {
        let subscribers = std::mem::take(&mut *lock!(self.subscribers));
        for (_, listener) in subscribers {
            listener(SdrEvent::Destroyed);
        }
    }
}
