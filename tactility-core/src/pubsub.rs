//! In-process publish/subscribe.
//!
//! [`PubSub::publish`] calls every subscriber synchronously on the
//! publishing task, in subscription order, while holding the instance's
//! mutex. A subscriber that wants asynchronous delivery dispatches the value
//! to a [`Dispatcher`](crate::dispatcher::Dispatcher) itself.
//!
//! Subscriber callbacks must not call back into the same `PubSub` (subscribe,
//! unsubscribe or publish); doing so panics instead of deadlocking.
//!
//! # Example
//!
//! ```
//! use std::sync::mpsc;
//! use tactility_core::pubsub::PubSub;
//!
//! let (tx, rx) = mpsc::channel();
//! let pubsub = PubSub::new();
//! let handle = pubsub.subscribe(move |value: u32| tx.send(value).unwrap());
//! pubsub.publish(7);
//! pubsub.unsubscribe(handle);
//! pubsub.publish(8);
//! assert_eq!(rx.try_iter().collect::<Vec<_>>(), [7]);
//! ```

use crate::sync::{DataGuard, DataMutex};

/// Identifies one subscription; returned by [`PubSub::subscribe`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

type Callback<T> = Box<dyn Fn(T) + Send>;

struct Subscription<T> {
    id: u64,
    callback: Callback<T>,
}

struct Subscribers<T> {
    last_id: u64,
    items: Vec<Subscription<T>>,
}

/// Broadcasts values of type `T` to subscribed callbacks.
pub struct PubSub<T> {
    subscribers: DataMutex<Subscribers<T>>,
}

impl<T: Clone> PubSub<T> {
    pub fn new() -> Self {
        Self {
            subscribers: DataMutex::new(Subscribers {
                last_id: 0,
                items: Vec::new(),
            }),
        }
    }

    fn lock(&self, operation: &str) -> DataGuard<'_, Subscribers<T>> {
        assert!(
            !self.subscribers.is_held_by_current(),
            "PubSub::{operation} called from a subscriber callback"
        );
        self.subscribers.lock_forever()
    }

    /// Add `callback` to the subscriber list.
    ///
    /// Subscription ids start at 1 and are never reused.
    pub fn subscribe(&self, callback: impl Fn(T) + Send + 'static) -> SubscriptionHandle {
        let mut subscribers = self.lock("subscribe");
        subscribers.last_id += 1;
        let id = subscribers.last_id;
        subscribers.items.push(Subscription {
            id,
            callback: Box::new(callback),
        });
        SubscriptionHandle(id)
    }

    /// Remove a subscription.
    ///
    /// # Panics
    ///
    /// When `handle` is not subscribed (e.g. a second unsubscribe).
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut subscribers = self.lock("unsubscribe");
        let position = subscribers.items.iter().position(|item| item.id == handle.0);
        match position {
            Some(index) => {
                subscribers.items.remove(index);
            }
            None => panic!("subscription {} is not active", handle.0),
        }
    }

    /// Call every subscriber with a clone of `data`.
    pub fn publish(&self, data: T) {
        let subscribers = self.lock("publish");
        for item in &subscribers.items {
            (item.callback)(data.clone());
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock("subscriber_count").items.len()
    }
}

impl<T: Clone> Default for PubSub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for PubSub<T> {
    fn drop(&mut self) {
        let remaining = self.subscribers.get_mut().items.len();
        if remaining > 0 {
            log::warn!("PubSub dropped with {remaining} active subscription(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Subscriber = Box<dyn Fn(u32) + Send>;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Subscriber) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let subscriber = move |tag: &'static str| -> Subscriber {
            let sink = Arc::clone(&sink);
            Box::new(move |value: u32| sink.lock().unwrap().push(format!("{tag}:{value}")))
        };
        (log, subscriber)
    }

    #[test]
    fn publish_reaches_subscribers_in_order() {
        let (log, subscriber) = recorder();
        let pubsub = PubSub::new();
        let first = pubsub.subscribe(subscriber("c1"));
        let _second = pubsub.subscribe(subscriber("c2"));
        pubsub.publish(1);
        pubsub.unsubscribe(first);
        pubsub.publish(2);
        assert_eq!(*log.lock().unwrap(), ["c1:1", "c2:1", "c2:2"]);
    }

    #[test]
    fn ids_are_never_reused() {
        let pubsub = PubSub::<u32>::new();
        let first = pubsub.subscribe(|_| {});
        assert_eq!(first.id(), 1);
        pubsub.unsubscribe(first);
        let second = pubsub.subscribe(|_| {});
        assert_eq!(second.id(), 2);
        assert_eq!(pubsub.subscriber_count(), 1);
        pubsub.unsubscribe(second);
    }

    #[test]
    #[should_panic(expected = "is not active")]
    fn double_unsubscribe_panics() {
        let pubsub = PubSub::<u32>::new();
        let handle = pubsub.subscribe(|_| {});
        let id = handle.id();
        pubsub.unsubscribe(handle);
        pubsub.unsubscribe(SubscriptionHandle(id));
    }

    #[test]
    #[should_panic(expected = "from a subscriber callback")]
    fn reentrant_publish_panics() {
        let pubsub = Arc::new(PubSub::<u32>::new());
        let inner = Arc::downgrade(&pubsub);
        let _handle = pubsub.subscribe(move |value| {
            if let Some(pubsub) = inner.upgrade() {
                pubsub.publish(value + 1);
            }
        });
        pubsub.publish(1);
    }
}
