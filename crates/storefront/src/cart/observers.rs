//! Observer registry for cart count changes.
//!
//! Observers are plain callbacks invoked in registration order. Delivery never
//! holds a lock while an observer runs, so observers may read the cart count,
//! subscribe or unsubscribe from inside their callback.
//!
//! Notifications are queued by the publisher and drained by whichever caller
//! gets to deliver first, which keeps delivery in publish order even when two
//! mutations settle at the same time on different threads.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

/// A change of the cart total, pushed to every observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CartNotification {
    /// Total number of units in the cart after the change.
    pub new_count: u32,
}

/// Callback invoked with each notification.
pub type Observer = Arc<dyn Fn(CartNotification) + Send + Sync>;

struct Entry {
    id: u64,
    observer: Observer,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct Shared {
    observers: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    queue: Mutex<VecDeque<CartNotification>>,
    delivering: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered list of cart observers.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish_non_exhaustive()
    }
}

impl ObserverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it receives every notification published from
    /// now on.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(CartNotification) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.shared.observers).push(Entry {
            id,
            observer: Arc::new(observer),
            active: Arc::clone(&active),
        });
        trace!(observer_id = id, "Cart observer added");

        Subscription {
            id,
            active,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.shared.observers).len()
    }

    /// Whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a notification. Call [`Self::flush`] once the state lock that
    /// produced it has been released.
    pub(crate) fn publish(&self, notification: CartNotification) {
        lock(&self.shared.queue).push_back(notification);
    }

    /// Deliver queued notifications.
    ///
    /// If another caller is already delivering, it drains this caller's
    /// notifications too and this call returns immediately.
    pub(crate) fn flush(&self) {
        loop {
            if self
                .shared
                .delivering
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            loop {
                let next = lock(&self.shared.queue).pop_front();
                let Some(notification) = next else { break };
                self.deliver(notification);
            }

            self.shared.delivering.store(false, Ordering::Release);

            // A publisher may have queued after our last pop but before the
            // flag was cleared, and bailed out because we were delivering.
            if lock(&self.shared.queue).is_empty() {
                return;
            }
        }
    }

    /// Publish and deliver in one step.
    #[cfg(test)]
    fn broadcast(&self, notification: CartNotification) {
        self.publish(notification);
        self.flush();
    }

    fn deliver(&self, notification: CartNotification) {
        let targets: Vec<(Observer, Arc<AtomicBool>)> = lock(&self.shared.observers)
            .iter()
            .map(|entry| (Arc::clone(&entry.observer), Arc::clone(&entry.active)))
            .collect();

        for (observer, active) in targets {
            // Skip observers removed by an earlier callback of this round.
            if active.load(Ordering::Acquire) {
                observer(notification);
            }
        }
    }
}

/// Handle returned by [`ObserverRegistry::subscribe`].
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] on teardown, or convert it with
/// [`Subscription::guard`] to unsubscribe on drop.
#[derive(Debug)]
#[must_use = "dropping a Subscription leaves the observer registered"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove exactly this observer. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.observers).retain(|entry| entry.id != self.id);
            trace!(observer_id = self.id, "Cart observer removed");
        }
    }

    /// Whether the observer is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.shared.strong_count() > 0
    }

    /// Convert into a guard that unsubscribes when dropped.
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Unsubscribes its observer when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard(Subscription);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<(u8, u32)>>>, impl Fn(u8) -> Observer) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for = Arc::clone(&log);
        let make = move |tag: u8| -> Observer {
            let log = Arc::clone(&log_for);
            Arc::new(move |n: CartNotification| lock(&log).push((tag, n.new_count)))
        };
        (log, make)
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let registry = ObserverRegistry::new();
        let (log, make) = recorder();
        let first = make(1);
        let second = make(2);
        let _a = registry.subscribe(move |n| first(n));
        let _b = registry.subscribe(move |n| second(n));

        registry.broadcast(CartNotification { new_count: 4 });

        assert_eq!(*lock(&log), vec![(1, 4), (2, 4)]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_targeted() {
        let registry = ObserverRegistry::new();
        let (log, make) = recorder();
        let first = make(1);
        let second = make(2);
        let a = registry.subscribe(move |n| first(n));
        let _b = registry.subscribe(move |n| second(n));

        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(registry.len(), 1);
        assert!(!a.is_active());

        registry.broadcast(CartNotification { new_count: 1 });
        assert_eq!(*lock(&log), vec![(2, 1)]);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_notifications() {
        let registry = ObserverRegistry::new();
        registry.broadcast(CartNotification { new_count: 9 });

        let (log, make) = recorder();
        let observer = make(1);
        let _sub = registry.subscribe(move |n| observer(n));
        registry.broadcast(CartNotification { new_count: 10 });

        assert_eq!(*lock(&log), vec![(1, 10)]);
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let registry = ObserverRegistry::new();
        {
            let _guard = registry.subscribe(|_| {}).guard();
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_observer_may_unsubscribe_a_later_one_mid_delivery() {
        let registry = ObserverRegistry::new();
        let (log, make) = recorder();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_ref = Arc::clone(&victim);
        let _killer = registry.subscribe(move |_| {
            if let Some(sub) = lock(&victim_ref).as_ref() {
                sub.unsubscribe();
            }
        });
        let second = make(2);
        *lock(&victim) = Some(registry.subscribe(move |n| second(n)));

        registry.broadcast(CartNotification { new_count: 3 });
        assert!(lock(&log).is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry = ObserverRegistry::new();
        let sub = registry.subscribe(|_| {});
        drop(registry);
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
