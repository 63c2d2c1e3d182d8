// ── Typed subscriber registry ──
//
// One generic callback registry shared by the connection and every domain
// adapter. Callbacks run in subscription order; the returned handle removes
// the callback on `unsubscribe()` or on drop.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A set of callbacks interested in values of type `T`.
///
/// Cloning yields another handle to the same registry.
pub struct Subscribers<T> {
    registry: Arc<Registry<T>>,
}

struct Registry<T> {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<u64, Callback<T>>>,
}

impl<T> Registry<T> {
    fn callbacks(&self) -> MutexGuard<'_, BTreeMap<u64, Callback<T>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Type-erased removal so a [`Subscription`] does not carry `T`.
trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

impl<T: 'static> Unregister for Registry<T> {
    fn unregister(&self, id: u64) {
        self.callbacks().remove(&id);
    }
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                callbacks: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Register `callback`. It stays registered until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.callbacks().insert(id, Arc::new(callback));

        let registry: Arc<dyn Unregister> = self.registry.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Invoke every registered callback with `value`.
    ///
    /// The callback list is snapshotted first, so callbacks may subscribe,
    /// unsubscribe or emit without deadlocking.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self.registry.callbacks().values().cloned().collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.callbacks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.callbacks().is_empty()
    }
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Handle returned by every `subscribe` call in this workspace.
///
/// `unsubscribe()` is idempotent. Dropping the handle unsubscribes too,
/// so keep it alive for as long as the callback should fire.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unregister>,
}

impl Subscription {
    /// Stop receiving callbacks. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Subscribers<u32>) {
        (Arc::new(Mutex::new(Vec::new())), Subscribers::new())
    }

    #[test]
    fn emits_in_subscription_order() {
        let (log, subs) = recorder();

        let first = {
            let log = Arc::clone(&log);
            subs.subscribe(move |v| log.lock().unwrap().push(format!("a{v}")))
        };
        let second = {
            let log = Arc::clone(&log);
            subs.subscribe(move |v| log.lock().unwrap().push(format!("b{v}")))
        };

        subs.emit(&1);
        subs.emit(&2);

        assert_eq!(*log.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
        drop((first, second));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let (log, subs) = recorder();
        let sub = {
            let log = Arc::clone(&log);
            subs.subscribe(move |v| log.lock().unwrap().push(v.to_string()))
        };
        assert_eq!(subs.len(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        subs.emit(&7);

        assert!(subs.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let (log, subs) = recorder();
        {
            let log = Arc::clone(&log);
            let _sub = subs.subscribe(move |v| log.lock().unwrap().push(v.to_string()));
            subs.emit(&1);
        }
        subs.emit(&2);

        assert_eq!(*log.lock().unwrap(), vec!["1"]);
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let subs: Subscribers<u32> = Subscribers::new();
        let sub = subs.subscribe(|_| {});
        drop(subs);
        sub.unsubscribe();
    }

    #[test]
    fn callbacks_may_unsubscribe_others_while_emitting() {
        let subs: Subscribers<u32> = Subscribers::new();
        let victim = Arc::new(Mutex::new(None::<Subscription>));
        let hits = Arc::new(AtomicU64::new(0));

        let killer = {
            let victim = Arc::clone(&victim);
            subs.subscribe(move |_| {
                victim.lock().unwrap().take();
            })
        };
        *victim.lock().unwrap() = Some({
            let hits = Arc::clone(&hits);
            subs.subscribe(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        });

        // The snapshot taken before dispatch still includes the victim.
        subs.emit(&0);
        subs.emit(&0);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(subs.len(), 1);
        drop(killer);
    }
}
