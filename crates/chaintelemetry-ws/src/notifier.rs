//! Ordered update observers.
//!
//! Observers run in registration order with the full node list after every
//! processed frame. A panicking observer is isolated: later observers still
//! run and the panic never reaches the connection task.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use chaintelemetry_core::NodeRecord;
use parking_lot::Mutex;

/// Callback invoked with the current node list.
pub type UpdateHandler = Arc<dyn Fn(&[NodeRecord]) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    handlers: BTreeMap<u64, UpdateHandler>,
}

/// Registry of update observers. Cheap to clone; clones share observers.
#[derive(Clone, Default)]
pub struct UpdateNotifier {
    inner: Arc<Mutex<Observers>>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. It stays registered until
    /// [`ObserverHandle::unsubscribe`] is called; dropping the handle does
    /// not remove it.
    pub fn register<F>(&self, handler: F) -> ObserverHandle
    where
        F: Fn(&[NodeRecord]) + Send + Sync + 'static,
    {
        let mut observers = self.inner.lock();
        let id = observers.next_id;
        observers.next_id += 1;
        observers.handlers.insert(id, Arc::new(handler));
        ObserverHandle {
            id,
            observers: Arc::downgrade(&self.inner),
        }
    }

    /// Call every observer with `nodes`. Returns how many of them panicked.
    pub fn publish(&self, nodes: &[NodeRecord]) -> usize {
        // Snapshot so observers may (un)register from inside a callback.
        let handlers: Vec<UpdateHandler> = self.inner.lock().handlers.values().cloned().collect();
        let mut failed = 0;
        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(nodes))).is_err() {
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UpdateNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateNotifier")
            .field("observers", &self.len())
            .finish()
    }
}

/// Returned by [`UpdateNotifier::register`]; removes the observer on
/// [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl ObserverHandle {
    /// Remove the observer. Returns `false` if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        match self.observers.upgrade() {
            Some(observers) => observers.lock().handlers.remove(&self.id).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn observers_run_in_registration_order() {
        let notifier = UpdateNotifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let calls = calls.clone();
            notifier.register(move |_nodes: &[NodeRecord]| calls.lock().push(i));
        }
        notifier.publish(&[]);
        notifier.publish(&[]);
        assert_eq!(*calls.lock(), [0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn unsubscribe_removes_only_that_observer() {
        let notifier = UpdateNotifier::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let (a2, b2) = (a.clone(), b.clone());
        let handle = notifier.register(move |_: &[NodeRecord]| {
            a2.fetch_add(1, Ordering::SeqCst);
        });
        notifier.register(move |_: &[NodeRecord]| {
            b2.fetch_add(1, Ordering::SeqCst);
        });

        notifier.publish(&[]);
        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe());
        notifier.publish(&[]);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn panicking_observer_does_not_block_others() {
        let notifier = UpdateNotifier::new();
        let reached = Arc::new(AtomicUsize::new(0));
        notifier.register(|_: &[NodeRecord]| panic!("observer failure"));
        let r = reached.clone();
        notifier.register(move |_: &[NodeRecord]| {
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(notifier.publish(&[]), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        // Still registered and still isolated on the next round.
        assert_eq!(notifier.publish(&[]), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observer_can_unsubscribe_itself() {
        let notifier = UpdateNotifier::new();
        let slot: Arc<Mutex<Option<ObserverHandle>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));
        let (s, c) = (slot.clone(), count.clone());
        let handle = notifier.register(move |_: &[NodeRecord]| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(h) = s.lock().as_ref() {
                h.unsubscribe();
            }
        });
        *slot.lock() = Some(handle);

        notifier.publish(&[]);
        notifier.publish(&[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(notifier.is_empty());
    }
}
