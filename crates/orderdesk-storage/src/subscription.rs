//! Subscription guards and listener registries
//!
//! Every `subscribe` in this workspace returns a [`Subscription`]. The guard
//! owns the teardown closure; it runs once, either on [`Subscription::cancel`]
//! or on drop.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Teardown = Box<dyn FnOnce() + Send + Sync>;

/// Handle for an active subscription
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Teardown>,
}

impl Subscription {
    /// Create subscription with a teardown closure
    #[inline]
    pub fn new(teardown: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Subscription with nothing to tear down
    #[inline]
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// Unsubscribe now
    #[inline]
    pub fn cancel(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Registry of listeners keyed by registration order
///
/// Listeners are cloned out before they are invoked, so a listener may
/// subscribe or unsubscribe from inside its own callback.
pub struct ListenerSet<T> {
    inner: Arc<ListenerSetInner<T>>,
}

struct ListenerSetInner<T> {
    next_id: AtomicU64,
    listeners: DashMap<u64, T>,
}

impl<T: Clone + Send + Sync + 'static> ListenerSet<T> {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ListenerSetInner {
                next_id: AtomicU64::new(1),
                listeners: DashMap::new(),
            }),
        }
    }

    /// Register a listener
    pub fn insert(&self, listener: T) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, listener);

        let weak: Weak<ListenerSetInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.remove(&id);
            }
        })
    }

    /// Registered listeners in registration order
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        let mut entries: Vec<(u64, T)> = self
            .inner
            .listeners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, listener)| listener).collect()
    }

    /// Number of registered listeners
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Check if no listener is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.listeners.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}
