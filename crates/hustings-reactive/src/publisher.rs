#![forbid(unsafe_code)]

//! Value cell with synchronous, ordered change broadcast.
//!
//! # Design
//!
//! [`Publisher<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Arc<Mutex<..>>`). Every [`submit`](Publisher::submit) stores
//! the value and invokes every live subscriber, in registration order, on
//! the calling thread before returning.
//!
//! Unlike a change-detecting observable there is no equality check: an
//! equal value still bumps the version and still notifies. Live result feeds
//! routinely re-send identical snapshots and every downstream chart expects
//! to be re-run on each of them.
//!
//! # Performance
//!
//! | Operation     | Complexity                  |
//! |---------------|-----------------------------|
//! | `get()`       | O(1) + clone                |
//! | `submit()`    | O(S) where S = subscribers  |
//! | `subscribe()` | O(1) amortized + one call   |
//!
//! # Failure Modes
//!
//! - **Re-entrant access from `with`**: the closure passed to
//!   [`with`](Publisher::with) runs under the cell lock; calling back into
//!   the same cell from it deadlocks. Subscriber callbacks run outside the
//!   lock and may read or submit freely.
//! - **Cycles**: a cell that transitively feeds itself recurses without
//!   bound. Graphs are built from existing cells only, so a cycle cannot be
//!   constructed through the combinator API.
//! - **Subscriber leak**: callbacks live as long as their [`Subscription`]
//!   guard. Dead entries are pruned lazily during `submit()`.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CallbackWeak<T> = Weak<dyn Fn(&T) + Send + Sync>;

/// Shared interior for [`Publisher<T>`].
struct PublisherInner<T> {
    value: T,
    version: u64,
    /// Subscribers stored as weak references. Dead entries are pruned on submit.
    subscribers: Vec<CallbackWeak<T>>,
    /// Guards on the inputs of a derived cell. Never read, only kept alive.
    upstream: Vec<Subscription>,
}

/// A shared value cell that broadcasts every submitted value.
///
/// Cloning a `Publisher` creates a new handle to the **same** cell: both
/// handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each `submit` (equal values included).
/// 2. Subscribers are notified in registration order, synchronously.
/// 3. `subscribe` delivers the current value once before returning.
/// 4. A derived cell keeps its inputs alive for as long as it exists.
pub struct Publisher<T> {
    inner: Arc<Mutex<PublisherInner<T>>>,
}

// Manual Clone: shares the same Arc.
impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Publisher")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T> Publisher<T> {
    fn lock(&self) -> MutexGuard<'_, PublisherInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current version number. Increments by 1 on each submit.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Number of registered subscribers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub(crate) fn downgrade(&self) -> WeakPublisher<T> {
        WeakPublisher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Keep an input subscription alive for the lifetime of this cell.
    pub(crate) fn retain(&self, subscription: Subscription) {
        self.lock().upstream.push(subscription);
    }
}

impl<T: Clone + Send + 'static> Publisher<T> {
    /// Create a new cell holding `value`. The initial version is 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PublisherInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                upstream: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// The closure runs under the cell lock and must not touch this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    /// Store `value` and notify every live subscriber before returning.
    pub fn submit(&self, value: T) {
        let (callbacks, value, version) = {
            let mut inner = self.lock();
            inner.value = value;
            inner.version += 1;
            Self::live_callbacks(&mut inner)
        };
        tracing::trace!(
            message = "publisher.submit",
            version,
            subscribers = callbacks.len()
        );
        for callback in &callbacks {
            callback(&value);
        }
    }

    /// Modify the value in place, then notify as [`submit`](Self::submit) does.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let (callbacks, value, version) = {
            let mut inner = self.lock();
            f(&mut inner.value);
            inner.version += 1;
            Self::live_callbacks(&mut inner)
        };
        tracing::trace!(
            message = "publisher.update",
            version,
            subscribers = callbacks.len()
        );
        for callback in &callbacks {
            callback(&value);
        }
    }

    /// Subscribe to the cell. The callback is invoked once with the current
    /// value, then with every subsequently submitted value.
    ///
    /// Returns a [`Subscription`] guard; dropping it unsubscribes. The guard
    /// also keeps this cell alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let callback: Callback<T> = Arc::new(callback);
        let current = {
            let mut inner = self.lock();
            inner.subscribers.push(Arc::downgrade(&callback));
            inner.value.clone()
        };
        callback(&current);
        Subscription::new(callback, self.clone())
    }

    /// Register a callback for future submits only.
    pub(crate) fn attach(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let callback: Callback<T> = Arc::new(callback);
        self.lock().subscribers.push(Arc::downgrade(&callback));
        Subscription::new(callback, self.clone())
    }

    fn live_callbacks(inner: &mut PublisherInner<T>) -> (Vec<Callback<T>>, T, u64) {
        inner.subscribers.retain(|w| w.strong_count() > 0);
        let callbacks = inner
            .subscribers
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        (callbacks, inner.value.clone(), inner.version)
    }
}

/// Non-owning handle used by derived cells to reach their output.
pub(crate) struct WeakPublisher<T> {
    inner: Weak<Mutex<PublisherInner<T>>>,
}

impl<T> Clone for WeakPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakPublisher<T> {
    pub(crate) fn upgrade(&self) -> Option<Publisher<T>> {
        self.inner.upgrade().map(|inner| Publisher { inner })
    }
}

/// Lock a combinator's private state, tolerating poisoning.
pub(crate) fn lock_state<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong reference to the callback,
/// so the weak entry in the cell's subscriber list stops upgrading and is
/// pruned on the next submit.
pub struct Subscription {
    _guard: Box<dyn Any + Send + Sync>,
}

struct Guard<T> {
    _callback: Callback<T>,
    _source: Publisher<T>,
}

impl Subscription {
    fn new<T: Send + 'static>(callback: Callback<T>, source: Publisher<T>) -> Self {
        Self {
            _guard: Box::new(Guard {
                _callback: callback,
                _source: source,
            }),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
