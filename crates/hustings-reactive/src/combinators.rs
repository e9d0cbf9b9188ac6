#![forbid(unsafe_code)]

//! Derived cells that re-emit eagerly whenever an input changes.
//!
//! # Design
//!
//! Every combinator returns a fresh [`Publisher`] whose value is computed
//! from its inputs at construction and recomputed on every input submit.
//! The derived cell owns the subscription guards on its inputs, so its
//! lifetime is tied to theirs: dropping the last handle to a derived cell
//! detaches it, while holding it keeps the whole upstream chain alive.
//!
//! Multi-input combinators keep the latest value of each input behind one
//! mutex. Storing the new input, recomputing and republishing happen under
//! that single lock, so a concurrent update of the other input can never
//! interleave between the store and the publish.
//!
//! # Invariants
//!
//! 1. A derived cell's value always equals the combining function applied to
//!    the most recently seen value of every input.
//! 2. Each input submit produces exactly one output submit (no batching,
//!    no glitch suppression).
//! 3. [`flatten`](Publisher::flatten) follows only the currently selected
//!    inner cell. No value from a previously selected inner cell is
//!    delivered after the switch.

use std::sync::{Arc, Mutex};

use crate::publisher::{Publisher, Subscription, WeakPublisher, lock_state};

impl<T: Clone + Send + 'static> Publisher<T> {
    /// Derive a cell that re-emits `f(input)` whenever this cell changes.
    pub fn map<U, F>(&self, f: F) -> Publisher<U>
    where
        U: Clone + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let out = Publisher::new(f(&self.get()));
        let target = out.downgrade();
        let sub = self.attach(move |value| {
            if let Some(out) = target.upgrade() {
                out.submit(f(value));
            }
        });
        out.retain(sub);
        out
    }

    /// Derive a cell combining the latest values of `self` and `other`.
    ///
    /// Re-emits whenever either input changes, pairing the new value with
    /// the other input's most recently seen value.
    pub fn merge<U, R, F>(&self, other: &Publisher<U>, f: F) -> Publisher<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: Fn(&T, &U) -> R + Send + Sync + 'static,
    {
        let latest = Arc::new(Mutex::new((self.get(), other.get())));
        let f = Arc::new(f);
        let out = {
            let guard = lock_state(&latest);
            Publisher::new(f(&guard.0, &guard.1))
        };

        let left = {
            let latest = Arc::clone(&latest);
            let f = Arc::clone(&f);
            let target = out.downgrade();
            self.attach(move |value: &T| {
                let Some(out) = target.upgrade() else {
                    return;
                };
                let mut guard = lock_state(&latest);
                guard.0 = value.clone();
                let merged = f(&guard.0, &guard.1);
                out.submit(merged);
            })
        };
        let right = {
            let target = out.downgrade();
            other.attach(move |value: &U| {
                let Some(out) = target.upgrade() else {
                    return;
                };
                let mut guard = lock_state(&latest);
                guard.1 = value.clone();
                let merged = f(&guard.0, &guard.1);
                out.submit(merged);
            })
        };

        out.retain(left);
        out.retain(right);
        out
    }

    /// Map this cell to a cell, then follow whichever cell is selected.
    ///
    /// Equivalent to `self.map(f).flatten()`.
    pub fn compose<U, F>(&self, f: F) -> Publisher<U>
    where
        U: Clone + Send + 'static,
        F: Fn(&T) -> Publisher<U> + Send + Sync + 'static,
    {
        self.map(f).flatten()
    }
}

impl<T: Clone + Send + 'static> Publisher<Publisher<T>> {
    /// Flatten a cell of cells into a cell tracking the selected inner cell.
    ///
    /// On every outer update the subscription to the previous inner cell is
    /// dropped, a subscription to the new one is installed, and the new inner
    /// cell's current value is republished immediately. Nothing from the old
    /// inner cell is retained.
    #[must_use]
    pub fn flatten(&self) -> Publisher<T> {
        let selected = self.get();
        let out = Publisher::new(selected.get());
        let slot = Arc::new(Mutex::new(Some(forward(&selected, out.downgrade()))));

        let target = out.downgrade();
        let sub = self.attach(move |inner: &Publisher<T>| {
            let Some(out) = target.upgrade() else {
                return;
            };
            let mut guard = lock_state(&slot);
            // Detach before attaching so the old cell can no longer reach `out`.
            guard.take();
            *guard = Some(forward(inner, out.downgrade()));
            let value = inner.get();
            out.submit(value);
        });
        out.retain(sub);
        out
    }
}

fn forward<T: Clone + Send + 'static>(inner: &Publisher<T>, target: WeakPublisher<T>) -> Subscription {
    inner.attach(move |value: &T| {
        if let Some(out) = target.upgrade() {
            out.submit(value.clone());
        }
    })
}

impl<T: Clone + Send + 'static> Publisher<Vec<T>> {
    /// Derive a list cell by mapping every element.
    pub fn map_elements<U, F>(&self, f: F) -> Publisher<Vec<U>>
    where
        U: Clone + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.map(move |items| items.iter().map(&f).collect())
    }

    /// Derive a cell folding the list with `fold`, starting from `identity`.
    pub fn reduce<R, F>(&self, identity: R, fold: F) -> Publisher<R>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(R, &T) -> R + Send + Sync + 'static,
    {
        self.map(move |items| items.iter().fold(identity.clone(), &fold))
    }
}

/// Turn a list of cells into one cell carrying the list of latest values.
///
/// Re-emits whenever any member changes. An empty list yields a cell that
/// holds an empty list forever.
#[must_use]
pub fn combine<T: Clone + Send + 'static>(cells: &[Publisher<T>]) -> Publisher<Vec<T>> {
    let latest = Arc::new(Mutex::new(
        cells.iter().map(Publisher::get).collect::<Vec<_>>(),
    ));
    let out = Publisher::new(lock_state(&latest).clone());

    for (index, cell) in cells.iter().enumerate() {
        let latest = Arc::clone(&latest);
        let target = out.downgrade();
        let sub = cell.attach(move |value: &T| {
            let Some(out) = target.upgrade() else {
                return;
            };
            let mut guard = lock_state(&latest);
            guard[index] = value.clone();
            out.submit(guard.clone());
        });
        out.retain(sub);
    }
    out
}
