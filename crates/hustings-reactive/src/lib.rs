#![forbid(unsafe_code)]

//! Push-based reactive value cells.
//!
//! This crate provides the propagation layer that sits between incoming
//! result feeds and the chart builders:
//!
//! - [`Publisher`]: a shared value cell that broadcasts every submitted
//!   value to its subscribers.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - Combinators: [`Publisher::map`], [`Publisher::merge`], [`combine`],
//!   [`Publisher::flatten`] and [`Publisher::compose`], plus the list
//!   helpers [`Publisher::map_elements`] and [`Publisher::reduce`].
//!
//! # Architecture
//!
//! `Publisher<T>` uses `Arc<Mutex<..>>` so cells can be fed from any thread.
//! Subscribers are stored as `Weak` callbacks and pruned lazily. Propagation
//! is synchronous and depth-first: `submit` returns only after every
//! transitive subscriber has run.
//!
//! # Invariants
//!
//! 1. Every submit notifies, equal values included. There is no batching,
//!    coalescing or deduplication: N submits produce N propagation passes.
//! 2. Subscribers are notified in registration order on the calling thread.
//! 3. `subscribe` delivers the current value once before returning.
//! 4. Derived cells hold no state beyond the latest value of each input.

pub mod combinators;
pub mod publisher;

pub use combinators::combine;
pub use publisher::{Publisher, Subscription};
