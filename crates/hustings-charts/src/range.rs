#![forbid(unsafe_code)]

//! Axis range tracking for bar charts.
//!
//! A [`RangeFinder`] turns a declared [`Limit`] policy plus the observed data
//! [`Extremes`] into the published axis bounds a renderer uses to normalize
//! bar lengths.
//!
//! # Limit policies
//!
//! - [`Limit::Max`]: the axis runs from 0 to `max(m, highest)`, so a bar
//!   above the nominal maximum is never clipped.
//! - [`Limit::Wingspan`]: the axis is symmetric around zero with half-width
//!   `max(w, |highest|, |lowest|)`, for gain/loss charts.
//!
//! # Invariants
//!
//! 1. `highest >= 0 >= lowest`: extremes always include zero.
//! 2. Any change to the extremes or to either bound function republishes the
//!    range exactly once.
//! 3. Mutate-then-republish is serialized per instance, so a reader of
//!    [`RangeFinder::range`] never sees bounds computed from a half-applied
//!    update, and concurrent updates publish in the order they applied.
//! 4. The last applied limit wins; limits are never merged.
//! 5. Limits are validated before they are applied: a negative or
//!    non-finite bound is rejected and leaves the finder unchanged.
//!
//! # Failure Modes
//!
//! - **Re-entrant updates**: the state lock is released before subscribers
//!   run, so a subscriber on [`RangeFinder::range`] may read the finder.
//!   Mutating the same finder from such a subscriber deadlocks on the
//!   publish lock.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hustings_reactive::{Publisher, Subscription};

use crate::error::{ChartError, Result};

/// Declared axis-limit policy. Exactly one bound is set by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", try_from = "LimitRepr"))]
pub enum Limit {
    /// Axis from zero to at least this value.
    Max(f64),
    /// Symmetric axis of at least this half-width.
    Wingspan(f64),
}

impl Limit {
    #[must_use]
    pub const fn max(max: f64) -> Self {
        Self::Max(max)
    }

    #[must_use]
    pub const fn wingspan(wingspan: f64) -> Self {
        Self::Wingspan(wingspan)
    }

    /// Build a limit from optional fields, as read from loose configuration.
    ///
    /// # Errors
    ///
    /// [`ChartError::LimitMisconfigured`] unless exactly one field is set,
    /// [`ChartError::InvalidLimit`] if the bound is negative or not finite.
    pub fn from_parts(max: Option<f64>, wingspan: Option<f64>) -> Result<Self> {
        match (max, wingspan) {
            (Some(max), None) => Self::Max(max).validate(),
            (None, Some(wingspan)) => Self::Wingspan(wingspan).validate(),
            _ => Err(ChartError::LimitMisconfigured { max, wingspan }),
        }
    }

    /// Check the bound is finite and non-negative.
    ///
    /// # Errors
    ///
    /// [`ChartError::InvalidLimit`] otherwise.
    pub fn validate(self) -> Result<Self> {
        let value = self.bound();
        if value.is_finite() && value >= 0.0 {
            Ok(self)
        } else {
            Err(ChartError::InvalidLimit { value })
        }
    }

    /// The declared bound.
    #[must_use]
    pub const fn bound(self) -> f64 {
        match self {
            Self::Max(value) | Self::Wingspan(value) => value,
        }
    }

    /// Axis bounds this policy derives from `extremes`.
    #[must_use]
    pub fn axis(self, extremes: &Extremes) -> AxisRange {
        match self {
            Self::Max(max) => AxisRange::new(0.0, max.max(extremes.highest)),
            Self::Wingspan(wingspan) => {
                let half = wingspan
                    .max(extremes.highest.abs())
                    .max(extremes.lowest.abs());
                AxisRange::new(-half, half)
            }
        }
    }

    fn min_function(self) -> BoundFn {
        Arc::new(move |extremes: &Extremes| self.axis(extremes).min)
    }

    fn max_function(self) -> BoundFn {
        Arc::new(move |extremes: &Extremes| self.axis(extremes).max)
    }
}

/// Wire form of [`Limit`]; deserialization validates through
/// [`Limit::from_parts`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum LimitRepr {
    Max(f64),
    Wingspan(f64),
}

#[cfg(feature = "serde")]
impl TryFrom<LimitRepr> for Limit {
    type Error = ChartError;

    fn try_from(repr: LimitRepr) -> Result<Self> {
        match repr {
            LimitRepr::Max(max) => Self::from_parts(Some(max), None),
            LimitRepr::Wingspan(wingspan) => Self::from_parts(None, Some(wingspan)),
        }
    }
}

/// Raw data extremes. Both include zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extremes {
    pub highest: f64,
    pub lowest: f64,
}

impl Extremes {
    /// Max and min of zero and every observed value. `NaN` is ignored.
    #[must_use]
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        values
            .into_iter()
            .fold(Self::default(), |acc, value| Self {
                highest: acc.highest.max(value),
                lowest: acc.lowest.min(value),
            })
    }
}

/// Published axis bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Fraction of the axis at which `value` falls; 0 on a degenerate axis.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span > 0.0 {
            (value - self.min) / span
        } else {
            0.0
        }
    }
}

/// Derives one axis bound from the current extremes.
pub type BoundFn = Arc<dyn Fn(&Extremes) -> f64 + Send + Sync>;

struct RangeState {
    extremes: Extremes,
    min_fn: BoundFn,
    max_fn: BoundFn,
}

impl RangeState {
    fn axis(&self) -> AxisRange {
        AxisRange::new((self.min_fn)(&self.extremes), (self.max_fn)(&self.extremes))
    }
}

/// Incrementally maintained axis bounds.
///
/// Cloning shares the same state and published cells.
#[derive(Clone)]
pub struct RangeFinder {
    state: Arc<Mutex<RangeState>>,
    /// Held across mutate and submit; never taken by readers.
    publish: Arc<Mutex<()>>,
    range: Publisher<AxisRange>,
    min: Publisher<f64>,
    max: Publisher<f64>,
}

impl fmt::Debug for RangeFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RangeFinder")
            .field("extremes", &state.extremes)
            .field("range", &state.axis())
            .finish()
    }
}

impl Default for RangeFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeFinder {
    /// A finder with no limit: the axis spans exactly the extremes.
    #[must_use]
    pub fn new() -> Self {
        let state = RangeState {
            extremes: Extremes::default(),
            min_fn: Arc::new(|e: &Extremes| e.lowest),
            max_fn: Arc::new(|e: &Extremes| e.highest),
        };
        let range = Publisher::new(state.axis());
        let min = range.map(|r| r.min);
        let max = range.map(|r| r.max);
        Self {
            state: Arc::new(Mutex::new(state)),
            publish: Arc::new(Mutex::new(())),
            range,
            min,
            max,
        }
    }

    /// A finder governed by `limit` from the start.
    ///
    /// An invalid limit is logged and ignored, as by
    /// [`apply_limit`](Self::apply_limit).
    #[must_use]
    pub fn with_limit(limit: Limit) -> Self {
        let finder = Self::new();
        finder.apply_limit(limit);
        finder
    }

    /// A finder governed by `limit`, refusing an invalid one.
    ///
    /// # Errors
    ///
    /// [`ChartError::InvalidLimit`] if the bound is negative or not finite.
    pub fn try_with_limit(limit: Limit) -> Result<Self> {
        let finder = Self::new();
        finder.try_apply_limit(limit)?;
        Ok(finder)
    }

    fn lock(&self) -> MutexGuard<'_, RangeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the state, then republish after releasing it.
    ///
    /// The publish lock spans both steps so updates from different threads
    /// reach subscribers in the order they were applied.
    fn transact(&self, mutate: impl FnOnce(&mut RangeState)) {
        let _publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let axis = {
            let mut state = self.lock();
            mutate(&mut state);
            state.axis()
        };
        self.range.submit(axis);
    }

    /// Replace both bound functions with those of `limit`.
    ///
    /// An invalid limit is logged and ignored.
    pub fn apply_limit(&self, limit: Limit) {
        if let Err(error) = self.try_apply_limit(limit) {
            tracing::warn!(message = "range.limit_rejected", %error);
        }
    }

    /// Replace both bound functions with those of `limit`.
    ///
    /// # Errors
    ///
    /// [`ChartError::InvalidLimit`] if the bound is negative or not finite;
    /// the finder is left unchanged.
    pub fn try_apply_limit(&self, limit: Limit) -> Result<()> {
        let limit = limit.validate()?;
        tracing::debug!(message = "range.limit", ?limit);
        self.transact(|state| {
            state.min_fn = limit.min_function();
            state.max_fn = limit.max_function();
        });
        Ok(())
    }

    pub fn set_min_function(&self, f: impl Fn(&Extremes) -> f64 + Send + Sync + 'static) {
        self.transact(|state| state.min_fn = Arc::new(f));
    }

    pub fn set_max_function(&self, f: impl Fn(&Extremes) -> f64 + Send + Sync + 'static) {
        self.transact(|state| state.max_fn = Arc::new(f));
    }

    pub fn set_highest(&self, highest: f64) {
        self.transact(|state| state.extremes.highest = highest);
    }

    pub fn set_lowest(&self, lowest: f64) {
        self.transact(|state| state.extremes.lowest = lowest);
    }

    /// Replace both extremes in one update.
    pub fn set_extremes(&self, extremes: Extremes) {
        self.transact(|state| state.extremes = extremes);
    }

    /// Recompute the extremes from a full set of observed values.
    pub fn observe(&self, values: impl IntoIterator<Item = f64>) {
        self.set_extremes(Extremes::of(values));
    }

    /// Feed the finder from a cell of observed values.
    ///
    /// The returned guard keeps the feed alive.
    pub fn track(&self, values: &Publisher<Vec<f64>>) -> Subscription {
        let finder = self.clone();
        values.subscribe(move |values| finder.observe(values.iter().copied()))
    }

    #[must_use]
    pub fn extremes(&self) -> Extremes {
        self.lock().extremes
    }

    /// Both bounds, republished on every change.
    #[must_use]
    pub fn range(&self) -> &Publisher<AxisRange> {
        &self.range
    }

    #[must_use]
    pub fn min(&self) -> &Publisher<f64> {
        &self.min
    }

    #[must_use]
    pub fn max(&self) -> &Publisher<f64> {
        &self.max
    }
}
