#![forbid(unsafe_code)]

//! Two-party swing between a previous and a current result.
//!
//! `from` is the previous leader and `to` the current leader among the
//! remaining choices. The swing is half the difference of their share
//! changes. A negative swing is normalized by swapping the pair, so the
//! reported magnitude is never negative and always reads as a move toward
//! `to`.
//!
//! Left/right placement on a swingometer is not derived from the data. It
//! follows a caller-supplied total order over choices so the political axis
//! stays fixed while results stream in.
//!
//! # Failure Modes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Either map has no defined leader | [`SwingOutcome::NotAvailable`] |
//! | A share involved is `NaN` | [`SwingOutcome::NotAvailable`] |
//! | Share changes cancel exactly | [`SwingOutcome::NoSwing`] |
//! | Choice missing from one map | share treated as `0` |

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use hustings_reactive::Publisher;

use crate::results::{ResultMap, shares};

/// Default swingometer half-range: a 10 point swing pins the needle.
pub const DEFAULT_SWING_RANGE: f64 = 0.10;

/// Total order used to place choices left-to-right.
pub type ChoiceOrder<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Result of comparing two share maps.
#[derive(Debug, Clone, PartialEq)]
pub enum SwingOutcome<K> {
    /// Not enough defined data to name both choices.
    NotAvailable,
    /// Both choices are known and their share changes cancel out.
    NoSwing { from: K, to: K },
    /// `magnitude > 0`, measured toward `to`.
    Swing { from: K, to: K, magnitude: f64 },
}

impl<K> SwingOutcome<K> {
    /// Swing magnitude; `0` for no swing, `NaN` when unavailable.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        match self {
            Self::NotAvailable => f64::NAN,
            Self::NoSwing { .. } => 0.0,
            Self::Swing { magnitude, .. } => *magnitude,
        }
    }

    /// `(from, to)` when both choices are known.
    #[must_use]
    pub fn choices(&self) -> Option<(&K, &K)> {
        match self {
            Self::NotAvailable => None,
            Self::NoSwing { from, to } | Self::Swing { from, to, .. } => Some((from, to)),
        }
    }
}

/// Choice with the highest defined share, ties going to the first in `order`.
fn leader<'a, K: Eq + Hash>(
    shares: &'a ResultMap<K>,
    exclude: Option<&K>,
    order: &dyn Fn(&K, &K) -> Ordering,
) -> Option<&'a K> {
    shares
        .iter()
        .filter(|(key, share)| !share.is_nan() && Some(*key) != exclude)
        .max_by(|(ka, sa), (kb, sb)| sa.total_cmp(*sb).then_with(|| order(*kb, *ka)))
        .map(|(key, _)| key)
}

/// Compute the swing between two share maps.
#[must_use]
pub fn compute_swing<K>(
    previous: &ResultMap<K>,
    current: &ResultMap<K>,
    order: &dyn Fn(&K, &K) -> Ordering,
) -> SwingOutcome<K>
where
    K: Clone + Eq + Hash,
{
    let Some(from) = leader(previous, None, order) else {
        return SwingOutcome::NotAvailable;
    };
    let Some(to) = leader(current, Some(from), order) else {
        return SwingOutcome::NotAvailable;
    };

    let share = |map: &ResultMap<K>, key: &K| map.get(key).copied().unwrap_or(0.0);
    let from_delta = share(current, from) - share(previous, from);
    let to_delta = share(current, to) - share(previous, to);
    let swing = (to_delta - from_delta) / 2.0;

    let (from, to) = (from.clone(), to.clone());
    if swing.is_nan() {
        SwingOutcome::NotAvailable
    } else if swing == 0.0 {
        SwingOutcome::NoSwing { from, to }
    } else if swing < 0.0 {
        SwingOutcome::Swing {
            from: to,
            to: from,
            magnitude: -swing,
        }
    } else {
        SwingOutcome::Swing {
            from,
            to,
            magnitude: swing,
        }
    }
}

/// Swingometer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SwingConfig {
    /// Swing at which the needle reaches either end.
    pub range: f64,
    /// Inputs are already shares; skip the share-of-total conversion.
    pub normalized: bool,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_SWING_RANGE,
            normalized: false,
        }
    }
}

/// Renderer-facing swingometer state.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingDisplay<C> {
    pub left_color: Option<C>,
    pub right_color: Option<C>,
    /// Signed swing, positive toward the right-hand choice.
    pub value: f64,
    /// Needle position in `[-1, 1]`.
    pub position: f64,
    pub label: String,
}

impl<C> SwingDisplay<C> {
    fn unavailable() -> Self {
        Self {
            left_color: None,
            right_color: None,
            value: f64::NAN,
            position: 0.0,
            label: "NOT AVAILABLE".to_string(),
        }
    }
}

fn compose_display<K, C>(
    outcome: &SwingOutcome<K>,
    order: &dyn Fn(&K, &K) -> Ordering,
    color: &dyn Fn(&K) -> C,
    range: f64,
) -> SwingDisplay<C>
where
    K: fmt::Display,
{
    let Some((from, to)) = outcome.choices() else {
        return SwingDisplay::unavailable();
    };
    let to_is_right = order(from, to) != Ordering::Greater;
    let (left, right) = if to_is_right { (from, to) } else { (to, from) };

    let magnitude = outcome.magnitude();
    let value = if to_is_right { magnitude } else { -magnitude };
    let position = if range > 0.0 {
        (value / range).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let label = match outcome {
        SwingOutcome::Swing { .. } => format!(
            "{:.1}% SWING {} TO {}",
            magnitude * 100.0,
            from.to_string().to_uppercase(),
            to.to_string().to_uppercase()
        ),
        _ => "NO SWING".to_string(),
    };

    SwingDisplay {
        left_color: Some(color(left)),
        right_color: Some(color(right)),
        value,
        position,
        label,
    }
}

/// Named-parameter builder for a [`Swing`].
#[must_use]
pub struct SwingBuilder<K, C> {
    previous: Publisher<ResultMap<K>>,
    current: Publisher<ResultMap<K>>,
    order: ChoiceOrder<K>,
    color: Arc<dyn Fn(&K) -> C + Send + Sync>,
    config: SwingConfig,
}

impl<K, C> fmt::Debug for SwingBuilder<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwingBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<K, C> SwingBuilder<K, C>
where
    K: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    pub fn with_range(mut self, range: f64) -> Self {
        self.config.range = range;
        self
    }

    /// Treat inputs as shares rather than raw counts.
    pub fn normalized(mut self) -> Self {
        self.config.normalized = true;
        self
    }

    pub fn with_config(mut self, config: SwingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> Swing<K, C> {
        let SwingConfig { range, normalized } = self.config;
        let order = self.order;

        let outcome = {
            let order = Arc::clone(&order);
            self.previous
                .merge(&self.current, move |previous, current| {
                    let outcome = if normalized {
                        compute_swing(previous, current, &*order)
                    } else {
                        compute_swing(&shares(previous), &shares(current), &*order)
                    };
                    tracing::debug!(
                        message = "swing.compute",
                        magnitude = outcome.magnitude(),
                        available = outcome.choices().is_some()
                    );
                    outcome
                })
        };

        let color = self.color;
        let display = outcome.map(move |outcome| compose_display(outcome, &*order, &*color, range));

        Swing { outcome, display }
    }
}

/// Reactive swing between two result cells.
pub struct Swing<K, C> {
    outcome: Publisher<SwingOutcome<K>>,
    display: Publisher<SwingDisplay<C>>,
}

impl<K: fmt::Debug, C: fmt::Debug> fmt::Debug for Swing<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Swing")
            .field("outcome", &self.outcome)
            .field("display", &self.display)
            .finish()
    }
}

impl<K, C> Swing<K, C>
where
    K: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    /// Start a swing between `previous` and `current`.
    ///
    /// `order` fixes left-to-right placement; `color` maps a choice to its
    /// display colour.
    pub fn builder(
        previous: &Publisher<ResultMap<K>>,
        current: &Publisher<ResultMap<K>>,
        order: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
        color: impl Fn(&K) -> C + Send + Sync + 'static,
    ) -> SwingBuilder<K, C> {
        SwingBuilder {
            previous: previous.clone(),
            current: current.clone(),
            order: Arc::new(order),
            color: Arc::new(color),
            config: SwingConfig::default(),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> &Publisher<SwingOutcome<K>> {
        &self.outcome
    }

    #[must_use]
    pub fn display(&self) -> &Publisher<SwingDisplay<C>> {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&'static str, f64)]) -> ResultMap<&'static str> {
        entries.iter().copied().collect()
    }

    fn by_name(a: &&'static str, b: &&'static str) -> Ordering {
        a.cmp(b)
    }

    fn assert_swing(outcome: &SwingOutcome<&str>, from: &str, to: &str, magnitude: f64) {
        match outcome {
            SwingOutcome::Swing {
                from: f,
                to: t,
                magnitude: m,
            } => {
                assert_eq!((*f, *t), (from, to));
                assert!((m - magnitude).abs() < 1e-9, "magnitude {m} != {magnitude}");
            }
            other => panic!("expected a swing, got {other:?}"),
        }
    }

    #[test]
    fn two_party_scenario() {
        let previous = map(&[("X", 0.5), ("Y", 0.5)]);
        let current = map(&[("X", 0.4), ("Y", 0.6)]);
        assert_swing(&compute_swing(&previous, &current, &by_name), "X", "Y", 0.1);
    }

    #[test]
    fn negative_swing_swaps_choices() {
        let previous = map(&[("X", 0.6), ("Y", 0.4)]);
        let current = map(&[("X", 0.7), ("Y", 0.3)]);
        // X led before, Y is the best of the rest now; the move is toward X.
        assert_swing(&compute_swing(&previous, &current, &by_name), "Y", "X", 0.1);
    }

    #[test]
    fn cancelling_changes_are_no_swing() {
        let previous = map(&[("X", 0.6), ("Y", 0.4)]);
        let outcome = compute_swing(&previous, &previous, &by_name);
        assert_eq!(outcome, SwingOutcome::NoSwing { from: "X", to: "Y" });
        assert_eq!(outcome.magnitude(), 0.0);
    }

    #[test]
    fn empty_data_is_not_available() {
        let empty = map(&[]);
        let some = map(&[("X", 1.0)]);
        assert_eq!(compute_swing(&empty, &some, &by_name), SwingOutcome::NotAvailable);
        // Only the previous leader is present now.
        assert_eq!(compute_swing(&some, &some, &by_name), SwingOutcome::NotAvailable);
    }

    #[test]
    fn nan_shares_are_skipped_or_unavailable() {
        let previous = map(&[("X", f64::NAN), ("Y", 0.5), ("Z", 0.5)]);
        let current = map(&[("Y", 0.4), ("Z", 0.6)]);
        assert_swing(&compute_swing(&previous, &current, &by_name), "Y", "Z", 0.1);

        let current = map(&[("Y", f64::NAN), ("Z", 0.6)]);
        assert_eq!(
            compute_swing(&previous, &current, &by_name),
            SwingOutcome::NotAvailable
        );
    }

    #[test]
    fn missing_choice_counts_as_zero() {
        let previous = map(&[("X", 0.5), ("Y", 0.5)]);
        let current = map(&[("X", 0.5), ("Z", 0.5)]);
        // from = X (tie, first by name), to = Z: (0.5 - 0) - (0.5 - 0.5), halved.
        assert_swing(&compute_swing(&previous, &current, &by_name), "X", "Z", 0.25);
    }

    #[test]
    fn comparator_breaks_leader_ties() {
        let previous = map(&[("X", 0.5), ("Y", 0.5)]);
        let current = map(&[("X", 0.4), ("Y", 0.6)]);
        let reversed = |a: &&'static str, b: &&'static str| b.cmp(a);
        let outcome = compute_swing(&previous, &current, &reversed);
        // Y leads the tie now; X is the best of the rest and lost ground.
        assert_swing(&outcome, "X", "Y", 0.1);
    }

    #[test]
    fn reactive_swing_tracks_both_inputs() {
        let previous = Publisher::new(map(&[("lab", 50.0), ("con", 50.0)]));
        let current = Publisher::new(map(&[("lab", 50.0), ("con", 50.0)]));
        let swing = Swing::builder(&previous, &current, by_name, |k| k.len())
            .with_range(0.2)
            .build();
        assert_eq!(swing.display().get().label, "NO SWING");

        current.submit(map(&[("lab", 60.0), ("con", 40.0)]));
        let display = swing.display().get();
        assert_eq!(display.label, "10.0% SWING CON TO LAB");
        // "con" sorts left, so a move toward "lab" is positive.
        assert!((display.value - 0.1).abs() < 1e-9);
        assert!((display.position - 0.5).abs() < 1e-9);
        assert_eq!(display.left_color, Some(3));

        current.submit(map(&[("lab", 20.0), ("con", 80.0)]));
        let display = swing.display().get();
        assert_eq!(display.label, "30.0% SWING LAB TO CON");
        assert_eq!(display.position, -1.0);
    }

    #[test]
    fn reactive_swing_unavailable_until_data() {
        let previous = Publisher::new(map(&[]));
        let current = Publisher::new(map(&[]));
        let swing = Swing::builder(&previous, &current, by_name, |_| ())
            .normalized()
            .build();
        assert_eq!(swing.outcome().get(), SwingOutcome::NotAvailable);
        assert_eq!(swing.display().get().label, "NOT AVAILABLE");

        previous.submit(map(&[("X", 0.5), ("Y", 0.5)]));
        current.submit(map(&[("X", 0.4), ("Y", 0.6)]));
        assert_eq!(swing.display().get().label, "10.0% SWING X TO Y");
    }
}
