#![forbid(unsafe_code)]

//! Bar composition: raw per-entity values to renderer-facing segment lists.
//!
//! Three variants share one range feed into a [`RangeFinder`]:
//!
//! - **Basic**: one value per entity, one segment.
//! - **Dual**: two values per entity, three stacked segments. The value with
//!   the larger magnitude, or the second of a sign-opposed pair, is the
//!   outer segment so the inner one stays legible. Sign-opposed pairs use the
//!   lightened colour for both visible segments.
//! - **Dual reversed**: same direction predicates, with the base and
//!   lightened colours of the inner and outer segments swapped so emphasis
//!   falls on the outer value.
//!
//! Colours and shapes are opaque. The only operation performed on a colour is
//! [`Shade::lighten`], supplied by the caller's colour type.
//!
//! # Invariants
//!
//! 1. For a pair that is not sign-opposed, the segment values sum to the
//!    larger-magnitude value of the pair.
//! 2. Dual and dual-reversed bars built from the same pair flag the same
//!    pairs as sign-opposed.
//! 3. A `NaN` input yields a zero-length bar labelled
//!    [`AWAITING_DATA`](crate::format::AWAITING_DATA), never a `NaN` segment.
//! 4. Axis extremes cover every value of every entity plus zero.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use hustings_reactive::{Publisher, Subscription};

use crate::format::{AWAITING_DATA, ValueFormat};
use crate::range::{AxisRange, Limit, RangeFinder};

/// Colour operations the dual builders need from an otherwise opaque tag.
pub trait Shade: Clone + Send + Sync + 'static {
    /// A lighter variant of this colour, used for overlay segments.
    #[must_use]
    fn lighten(&self) -> Self;
}

/// One coloured run of a bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<C> {
    pub color: C,
    pub value: f64,
}

impl<C> Segment<C> {
    #[must_use]
    pub const fn new(color: C, value: f64) -> Self {
        Self { color, value }
    }
}

/// Renderer-facing bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar<C, S = ()> {
    pub label: String,
    pub value_label: String,
    pub shape: Option<S>,
    pub segments: Vec<Segment<C>>,
}

impl<C, S> Bar<C, S> {
    /// Sum of all segment values.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.segments.iter().map(|s| s.value).sum()
    }

    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.value_label == AWAITING_DATA
    }
}

/// Reference line drawn across a bar chart, e.g. a majority threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub value: f64,
    pub label: String,
}

/// Bar ordering. `NaN` values always sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SortOrder {
    Descending,
    Ascending,
}

impl SortOrder {
    fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Self::Descending => b.total_cmp(&a),
                Self::Ascending => a.total_cmp(&b),
            },
        }
    }
}

/// Which colour the inner segment of a dual bar takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DualOrder {
    /// Base colour inside, lightened overlay outside.
    #[default]
    BaseFirst,
    /// Lightened overlay inside, base colour outside.
    OverlayFirst,
}

/// Sign of a value with zero kept distinct.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Direction analysis of a dual pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualDirection {
    /// The two values have strictly opposite signs.
    pub different_directions: bool,
    /// `value1` is drawn inside `value2`.
    pub reverse: bool,
    /// Inner value.
    pub first: f64,
    /// Outer value.
    pub second: f64,
}

impl DualDirection {
    #[must_use]
    pub fn of(value1: f64, value2: f64) -> Self {
        let different_directions = sign(value1) * sign(value2) == -1.0;
        let reverse = different_directions || value1.abs() < value2.abs();
        let (first, second) = if reverse {
            (value1, value2)
        } else {
            (value2, value1)
        };
        Self {
            different_directions,
            reverse,
            first,
            second,
        }
    }

    /// Length of the outer segment beyond the inner one.
    #[must_use]
    pub fn outer_length(&self) -> f64 {
        if self.different_directions {
            self.second
        } else {
            self.second - self.first
        }
    }
}

/// The three stacked segments of a dual bar.
///
/// For a sign-opposed pair each segment is measured from zero, so the
/// segment lengths do not add up to a meaningful [`Bar::extent`].
#[must_use]
pub fn dual_segments<C: Shade>(color: &C, value1: f64, value2: f64, order: DualOrder) -> Vec<Segment<C>> {
    let direction = DualDirection::of(value1, value2);
    let lightened = color.lighten();
    let opposed_or = |plain: &C| {
        if direction.different_directions {
            lightened.clone()
        } else {
            plain.clone()
        }
    };
    let (inner, outer) = match order {
        DualOrder::BaseFirst => (opposed_or(color), lightened.clone()),
        DualOrder::OverlayFirst => (lightened.clone(), opposed_or(color)),
    };
    vec![
        Segment::new(color.clone(), 0.0),
        Segment::new(inner, direction.first),
        Segment::new(outer, direction.outer_length()),
    ]
}

/// A raw chart entry that knows how to become a [`Bar`].
pub trait BarSource: Clone + Send + Sync + 'static {
    type Color: Clone + Send + Sync + 'static;
    type Shape: Clone + Send + Sync + 'static;

    /// Every raw value, for axis extremes.
    fn values(&self) -> impl Iterator<Item = f64>;

    /// Value used when sorting bars.
    fn sort_key(&self) -> f64;

    fn compose(&self, order: DualOrder, format: &ValueFormat) -> Bar<Self::Color, Self::Shape>;
}

/// One value per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BarEntry<C, S = ()> {
    pub label: String,
    pub color: C,
    pub value: f64,
    pub value_label: Option<String>,
    pub shape: Option<S>,
}

impl<C, S> BarEntry<C, S> {
    #[must_use]
    pub fn new(label: impl Into<String>, color: C, value: f64) -> Self {
        Self {
            label: label.into(),
            color,
            value,
            value_label: None,
            shape: None,
        }
    }

    /// Override the formatted value label.
    #[must_use]
    pub fn with_value_label(mut self, value_label: impl Into<String>) -> Self {
        self.value_label = Some(value_label.into());
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: S) -> Self {
        self.shape = Some(shape);
        self
    }
}

impl<C, S> BarSource for BarEntry<C, S>
where
    C: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    type Color = C;
    type Shape = S;

    fn values(&self) -> impl Iterator<Item = f64> {
        std::iter::once(self.value)
    }

    fn sort_key(&self) -> f64 {
        self.value
    }

    fn compose(&self, _order: DualOrder, format: &ValueFormat) -> Bar<C, S> {
        if self.value.is_nan() {
            return awaiting(&self.label, &self.color, &self.shape);
        }
        Bar {
            label: self.label.clone(),
            value_label: self
                .value_label
                .clone()
                .unwrap_or_else(|| format.format(self.value)),
            shape: self.shape.clone(),
            segments: vec![Segment::new(self.color.clone(), self.value)],
        }
    }
}

/// Two values per entity, e.g. declared and projected, or low and high.
#[derive(Debug, Clone, PartialEq)]
pub struct DualEntry<C, S = ()> {
    pub label: String,
    pub color: C,
    pub value1: f64,
    pub value2: f64,
    pub value_label: Option<String>,
    pub shape: Option<S>,
}

impl<C, S> DualEntry<C, S> {
    #[must_use]
    pub fn new(label: impl Into<String>, color: C, value1: f64, value2: f64) -> Self {
        Self {
            label: label.into(),
            color,
            value1,
            value2,
            value_label: None,
            shape: None,
        }
    }

    #[must_use]
    pub fn with_value_label(mut self, value_label: impl Into<String>) -> Self {
        self.value_label = Some(value_label.into());
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: S) -> Self {
        self.shape = Some(shape);
        self
    }
}

impl<C, S> BarSource for DualEntry<C, S>
where
    C: Shade,
    S: Clone + Send + Sync + 'static,
{
    type Color = C;
    type Shape = S;

    fn values(&self) -> impl Iterator<Item = f64> {
        [self.value1, self.value2].into_iter()
    }

    /// Dual bars sort on the second value.
    fn sort_key(&self) -> f64 {
        self.value2
    }

    fn compose(&self, order: DualOrder, format: &ValueFormat) -> Bar<C, S> {
        if self.value1.is_nan() || self.value2.is_nan() {
            return awaiting(&self.label, &self.color, &self.shape);
        }
        Bar {
            label: self.label.clone(),
            value_label: self.value_label.clone().unwrap_or_else(|| {
                format!(
                    "{} / {}",
                    format.format(self.value1),
                    format.format(self.value2)
                )
            }),
            shape: self.shape.clone(),
            segments: dual_segments(&self.color, self.value1, self.value2, order),
        }
    }
}

fn awaiting<C: Clone, S: Clone>(label: &str, color: &C, shape: &Option<S>) -> Bar<C, S> {
    Bar {
        label: label.to_string(),
        value_label: AWAITING_DATA.to_string(),
        shape: shape.clone(),
        segments: vec![Segment::new(color.clone(), 0.0)],
    }
}

type LineLabel = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Named-parameter builder for a [`BarChart`].
///
/// The entry cell is required at construction; everything else defaults.
#[must_use]
pub struct BarChartBuilder<E> {
    entries: Publisher<Vec<E>>,
    order: DualOrder,
    limit: Option<Limit>,
    format: ValueFormat,
    sort: Option<SortOrder>,
    lines: Option<(Publisher<Vec<f64>>, LineLabel)>,
}

impl<E> fmt::Debug for BarChartBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarChartBuilder")
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("format", &self.format)
            .field("sort", &self.sort)
            .field("has_lines", &self.lines.is_some())
            .finish()
    }
}

impl<E: BarSource> BarChartBuilder<E> {
    fn new(entries: &Publisher<Vec<E>>, order: DualOrder) -> Self {
        Self {
            entries: entries.clone(),
            order,
            limit: None,
            format: ValueFormat::default(),
            sort: None,
            lines: None,
        }
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Reference lines, labelled by `label`. Lines do not widen the axis.
    pub fn with_lines(
        mut self,
        lines: &Publisher<Vec<f64>>,
        label: impl Fn(f64) -> String + Send + Sync + 'static,
    ) -> Self {
        self.lines = Some((lines.clone(), Arc::new(label)));
        self
    }

    /// Wire the chart. Every cell it exposes updates on each entry submit.
    #[must_use]
    pub fn build(self) -> BarChart<E::Color, E::Shape> {
        let range = match self.limit {
            Some(limit) => RangeFinder::with_limit(limit),
            None => RangeFinder::new(),
        };
        let values = self
            .entries
            .map(|entries: &Vec<E>| entries.iter().flat_map(|e| e.values()).collect());
        let feed = range.track(&values);

        let (order, format, sort) = (self.order, self.format, self.sort);
        let bars = self.entries.map(move |entries: &Vec<E>| {
            let mut sorted: Vec<&E> = entries.iter().collect();
            if let Some(sort) = sort {
                sorted.sort_by(|a, b| sort.compare(a.sort_key(), b.sort_key()));
            }
            let bars: Vec<_> = sorted.into_iter().map(|e| e.compose(order, &format)).collect();
            tracing::trace!(message = "bars.compose", count = bars.len(), ?order);
            bars
        });

        let lines = match self.lines {
            Some((cell, label)) => cell.map(move |values: &Vec<f64>| {
                values
                    .iter()
                    .map(|&value| Line {
                        value,
                        label: label(value),
                    })
                    .collect()
            }),
            None => Publisher::new(Vec::new()),
        };

        BarChart {
            bars,
            range,
            lines,
            _feed: feed,
        }
    }
}

/// Chart-ready cells for one bar chart.
pub struct BarChart<C, S = ()> {
    bars: Publisher<Vec<Bar<C, S>>>,
    range: RangeFinder,
    lines: Publisher<Vec<Line>>,
    _feed: Subscription,
}

impl<C: fmt::Debug, S: fmt::Debug> fmt::Debug for BarChart<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarChart")
            .field("bars", &self.bars)
            .field("range", &self.range)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl<C, S> BarChart<C, S>
where
    C: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    /// One value per entity.
    pub fn basic(entries: &Publisher<Vec<BarEntry<C, S>>>) -> BarChartBuilder<BarEntry<C, S>> {
        BarChartBuilder::new(entries, DualOrder::BaseFirst)
    }

    #[must_use]
    pub fn bars(&self) -> &Publisher<Vec<Bar<C, S>>> {
        &self.bars
    }

    /// Axis bounds, republished whenever the data or limit changes.
    #[must_use]
    pub fn range(&self) -> &Publisher<AxisRange> {
        self.range.range()
    }

    /// The underlying tracker, for changing the limit at runtime.
    #[must_use]
    pub fn range_finder(&self) -> &RangeFinder {
        &self.range
    }

    #[must_use]
    pub fn lines(&self) -> &Publisher<Vec<Line>> {
        &self.lines
    }
}

impl<C, S> BarChart<C, S>
where
    C: Shade,
    S: Clone + Send + Sync + 'static,
{
    /// Two values per entity, base colour inside.
    pub fn dual(entries: &Publisher<Vec<DualEntry<C, S>>>) -> BarChartBuilder<DualEntry<C, S>> {
        BarChartBuilder::new(entries, DualOrder::BaseFirst)
    }

    /// Two values per entity, lightened overlay inside.
    pub fn dual_reversed(
        entries: &Publisher<Vec<DualEntry<C, S>>>,
    ) -> BarChartBuilder<DualEntry<C, S>> {
        BarChartBuilder::new(entries, DualOrder::OverlayFirst)
    }
}
