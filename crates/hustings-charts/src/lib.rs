#![forbid(unsafe_code)]

//! Chart-ready values derived from streaming election results.
//!
//! Every builder here consumes [`hustings_reactive::Publisher`] cells and
//! exposes cells of its own, so a renderer only ever reads the latest value:
//!
//! - [`range`]: axis bounds from a [`Limit`] policy and observed extremes.
//! - [`bar`]: basic, dual and dual-reversed bar composition.
//! - [`swing`]: previous-vs-current swing between two leading choices.
//! - [`hemicycle`]: contiguous seat clusters on a hemicycle grid.
//!
//! Data problems never panic. `NaN` renders as
//! [`AWAITING_DATA`](format::AWAITING_DATA), missing choices give
//! [`SwingOutcome::NotAvailable`], and invalid configuration is reported as
//! a [`ChartError`].

pub mod bar;
pub mod error;
pub mod format;
pub mod hemicycle;
pub mod range;
pub mod results;
pub mod swing;

pub use bar::{Bar, BarChart, BarEntry, DualEntry, Line, Segment, Shade, SortOrder};
pub use error::{ChartError, Result};
pub use format::{AWAITING_DATA, ValueFormat};
pub use hemicycle::{Hemicycle, HemicycleChart, HemicycleConfig, HemicycleLayout, Tiebreak};
pub use range::{AxisRange, Extremes, Limit, RangeFinder};
pub use results::{ResultMap, shares, total};
pub use swing::{Swing, SwingConfig, SwingDisplay, SwingOutcome, compute_swing};
