#![forbid(unsafe_code)]

//! Hustings public facade crate.
//!
//! Re-exports the value-cell layer and the chart builders behind one
//! dependency, plus optional logging setup behind the `logging` feature.

#[cfg(feature = "logging")]
pub mod logging;

pub use hustings_charts as charts;
pub use hustings_reactive as reactive;

pub mod prelude {
    pub use hustings_charts::{
        AxisRange, Bar, BarChart, BarEntry, ChartError, DualEntry, Hemicycle, HemicycleChart,
        HemicycleLayout, Limit, Line, RangeFinder, ResultMap, Segment, Shade, SortOrder, Swing,
        SwingDisplay, SwingOutcome, Tiebreak, ValueFormat,
    };
    pub use hustings_reactive::{Publisher, Subscription, combine};
}
