//! Property-based invariant tests for bar composition.
//!
//! 1. Same-direction pairs: segments stack to the larger-magnitude value and
//!    reconstruct the pair.
//! 2. Sign-opposed pairs: each value is drawn as its own segment.
//! 3. Dual and dual-reversed flag the same pairs as sign-opposed.
//! 4. Basic bars carry their value unchanged, and sorting is a permutation.
//! 5. Bar axis extremes cover every value of every entity.

use hustings_charts::bar::{DualDirection, DualOrder, dual_segments};
use hustings_charts::{BarChart, BarEntry, DualEntry, Shade, SortOrder};
use hustings_reactive::Publisher;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tone {
    Base,
    Light,
}

impl Shade for Tone {
    fn lighten(&self) -> Self {
        Tone::Light
    }
}

fn value() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), -1000.0f64..1000.0]
}

fn lightened(order: DualOrder, v1: f64, v2: f64) -> Vec<bool> {
    dual_segments(&Tone::Base, v1, v2, order)
        .iter()
        .map(|s| s.color == Tone::Light)
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. segment values
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dual_segments_reconstruct_pair(v1 in value(), v2 in value()) {
        let direction = DualDirection::of(v1, v2);
        let segments = dual_segments(&Tone::Base, v1, v2, DualOrder::BaseFirst);
        prop_assert_eq!(segments.len(), 3);
        prop_assert_eq!(segments[0].value, 0.0);

        if direction.different_directions {
            prop_assert_eq!(segments[1].value, v1);
            prop_assert_eq!(segments[2].value, v2);
        } else {
            let inner = segments[1].value;
            let outer = inner + segments[2].value;
            let larger = if v1.abs() < v2.abs() { v2 } else { v1 };
            prop_assert!((outer - larger).abs() <= 1e-9 * larger.abs().max(1.0));
            prop_assert!(inner.abs() <= larger.abs());
            let smaller = if v1.abs() < v2.abs() { v1 } else { v2 };
            prop_assert_eq!(inner, smaller);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. consistent flags
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dual_and_reversed_agree_on_sign_flips(v1 in value(), v2 in value()) {
        let opposed = DualDirection::of(v1, v2).different_directions;
        let base = lightened(DualOrder::BaseFirst, v1, v2);
        let overlay = lightened(DualOrder::OverlayFirst, v1, v2);

        prop_assert!(!base[0] && !overlay[0]);
        if opposed {
            prop_assert_eq!(&base[1..], &[true, true]);
            prop_assert_eq!(&overlay[1..], &[true, true]);
        } else {
            prop_assert_eq!(&base[1..], &[false, true]);
            prop_assert_eq!(&overlay[1..], &[true, false]);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. basic bars
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sorted_basic_bars_are_a_permutation(values in proptest::collection::vec(value(), 0..20)) {
        let entries = Publisher::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| BarEntry::<_, ()>::new(format!("E{i}"), Tone::Base, *v))
                .collect::<Vec<_>>(),
        );
        let chart = BarChart::basic(&entries).with_sort(SortOrder::Descending).build();
        let bars = chart.bars().get();
        prop_assert_eq!(bars.len(), values.len());

        let extents: Vec<f64> = bars.iter().map(|b| b.extent()).collect();
        prop_assert!(extents.windows(2).all(|w| w[0] >= w[1]));

        let mut expected = values.clone();
        expected.sort_by(|a, b| b.total_cmp(a));
        let mut actual = extents;
        actual.sort_by(|a, b| b.total_cmp(a));
        prop_assert_eq!(actual, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. axis coverage
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dual_axis_covers_both_values(
        pairs in proptest::collection::vec((value(), value()), 1..20)
    ) {
        let entries = Publisher::new(
            pairs
                .iter()
                .map(|(v1, v2)| DualEntry::<_, ()>::new("E", Tone::Base, *v1, *v2))
                .collect::<Vec<_>>(),
        );
        let chart = BarChart::dual_reversed(&entries).build();
        let axis = chart.range().get();
        prop_assert!(axis.min <= 0.0 && axis.max >= 0.0);
        for (v1, v2) in &pairs {
            prop_assert!(axis.min <= *v1 && *v1 <= axis.max);
            prop_assert!(axis.min <= *v2 && *v2 <= axis.max);
        }
    }
}
