#![forbid(unsafe_code)]

//! Hemicycle seat maps: assigning contiguous clusters of seats to entities.
//!
//! # Design
//!
//! A [`Hemicycle`] is the fixed grid: rows of positions, front row first.
//! Every row is spread over the same 0–180° arc, so position `i` of a row of
//! `n` sits at `180 * i / (n - 1)` degrees (a single-seat row sits at 90°).
//! Construction sorts all positions by angle and precomputes which positions
//! are beside each other. Clustering is then a pure function of the grid and
//! the entity list, with no hidden state.
//!
//! Entities claim seats in input order. The first seat of a cluster is the
//! first free position in angle order. Each further seat is the first free
//! position (in angle order) beside the cluster being grown. When the
//! cluster is walled in, it is abandoned as a growth source and a new
//! cluster starts at the first free position: the entity "jumps" past the
//! blocked region.
//!
//! # Adjacency
//!
//! Two positions are beside each other when they share a row and their
//! indices differ by at most one, or sit in adjacent rows and the index of
//! one, rescaled to the other row's size, lands within half a seat of the
//! other.
//!
//! # Invariants
//!
//! 1. No position is owned by more than one entity.
//! 2. Every entity owns exactly its declared seat count.
//! 3. Every iteration claims exactly one position, so clustering finishes in
//!    `total seats` steps. Inputs over capacity are rejected up front.
//!
//! # Performance
//!
//! | Step | Cost |
//! |------|------|
//! | Grid construction | O(P log P + P · w), `w` the widest row |
//! | Clustering | O(S · d · log P), `d` the max neighbour count (≤ 8 in practice) |

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use hustings_reactive::Publisher;

use crate::error::{ChartError, Result};

/// Which row wins when positions in different rows share an angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Tiebreak {
    /// Front row first.
    #[default]
    FrontRowFromLeft,
    /// Back row first.
    FrontRowFromRight,
}

/// Grid shape as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HemicycleConfig {
    /// Seats per row, front row first.
    pub rows: Vec<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tiebreak: Tiebreak,
}

/// A grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub index: usize,
}

/// Angle in degrees of position `index` in a row of `row_size` seats.
#[must_use]
pub fn angle(index: usize, row_size: usize) -> f64 {
    if row_size <= 1 {
        90.0
    } else {
        180.0 * index as f64 / (row_size - 1) as f64
    }
}

/// Index `index` of a row of `from` seats, rescaled onto a row of `to` seats.
fn rescale(index: usize, from: usize, to: usize) -> f64 {
    let span = to.saturating_sub(1) as f64;
    if from <= 1 {
        span / 2.0
    } else {
        index as f64 * span / (from - 1) as f64
    }
}

/// Whether two positions are visually beside each other.
#[must_use]
pub fn is_beside(rows: &[usize], a: Position, b: Position) -> bool {
    if a.row == b.row {
        return a.index.abs_diff(b.index) <= 1;
    }
    if a.row.abs_diff(b.row) != 1 {
        return false;
    }
    let (size_a, size_b) = (rows[a.row], rows[b.row]);
    // Rescaling into a single-seat row collapses every index onto it.
    let toward_b = size_b > 1 && (rescale(a.index, size_a, size_b) - b.index as f64).abs() <= 0.5;
    let toward_a = size_a > 1 && (rescale(b.index, size_b, size_a) - a.index as f64).abs() <= 0.5;
    toward_a || toward_b || (size_a == 1 && size_b == 1)
}

/// The fixed seat grid, sorted and with adjacency precomputed.
#[derive(Clone, PartialEq)]
pub struct Hemicycle {
    rows: Vec<usize>,
    tiebreak: Tiebreak,
    /// Positions in angle order.
    sorted: Vec<Position>,
    /// Row-major position index to sorted index.
    rank: Vec<usize>,
    /// Sorted index to sorted indices of its neighbours.
    neighbours: Vec<Vec<usize>>,
}

impl fmt::Debug for Hemicycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hemicycle")
            .field("rows", &self.rows)
            .field("tiebreak", &self.tiebreak)
            .field("positions", &self.sorted.len())
            .finish()
    }
}

impl Hemicycle {
    /// Build a grid from row sizes, front row first.
    ///
    /// # Errors
    ///
    /// [`ChartError::EmptyHemicycle`] when there are no positions at all.
    pub fn new(rows: Vec<usize>, tiebreak: Tiebreak) -> Result<Self> {
        let offsets = row_offsets(&rows);
        let total = offsets.last().copied().unwrap_or(0);
        if total == 0 {
            return Err(ChartError::EmptyHemicycle);
        }

        let mut sorted: Vec<Position> = rows
            .iter()
            .enumerate()
            .flat_map(|(row, &size)| (0..size).map(move |index| Position { row, index }))
            .collect();
        sorted.sort_by(|a, b| {
            angle(a.index, rows[a.row])
                .total_cmp(&angle(b.index, rows[b.row]))
                .then_with(|| match tiebreak {
                    Tiebreak::FrontRowFromLeft => a.row.cmp(&b.row),
                    Tiebreak::FrontRowFromRight => b.row.cmp(&a.row),
                })
        });

        let mut rank = vec![0; total];
        for (at, position) in sorted.iter().enumerate() {
            rank[offsets[position.row] + position.index] = at;
        }

        let neighbours = sorted
            .iter()
            .map(|&position| {
                let mut near: Vec<usize> = candidates(&rows, position)
                    .filter(|&other| other != position && is_beside(&rows, position, other))
                    .map(|other| rank[offsets[other.row] + other.index])
                    .collect();
                near.sort_unstable();
                near
            })
            .collect();

        Ok(Self {
            rows,
            tiebreak,
            sorted,
            rank,
            neighbours,
        })
    }

    /// # Errors
    ///
    /// As [`Hemicycle::new`].
    pub fn from_config(config: &HemicycleConfig) -> Result<Self> {
        Self::new(config.rows.clone(), config.tiebreak)
    }

    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[must_use]
    pub const fn tiebreak(&self) -> Tiebreak {
        self.tiebreak
    }

    /// Total number of positions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sorted.len()
    }

    /// Positions in the order clusters are grown.
    #[must_use]
    pub fn sorted_positions(&self) -> &[Position] {
        &self.sorted
    }

    /// Assign every entity its seat count as contiguous clusters.
    ///
    /// # Errors
    ///
    /// [`ChartError::HemicycleOverCapacity`] when the seat counts add up to
    /// more than [`capacity`](Self::capacity). A total that overflows `usize`
    /// is reported as `usize::MAX` seats.
    pub fn cluster<E: Clone>(&self, entities: &[(E, usize)]) -> Result<HemicycleLayout<E>> {
        let capacity = self.capacity();
        let seats = entities
            .iter()
            .try_fold(0usize, |total, (_, seats)| total.checked_add(*seats))
            .unwrap_or(usize::MAX);
        if seats > capacity {
            return Err(ChartError::over_capacity(seats, capacity));
        }
        let _span = tracing::debug_span!(
            "hemicycle.cluster",
            entities = entities.len(),
            seats,
            positions = capacity
        )
        .entered();

        let mut owners: Vec<Option<usize>> = vec![None; capacity];
        let mut first_free = 0;
        for (entity, &(_, wanted)) in entities.iter().enumerate() {
            let mut frontier = BTreeSet::new();
            for claimed in 0..wanted {
                let at = match frontier.pop_first() {
                    Some(at) => at,
                    None => {
                        while owners[first_free].is_some() {
                            first_free += 1;
                        }
                        if claimed > 0 {
                            tracing::debug!(
                                message = "hemicycle.jump",
                                entity,
                                claimed,
                                wanted,
                                restart = first_free
                            );
                        }
                        first_free
                    }
                };
                owners[at] = Some(entity);
                frontier.extend(
                    self.neighbours[at]
                        .iter()
                        .copied()
                        .filter(|&near| owners[near].is_none()),
                );
            }
        }

        let offsets = row_offsets(&self.rows);
        let row_major = self
            .rows
            .iter()
            .enumerate()
            .flat_map(|(row, &size)| (0..size).map(move |index| (row, index)))
            .map(|(row, index)| owners[self.rank[offsets[row] + index]])
            .collect();

        Ok(HemicycleLayout {
            rows: self.rows.clone(),
            entities: entities.to_vec(),
            owners: row_major,
        })
    }
}

fn row_offsets(rows: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(rows.len() + 1);
    let mut total = 0;
    offsets.push(total);
    for size in rows {
        total += size;
        offsets.push(total);
    }
    offsets
}

/// Positions in the same or an adjacent row that could be beside `of`.
fn candidates(rows: &[usize], of: Position) -> impl Iterator<Item = Position> + '_ {
    let first = of.row.saturating_sub(1);
    let last = (of.row + 1).min(rows.len() - 1);
    (first..=last).flat_map(move |row| (0..rows[row]).map(move |index| Position { row, index }))
}

/// Pure clustering entry point.
///
/// # Errors
///
/// See [`Hemicycle::new`] and [`Hemicycle::cluster`].
pub fn cluster_seats<E: Clone>(
    rows: &[usize],
    entities: &[(E, usize)],
    tiebreak: Tiebreak,
) -> Result<HemicycleLayout<E>> {
    Hemicycle::new(rows.to_vec(), tiebreak)?.cluster(entities)
}

/// One rendered seat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot<'a, E> {
    pub row: usize,
    pub index: usize,
    pub angle: f64,
    pub owner: Option<&'a E>,
}

/// Per-position entity assignment, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HemicycleLayout<E> {
    rows: Vec<usize>,
    entities: Vec<(E, usize)>,
    owners: Vec<Option<usize>>,
}

impl<E> HemicycleLayout<E> {
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Owner of a position, `None` for an unclaimed or out-of-range seat.
    #[must_use]
    pub fn owner(&self, row: usize, index: usize) -> Option<&E> {
        if row >= self.rows.len() || index >= self.rows[row] {
            return None;
        }
        let offset: usize = self.rows[..row].iter().sum();
        self.owners[offset + index].map(|entity| &self.entities[entity].0)
    }

    /// Owner index into the entity list for every position, row-major.
    #[must_use]
    pub fn owners(&self) -> &[Option<usize>] {
        &self.owners
    }

    /// Every seat in row-major order.
    #[must_use]
    pub fn dots(&self) -> Vec<Dot<'_, E>> {
        let mut owners = self.owners.iter();
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, &size)| (0..size).map(move |index| (row, index, size)))
            .filter_map(|(row, index, size)| {
                let owner = owners.next()?;
                Some(Dot {
                    row,
                    index,
                    angle: angle(index, size),
                    owner: owner.map(|entity| &self.entities[entity].0),
                })
            })
            .collect()
    }

    /// Seats actually assigned to each entity, in input order.
    #[must_use]
    pub fn seat_counts(&self) -> Vec<(&E, usize)> {
        let mut counts = vec![0; self.entities.len()];
        for owner in self.owners.iter().flatten() {
            counts[*owner] += 1;
        }
        self.entities
            .iter()
            .zip(counts)
            .map(|((entity, _), count)| (entity, count))
            .collect()
    }

    /// Seats needed for a majority of the whole chamber.
    #[must_use]
    pub fn majority(&self) -> usize {
        self.owners.len() / 2 + 1
    }
}

/// Reactive seat map, re-clustered on every entity-list submit.
pub struct HemicycleChart<E> {
    hemicycle: Arc<Hemicycle>,
    layout: Publisher<std::result::Result<HemicycleLayout<E>, ChartError>>,
}

impl<E: fmt::Debug> fmt::Debug for HemicycleChart<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HemicycleChart")
            .field("hemicycle", &self.hemicycle)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<E: Clone + Send + Sync + 'static> HemicycleChart<E> {
    /// Over-capacity entity lists publish `Err` and log a warning.
    #[must_use]
    pub fn new(hemicycle: Hemicycle, entities: &Publisher<Vec<(E, usize)>>) -> Self {
        let hemicycle = Arc::new(hemicycle);
        let grid = Arc::clone(&hemicycle);
        let layout = entities.map(move |entities: &Vec<(E, usize)>| {
            let layout = grid.cluster(entities);
            if let Err(error) = &layout {
                tracing::warn!(message = "hemicycle.rejected", %error);
            }
            layout
        });
        Self { hemicycle, layout }
    }

    #[must_use]
    pub fn hemicycle(&self) -> &Hemicycle {
        &self.hemicycle
    }

    #[must_use]
    pub fn layout(&self) -> &Publisher<std::result::Result<HemicycleLayout<E>, ChartError>> {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn pos(row: usize, index: usize) -> Position {
        Position { row, index }
    }

    #[test]
    fn angles_span_half_circle() {
        assert_eq!(angle(0, 5), 0.0);
        assert_eq!(angle(2, 5), 90.0);
        assert_eq!(angle(4, 5), 180.0);
        assert_eq!(angle(0, 1), 90.0);
    }

    #[test]
    fn beside_same_row() {
        let rows = [5, 7];
        assert!(is_beside(&rows, pos(0, 1), pos(0, 2)));
        assert!(!is_beside(&rows, pos(0, 1), pos(0, 3)));
    }

    #[test]
    fn beside_adjacent_rows_by_rescaled_index() {
        let rows = [3, 5];
        // Row 0 index 1 rescales to 2.0 in row 1.
        assert!(is_beside(&rows, pos(0, 1), pos(1, 2)));
        // Row 1 index 1 rescales to 0.5 in row 0.
        assert!(is_beside(&rows, pos(1, 1), pos(0, 0)));
        assert!(is_beside(&rows, pos(1, 1), pos(0, 1)));
        assert!(!is_beside(&rows, pos(0, 0), pos(1, 3)));
    }

    #[test]
    fn rows_two_apart_are_never_beside() {
        let rows = [3, 3, 3];
        assert!(!is_beside(&rows, pos(0, 1), pos(2, 1)));
    }

    #[test]
    fn single_seat_row_touches_only_the_middle() {
        let rows = [1, 5];
        assert!(is_beside(&rows, pos(0, 0), pos(1, 2)));
        assert!(!is_beside(&rows, pos(0, 0), pos(1, 0)));
        assert!(is_beside(&[1, 1], pos(0, 0), pos(1, 0)));
    }

    #[test]
    fn sort_tiebreak_orders_rows_on_equal_angle() {
        let left = Hemicycle::new(vec![3, 3], Tiebreak::FrontRowFromLeft).unwrap();
        assert_eq!(&left.sorted_positions()[..2], &[pos(0, 0), pos(1, 0)]);

        let right = Hemicycle::new(vec![3, 3], Tiebreak::FrontRowFromRight).unwrap();
        assert_eq!(&right.sorted_positions()[..2], &[pos(1, 0), pos(0, 0)]);
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert_eq!(
            Hemicycle::new(vec![], Tiebreak::default()),
            Err(ChartError::EmptyHemicycle)
        );
        assert_eq!(
            Hemicycle::new(vec![0, 0], Tiebreak::default()),
            Err(ChartError::EmptyHemicycle)
        );
    }

    #[test]
    fn over_capacity_is_rejected() {
        let grid = Hemicycle::new(vec![2, 3], Tiebreak::default()).unwrap();
        assert_eq!(
            grid.cluster(&[("A", 4), ("B", 2)]),
            Err(ChartError::HemicycleOverCapacity {
                seats: 6,
                positions: 5
            })
        );
    }

    #[test]
    fn overflowing_seat_total_is_rejected() {
        let grid = Hemicycle::new(vec![3], Tiebreak::default()).unwrap();
        assert_eq!(
            grid.cluster(&[("A", usize::MAX), ("B", 2)]),
            Err(ChartError::HemicycleOverCapacity {
                seats: usize::MAX,
                positions: 3
            })
        );
    }

    #[test]
    fn clusters_grow_as_wedges() {
        let rows = [5, 7, 9];
        let layout = cluster_seats(
            &rows,
            &[("A", 7), ("B", 7), ("C", 7)],
            Tiebreak::FrontRowFromLeft,
        )
        .unwrap();
        let drawn: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(row, &size)| {
                (0..size)
                    .map(|index| layout.owner(row, index).copied().unwrap_or("."))
                    .collect()
            })
            .collect();
        assert_eq!(drawn, vec!["AABCC", "AABBBCC", "AAABBBCCC"]);

        let partial = cluster_seats(&rows, &[("A", 5)], Tiebreak::FrontRowFromLeft).unwrap();
        let owned: Vec<(usize, usize)> = partial
            .dots()
            .iter()
            .filter(|d| d.owner.is_some())
            .map(|d| (d.row, d.index))
            .collect();
        assert_eq!(owned, vec![(0, 0), (1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn full_chamber_assigns_every_position() {
        let layout = cluster_seats(
            &[5, 7, 9],
            &[("A", 8), ("B", 6), ("C", 7)],
            Tiebreak::FrontRowFromLeft,
        )
        .unwrap();
        assert!(layout.owners().iter().all(Option::is_some));
        assert_eq!(layout.seat_counts(), vec![(&"A", 8), (&"B", 6), (&"C", 7)]);
        assert_eq!(layout.majority(), 11);
    }

    #[test]
    fn first_entity_starts_at_the_left_edge() {
        let layout = cluster_seats(&[3, 5], &[("A", 2), ("B", 6)], Tiebreak::FrontRowFromLeft).unwrap();
        assert_eq!(layout.owner(0, 0), Some(&"A"));
        assert_eq!(layout.owner(1, 0), Some(&"A"));
        assert_eq!(layout.owner(1, 4), Some(&"B"));
    }

    #[test]
    fn partial_fill_leaves_trailing_seats_free() {
        let layout = cluster_seats(&[4, 6], &[("A", 3)], Tiebreak::default()).unwrap();
        assert_eq!(layout.seat_counts(), vec![(&"A", 3)]);
        assert_eq!(layout.owners().iter().filter(|o| o.is_none()).count(), 7);
        assert_eq!(layout.owner(0, 3), None);
        assert_eq!(layout.owner(5, 0), None);
    }

    #[test]
    fn zero_seat_entities_are_skipped() {
        let layout = cluster_seats(&[3], &[("A", 0), ("B", 3)], Tiebreak::default()).unwrap();
        assert_eq!(layout.seat_counts(), vec![(&"A", 0), (&"B", 3)]);
    }

    #[test]
    fn dots_are_row_major_with_angles() {
        let layout = cluster_seats(&[1, 3], &[("A", 4)], Tiebreak::default()).unwrap();
        let dots = layout.dots();
        assert_eq!(dots.len(), 4);
        assert_eq!((dots[0].row, dots[0].index, dots[0].angle), (0, 0, 90.0));
        assert_eq!((dots[3].row, dots[3].index, dots[3].angle), (1, 2, 180.0));
        assert!(dots.iter().all(|d| d.owner == Some(&"A")));
    }

    #[test]
    #[traced_test]
    fn consecutive_entities_fill_in_order() {
        let grid = Hemicycle::new(vec![5], Tiebreak::FrontRowFromLeft).unwrap();
        let layout = grid
            .cluster(&[("A", 1), ("B", 1), ("C", 1), ("D", 2)])
            .unwrap();
        assert_eq!(layout.owner(0, 2), Some(&"C"));
        assert_eq!(layout.owner(0, 3), Some(&"D"));
        assert_eq!(layout.owner(0, 4), Some(&"D"));
        assert!(!logs_contain("hemicycle.jump"));
    }

    #[test]
    #[traced_test]
    fn blocked_growth_restarts_at_first_free() {
        // Row sizes 3 and 1: the back seat touches only the middle front seat.
        // A takes (0,0). B then starts at the next free seat in angle order.
        let grid = Hemicycle::new(vec![3, 1], Tiebreak::FrontRowFromLeft).unwrap();
        // Sorted: (0,0) 0°, (0,1) 90°, (1,0) 90°, (0,2) 180°.
        assert_eq!(
            grid.sorted_positions(),
            &[pos(0, 0), pos(0, 1), pos(1, 0), pos(0, 2)]
        );
        // A takes (0,0) then (0,1), B takes (1,0) whose only neighbour (0,1)
        // is owned by A, so B must jump to (0,2).
        let layout = grid.cluster(&[("A", 2), ("B", 2)]).unwrap();
        assert_eq!(layout.owner(1, 0), Some(&"B"));
        assert_eq!(layout.owner(0, 2), Some(&"B"));
        assert!(logs_contain("hemicycle.jump"));
    }

    #[test]
    #[traced_test]
    fn chart_reclusters_and_reports_rejection() {
        let grid = Hemicycle::new(vec![3, 5], Tiebreak::default()).unwrap();
        let entities = Publisher::new(vec![("A", 4), ("B", 4)]);
        let chart = HemicycleChart::new(grid, &entities);
        assert!(chart.layout().get().is_ok());

        entities.submit(vec![("A", 9)]);
        assert_eq!(
            chart.layout().get(),
            Err(ChartError::HemicycleOverCapacity {
                seats: 9,
                positions: 8
            })
        );
        assert!(logs_contain("hemicycle.rejected"));

        entities.submit(vec![("B", 8)]);
        let layout = chart.layout().get().unwrap();
        assert!(layout.owners().iter().all(|o| *o == Some(0)));
    }
}
