//! Fractional sort planning.
//!
//! Records are ordered by an integer `sort` with gaps between neighbours. A
//! moved record takes the floored midpoint of the two sorts it lands
//! between; at a list edge it steps [`SORT_GAP`] past its neighbour, or
//! straddles the adjacent page when one exists. Gaps are never renumbered.

use crate::errors::AppError;
use crate::models::ListItem;

/// Step past the edge record when no neighbour exists.
pub const SORT_GAP: i64 = 100;
/// Step past the only record of a target page.
pub const SINGLE_ITEM_GAP: i64 = 200;

/// Which end of the page a drag lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    First,
    Last,
}

/// Outcome of planning a drag on the displayed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPlan {
    NoOp,
    /// The new sort is known from the page itself
    Sort(i64),
    /// The sort depends on the adjacent page
    Straddle { page: u32, edge: Edge },
}

/// Floored midpoint, also for negative sums.
pub fn midpoint(a: i64, b: i64) -> i64 {
    (a + b).div_euclid(2)
}

/// Plan moving the record at `source` to `destination` on the current page.
pub fn plan_drag(
    sorts: &[i64],
    source: usize,
    destination: usize,
    current_page: u32,
    last_page: u32,
) -> Result<DragPlan, AppError> {
    let len = sorts.len();
    if source >= len || destination >= len {
        return Err(AppError::Validation(format!(
            "Move {} -> {} is outside a page of {} records",
            source, destination, len
        )));
    }
    if source == destination {
        return Ok(DragPlan::NoOp);
    }

    if destination == len - 1 {
        return Ok(if current_page >= last_page {
            DragPlan::Sort(sorts[destination] + SORT_GAP)
        } else {
            DragPlan::Straddle {
                page: current_page + 1,
                edge: Edge::Last,
            }
        });
    }

    if destination == 0 {
        return Ok(if current_page <= 1 {
            DragPlan::Sort(sorts[destination] - SORT_GAP)
        } else {
            DragPlan::Straddle {
                page: current_page - 1,
                edge: Edge::First,
            }
        });
    }

    let neighbour = if destination > source {
        destination + 1
    } else {
        destination - 1
    };
    let sort = midpoint(sorts[neighbour], sorts[destination]);
    warn_if_exhausted(sort, sorts[neighbour], sorts[destination]);
    Ok(DragPlan::Sort(sort))
}

/// Sort between this page's edge record and the adjacent page.
///
/// An empty adjacent page falls back to stepping [`SORT_GAP`] past the edge.
pub fn straddle(edge: Edge, edge_sort: i64, adjacent: &[i64]) -> i64 {
    let neighbour = match edge {
        Edge::Last => adjacent.first(),
        Edge::First => adjacent.last(),
    };
    match (edge, neighbour) {
        (_, Some(&neighbour)) => {
            let sort = midpoint(edge_sort, neighbour);
            warn_if_exhausted(sort, edge_sort, neighbour);
            sort
        }
        (Edge::Last, None) => edge_sort + SORT_GAP,
        (Edge::First, None) => edge_sort - SORT_GAP,
    }
}

/// Check an explicit page move target.
pub fn check_target_page(target: u32, current: u32, last: u32) -> Result<(), AppError> {
    if target < 1 || target > last {
        return Err(AppError::Validation(format!(
            "Page {} is outside 1..={}",
            target, last
        )));
    }
    if target == current {
        return Err(AppError::Validation(format!(
            "Record is already on page {}",
            target
        )));
    }
    Ok(())
}

/// Sort of a record moved onto another page: between its first two records.
pub fn plan_move_to_page(target_sorts: &[i64]) -> Result<i64, AppError> {
    match target_sorts {
        [] => Err(AppError::Validation("Target page is empty".to_string())),
        [only] => Ok(only + SINGLE_ITEM_GAP),
        [first, second, ..] => {
            let sort = midpoint(*first, *second);
            warn_if_exhausted(sort, *first, *second);
            Ok(sort)
        }
    }
}

/// Give `items[index]` its new sort and restore ascending sort order.
pub fn apply_sort(items: &mut [ListItem], index: usize, sort: i64) {
    if let Some(item) = items.get_mut(index) {
        item.sort = sort;
    }
    items.sort_by_key(|item| item.sort);
}

fn warn_if_exhausted(sort: i64, a: i64, b: i64) {
    if sort == a || sort == b {
        tracing::warn!(
            "Sort gap exhausted between {} and {}; order may not change",
            a,
            b
        );
    }
}
