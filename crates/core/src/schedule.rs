//! Incharge period arithmetic.
//!
//! Periods are discrete two-week scheduling slots with consecutive-integer
//! numbering. Non-contiguous bookings force separate physical production
//! dispatches ("print runs"), which multiplies production cost only.

use std::collections::BTreeSet;

/// Deduplicate and sort a period selection.
pub fn unique_sorted_periods(periods: &[u32]) -> Vec<u32> {
    periods.iter().copied().collect::<BTreeSet<u32>>().into_iter().collect()
}

/// Count the maximal runs of consecutive periods. Returns 0 only for an
/// empty selection; cost paths validate non-empty selections first and treat
/// the result as at least one run.
pub fn print_runs(periods: &[u32]) -> u32 {
    let unique = unique_sorted_periods(periods);
    let Some(first) = unique.first() else {
        return 0;
    };
    let mut runs = 1;
    let mut previous = *first;
    for &period in &unique[1..] {
        if period != previous + 1 {
            runs += 1;
        }
        previous = period;
    }
    runs
}
