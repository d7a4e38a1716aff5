//! Opportunity ordering.
//!
//! Stable sorts only: candidates that compare equal under the active
//! mode keep their evaluation order, so repeated passes over the same
//! snapshot produce identical output.

use std::cmp::Ordering;

use crate::types::{Opportunity, SortMode};

/// Order opportunities in place according to the requested mode.
pub fn rank(opportunities: &mut [Opportunity], mode: SortMode) {
    match mode {
        SortMode::Total => {
            opportunities.sort_by(|a, b| b.total_potential_profit.cmp(&a.total_potential_profit))
        }
        SortMode::Unit => opportunities.sort_by(|a, b| b.unit_profit.cmp(&a.unit_profit)),
        SortMode::Roi => opportunities.sort_by(|a, b| {
            b.roi_pct()
                .partial_cmp(&a.roi_pct())
                .unwrap_or(Ordering::Equal)
        }),
        SortMode::Cost => opportunities.sort_by(|a, b| a.total_cost.cmp(&b.total_cost)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
