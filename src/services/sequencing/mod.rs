//! Stop sequencers
//!
//! Each sequencer turns a list of stops into a visiting order expressed as a
//! permutation of input indices, plus route totals when it knows them.

mod nearest_neighbor;
mod time_window;

pub use nearest_neighbor::nearest_neighbor;
pub use time_window::{time_window_order, TimeWindowKey};

use crate::types::Sequencer;

/// Output of one sequencing pass
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceResult {
    /// Input indices in visiting order
    pub ordered_indices: Vec<usize>,
    /// Raw waypoint order reported by the directions provider
    pub waypoint_order: Vec<usize>,
    /// Encoded overview polyline from the directions provider
    pub polyline: Option<String>,
    pub total_distance_meters: Option<f64>,
    pub total_duration_seconds: Option<i64>,
    pub sequencer: Sequencer,
}

/// True when `order` contains every index in `0..n` exactly once
pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
