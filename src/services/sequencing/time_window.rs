//! Priority and time-window ordering

use chrono::NaiveTime;

use crate::types::{Sequencer, Stop, StopPriority};

use super::SequenceResult;

/// The fields that decide a stop's place in a time-window sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowKey {
    pub priority: StopPriority,
    pub time_window_start: Option<NaiveTime>,
}

impl From<&Stop> for TimeWindowKey {
    fn from(stop: &Stop) -> Self {
        Self {
            priority: stop.priority,
            time_window_start: stop.time_window_start,
        }
    }
}

/// Order stops by priority tier, then windowed before unwindowed, then by
/// window start. Geography is ignored, so no totals are produced.
pub fn time_window_order(keys: &[TimeWindowKey]) -> SequenceResult {
    let mut order: Vec<usize> = (0..keys.len()).collect();

    // Stable: equal keys keep input order
    order.sort_by_key(|&i| {
        let key = &keys[i];
        (key.priority, key.time_window_start.is_none(), key.time_window_start)
    });

    SequenceResult {
        ordered_indices: order,
        waypoint_order: vec![],
        polyline: None,
        total_distance_meters: None,
        total_duration_seconds: None,
        sequencer: Sequencer::TimeWindows,
    }
}
