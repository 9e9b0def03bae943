//! Greedy nearest-neighbor ordering

use crate::services::geo;
use crate::types::{Coordinates, Sequencer};

use super::SequenceResult;

/// Nearest neighbor heuristic anchored at index 0.
///
/// From the last visited point, always move to the closest unvisited one
/// (great-circle distance); ties go to the lowest index. Duration is estimated
/// from the total distance at `speed_mps`.
pub fn nearest_neighbor(points: &[Coordinates], speed_mps: f64) -> SequenceResult {
    let n = points.len();
    if n < 2 {
        return SequenceResult {
            ordered_indices: (0..n).collect(),
            waypoint_order: vec![],
            polyline: None,
            total_distance_meters: Some(0.0),
            total_duration_seconds: Some(0),
            sequencer: Sequencer::NearestNeighbor,
        };
    }

    let matrix = geo::distance_matrix(points);
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    // Start is fixed
    visited[0] = true;
    order.push(0);
    let mut current = 0;
    let mut total_distance = 0.0;

    for _ in 1..n {
        let mut best_next = None;
        let mut best_distance = f64::INFINITY;

        for j in 0..n {
            if !visited[j] && matrix[current][j] < best_distance {
                best_distance = matrix[current][j];
                best_next = Some(j);
            }
        }

        // Distances are finite for valid coordinates, but never stall on a NaN row
        let next = best_next.unwrap_or_else(|| {
            (0..n).find(|&j| !visited[j]).unwrap_or(current)
        });
        if best_next.is_some() {
            total_distance += best_distance;
        }
        visited[next] = true;
        order.push(next);
        current = next;
    }

    SequenceResult {
        ordered_indices: order,
        waypoint_order: vec![],
        polyline: None,
        total_distance_meters: Some(total_distance),
        total_duration_seconds: Some(estimate_duration_seconds(total_distance, speed_mps)),
        sequencer: Sequencer::NearestNeighbor,
    }
}

fn estimate_duration_seconds(distance_meters: f64, speed_mps: f64) -> i64 {
    (distance_meters / speed_mps).round() as i64
}
