//! Route optimization orchestrator
//!
//! Picks a sequencer for the requested mode, falls back to nearest neighbor
//! when the directions provider cannot answer, and writes the new order and
//! totals back in one step.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{RouteAggregates, RouteStore};
use crate::defaults::MIN_GEOCODED_STOPS;
use crate::error::OptimizeError;
use crate::services::rate_limiter::RateLimiter;
use crate::services::routing::DirectionsAdapter;
use crate::services::sequencing::{nearest_neighbor, time_window_order, SequenceResult, TimeWindowKey};
use crate::types::{Coordinates, OptimizationMode, OptimizeRouteResponse, Stop};

pub struct RouteOptimizer {
    store: Arc<dyn RouteStore>,
    directions: Option<DirectionsAdapter>,
    heuristic_speed_mps: f64,
    limiter: Option<Arc<RateLimiter>>,
}

impl RouteOptimizer {
    pub fn new(store: Arc<dyn RouteStore>, directions: Option<DirectionsAdapter>, heuristic_speed_mps: f64) -> Self {
        Self {
            store,
            directions,
            heuristic_speed_mps,
            limiter: None,
        }
    }

    /// Throttle runs per route. Only requests that reach a sequencer count.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Reorder a route's stops under `mode` and persist the result
    pub async fn optimize(&self, route_id: Uuid, mode: OptimizationMode) -> Result<OptimizeRouteResponse, OptimizeError> {
        let loaded = self
            .store
            .load_route_with_stops(route_id)
            .await?
            .ok_or(OptimizeError::RouteNotFound(route_id))?;
        let stops = loaded.stops;

        debug!(
            "Optimizing route {} '{}' ({} stops) in {} mode",
            route_id,
            loaded.route.name,
            stops.len(),
            mode.as_str()
        );

        // Stops that take part in sequencing, and the rest kept at the end
        let (participants, excluded): (Vec<&Stop>, Vec<&Stop>) = if mode.needs_coordinates() {
            stops.iter().partition(|s| s.coordinates().is_some())
        } else {
            (stops.iter().collect(), vec![])
        };
        let participants = sequencing_base(participants, mode.needs_coordinates());

        let points = match mode {
            OptimizationMode::StrictTimeWindows => Vec::new(),
            OptimizationMode::Shortest | OptimizationMode::Fastest => geocoded_points(&participants)?,
        };

        self.admit(route_id)?;

        let result = match mode {
            OptimizationMode::StrictTimeWindows => {
                let keys: Vec<TimeWindowKey> = participants.iter().map(|s| TimeWindowKey::from(*s)).collect();
                time_window_order(&keys)
            }
            OptimizationMode::Shortest => nearest_neighbor(&points, self.heuristic_speed_mps),
            OptimizationMode::Fastest => self.sequence_fastest(route_id, &points).await,
        };

        let new_order: Vec<&Stop> = result
            .ordered_indices
            .iter()
            .map(|&i| participants[i])
            .chain(excluded.iter().copied())
            .collect();

        let orders: Vec<(Uuid, i32)> = new_order
            .iter()
            .enumerate()
            .map(|(position, stop)| (stop.id, position as i32))
            .collect();

        let aggregates = RouteAggregates {
            mode,
            total_distance_meters: result.total_distance_meters,
            total_duration_seconds: result.total_duration_seconds,
        };

        self.store.apply_optimization(route_id, &orders, &aggregates).await?;

        info!(
            "Route {} optimized by {:?}: {} stops sequenced, {} appended",
            route_id,
            result.sequencer,
            participants.len(),
            excluded.len()
        );

        Ok(OptimizeRouteResponse {
            stop_ids: orders.iter().map(|(id, _)| *id).collect(),
            ordered_indices: result.ordered_indices,
            waypoint_order: result.waypoint_order,
            polyline: result.polyline,
            total_distance_meters: result.total_distance_meters,
            total_duration_seconds: result.total_duration_seconds,
            mode,
            sequencer: result.sequencer,
        })
    }

    fn admit(&self, route_id: Uuid) -> Result<(), OptimizeError> {
        match &self.limiter {
            Some(limiter) if !limiter.check_and_record(route_id) => Err(OptimizeError::RateLimited(route_id)),
            _ => Ok(()),
        }
    }

    async fn sequence_fastest(&self, route_id: Uuid, points: &[Coordinates]) -> SequenceResult {
        let adapter = match &self.directions {
            Some(adapter) if adapter.accepts(points.len()) => adapter,
            Some(_) => {
                debug!(
                    "Route {} has {} geocoded stops, too many for one directions request",
                    route_id,
                    points.len()
                );
                return nearest_neighbor(points, self.heuristic_speed_mps);
            }
            None => return nearest_neighbor(points, self.heuristic_speed_mps),
        };

        match adapter.sequence(points).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(
                    "Directions from {} failed for route {}, using nearest neighbor: {}",
                    adapter.provider_name(),
                    route_id,
                    failure
                );
                nearest_neighbor(points, self.heuristic_speed_mps)
            }
        }
    }
}

/// Participants in the order sequencers index into.
///
/// Insertion order keeps `orderedIndices` stable across runs. Geography modes
/// keep the current first stop at index 0 as the start of the route.
fn sequencing_base(mut participants: Vec<&Stop>, anchored: bool) -> Vec<&Stop> {
    let start = participants.first().map(|s| s.id);
    participants.sort_by_key(|s| s.insertion_seq);
    if anchored {
        if let Some(pos) = participants.iter().position(|s| Some(s.id) == start) {
            let anchor = participants.remove(pos);
            participants.insert(0, anchor);
        }
    }
    participants
}

fn geocoded_points(participants: &[&Stop]) -> Result<Vec<Coordinates>, OptimizeError> {
    let points: Vec<Coordinates> = participants.iter().filter_map(|s| s.coordinates()).collect();
    if points.len() < MIN_GEOCODED_STOPS {
        return Err(OptimizeError::NotEnoughGeocodedStops {
            required: MIN_GEOCODED_STOPS,
            found: points.len(),
        });
    }
    Ok(points)
}
