//! Directions provider integration
//!
//! The provider orders the intermediate waypoints between a fixed origin and
//! destination and reports per-leg driving distance and time. Google
//! Directions in production, scripted providers in tests.

mod google;

pub use google::{GoogleDirectionsClient, GoogleDirectionsConfig, DEFAULT_DIRECTIONS_URL};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::defaults::MAX_DIRECTIONS_STOPS;
use crate::services::sequencing::{is_permutation, nearest_neighbor, SequenceResult};
use crate::types::{Coordinates, Sequencer};

/// One leg between consecutive points of the provider's route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionsLeg {
    pub distance_meters: u64,
    pub duration_seconds: u64,
}

/// Provider answer for an origin → waypoints → destination request
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRoute {
    pub legs: Vec<DirectionsLeg>,
    /// Visiting order of the intermediate waypoints, as indices into them
    pub waypoint_order: Vec<usize>,
    pub polyline: Option<String>,
}

/// Why the provider could not be used
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderFailure {
    #[error("provider returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderFailure {
    /// Transport problems may go away on retry; provider answers will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderFailure::Transport(_) | ProviderFailure::Timeout(_))
    }
}

/// Directions provider trait for abstraction (Google, scripted, etc.)
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Route from `origin` through `waypoints` (order to be optimized) to `destination`
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<DirectionsRoute, ProviderFailure>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Sequences stops through a directions provider.
///
/// Provider answers that cannot be used (error status, malformed body) are
/// absorbed here by falling back to nearest neighbor. Transport failures and
/// timeouts are returned so the caller can decide.
pub struct DirectionsAdapter {
    provider: Arc<dyn DirectionsProvider>,
    timeout: Duration,
    heuristic_speed_mps: f64,
}

impl DirectionsAdapter {
    pub fn new(provider: Arc<dyn DirectionsProvider>, timeout: Duration, heuristic_speed_mps: f64) -> Self {
        Self {
            provider,
            timeout,
            heuristic_speed_mps,
        }
    }

    /// Whether a stop list fits in a single provider request
    pub fn accepts(&self, stop_count: usize) -> bool {
        (2..=MAX_DIRECTIONS_STOPS).contains(&stop_count)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Order `points` keeping the first as origin and the last as destination
    pub async fn sequence(&self, points: &[Coordinates]) -> Result<SequenceResult, ProviderFailure> {
        let n = points.len();
        if !self.accepts(n) {
            return Err(ProviderFailure::InvalidResponse(format!(
                "{} stops cannot be sent in one request (2..={} allowed)",
                n, MAX_DIRECTIONS_STOPS
            )));
        }

        debug!("Requesting directions from {} for {} stops", self.provider.name(), n);

        let call = self.provider.route(points[0], points[n - 1], &points[1..n - 1]);
        let routed = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderFailure::Timeout(self.timeout)),
        };

        match routed.and_then(|route| sequence_from_route(route, n)) {
            Ok(result) => Ok(result),
            Err(failure) if failure.is_retryable() => Err(failure),
            Err(failure) => {
                warn!(
                    "Directions from {} unusable, falling back to nearest neighbor: {}",
                    self.provider.name(),
                    failure
                );
                Ok(nearest_neighbor(points, self.heuristic_speed_mps))
            }
        }
    }
}

/// Rebuild the full stop order `[0, waypoints.., n-1]` and sum the legs
fn sequence_from_route(route: DirectionsRoute, n: usize) -> Result<SequenceResult, ProviderFailure> {
    let intermediate = n - 2;

    // Some providers omit the order when there is nothing to reorder
    let waypoint_order = if route.waypoint_order.is_empty() && intermediate > 0 {
        (0..intermediate).collect()
    } else {
        route.waypoint_order
    };

    if !is_permutation(&waypoint_order, intermediate) {
        return Err(ProviderFailure::InvalidResponse(format!(
            "waypoint order {:?} is not a permutation of {} waypoints",
            waypoint_order, intermediate
        )));
    }
    if route.legs.len() != n - 1 {
        return Err(ProviderFailure::InvalidResponse(format!(
            "expected {} legs, got {}",
            n - 1,
            route.legs.len()
        )));
    }

    let mut ordered_indices = Vec::with_capacity(n);
    ordered_indices.push(0);
    ordered_indices.extend(waypoint_order.iter().map(|&i| i + 1));
    ordered_indices.push(n - 1);

    let total_distance: u64 = route.legs.iter().map(|leg| leg.distance_meters).sum();
    let total_duration: u64 = route.legs.iter().map(|leg| leg.duration_seconds).sum();

    Ok(SequenceResult {
        ordered_indices,
        waypoint_order,
        polyline: route.polyline,
        total_distance_meters: Some(total_distance as f64),
        total_duration_seconds: Some(total_duration as i64),
        sequencer: Sequencer::Directions,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Provider that replays a fixed answer and records what it was asked
    pub struct ScriptedProvider {
        answer: Result<DirectionsRoute, ProviderFailure>,
        delay: Option<Duration>,
        pub calls: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        pub fn answering(answer: Result<DirectionsRoute, ProviderFailure>) -> Self {
            Self {
                answer,
                delay: None,
                calls: Mutex::new(vec![]),
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                answer: Err(ProviderFailure::Transport("unreachable".to_string())),
                delay: Some(delay),
                calls: Mutex::new(vec![]),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl DirectionsProvider for ScriptedProvider {
        async fn route(
            &self,
            _origin: Coordinates,
            _destination: Coordinates,
            waypoints: &[Coordinates],
        ) -> Result<DirectionsRoute, ProviderFailure> {
            self.calls.lock().push(waypoints.len() + 2);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer.clone()
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    pub fn legs(n: usize, distance_meters: u64, duration_seconds: u64) -> Vec<DirectionsLeg> {
        vec![
            DirectionsLeg {
                distance_meters,
                duration_seconds,
            };
            n
        ]
    }
}
