//! Route types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::messages::deserialize_patch;
use super::stop::{Stop, StopStatus};

/// Route entity (an ordered set of planned visits)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub status: RouteStatus,
    pub optimization_mode: Option<OptimizationMode>,
    pub total_distance_meters: Option<f64>,
    pub total_duration_seconds: Option<i64>,
    pub planned_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Route status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "route_status", rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

/// Policy used to compute the stop order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "optimization_mode", rename_all = "snake_case")]
pub enum OptimizationMode {
    /// Provider-routed drive time
    #[default]
    Fastest,
    /// Nearest-neighbor over great-circle distance
    Shortest,
    /// Priority then time-window start, no distances
    StrictTimeWindows,
}

impl OptimizationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            OptimizationMode::Fastest => "fastest",
            OptimizationMode::Shortest => "shortest",
            OptimizationMode::StrictTimeWindows => "strict_time_windows",
        }
    }

    /// Whether stops without coordinates can take part
    pub const fn needs_coordinates(self) -> bool {
        !matches!(self, OptimizationMode::StrictTimeWindows)
    }
}

/// Algorithm that actually produced an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequencer {
    Directions,
    NearestNeighbor,
    TimeWindows,
}

/// Route row with its stop count, for list views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: Uuid,
    pub name: String,
    pub status: RouteStatus,
    pub optimization_mode: Option<OptimizationMode>,
    pub total_distance_meters: Option<f64>,
    pub total_duration_seconds: Option<i64>,
    pub planned_date: Option<NaiveDate>,
    pub stops_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Execution progress of a route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProgress {
    pub total: usize,
    pub visited: usize,
    pub skipped: usize,
    pub pending: usize,
    pub all_done: bool,
}

impl RouteProgress {
    pub fn from_stops(stops: &[Stop]) -> Self {
        let mut progress = Self {
            total: stops.len(),
            ..Default::default()
        };
        for stop in stops {
            match stop.status {
                StopStatus::Visited => progress.visited += 1,
                StopStatus::Skipped => progress.skipped += 1,
                StopStatus::Pending => progress.pending += 1,
            }
        }
        progress.all_done = progress.total > 0 && progress.pending == 0;
        progress
    }
}

/// Request to create a route from contacts, in visiting order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    pub name: String,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub contact_ids: Vec<Uuid>,
}

/// Request addressing a single route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteIdRequest {
    pub route_id: Uuid,
}

/// Partial update of route header fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    pub route_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<RouteStatus>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub planned_date: Option<Option<NaiveDate>>,
}

/// Route with its stops in visiting order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetail {
    pub route: Route,
    pub stops: Vec<Stop>,
    pub progress: RouteProgress,
}

/// Request to optimize a route's stop order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteRequest {
    pub route_id: Uuid,
    #[serde(default)]
    pub mode: OptimizationMode,
}

/// Result of one optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteResponse {
    /// Indices into the participating stops (in their previous order)
    pub ordered_indices: Vec<usize>,
    /// Every stop of the route in its new order
    pub stop_ids: Vec<Uuid>,
    /// Raw waypoint order from the directions provider, empty otherwise
    pub waypoint_order: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    pub total_distance_meters: Option<f64>,
    pub total_duration_seconds: Option<i64>,
    pub mode: OptimizationMode,
    pub sequencer: Sequencer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimize_request_defaults_to_fastest() {
        let req: OptimizeRouteRequest =
            serde_json::from_str(r#"{"routeId": "00000000-0000-0000-0000-000000000001"}"#).unwrap();
        assert_eq!(req.mode, OptimizationMode::Fastest);
    }

    #[test]
    fn test_optimization_mode_wire_names() {
        let mode: OptimizationMode = serde_json::from_str("\"strict_time_windows\"").unwrap();
        assert_eq!(mode, OptimizationMode::StrictTimeWindows);
        assert_eq!(mode.as_str(), "strict_time_windows");
        assert!(!mode.needs_coordinates());
        assert!(OptimizationMode::Shortest.needs_coordinates());
    }

    #[test]
    fn test_update_route_request_clears_planned_date() {
        let req: UpdateRouteRequest = serde_json::from_str(
            r#"{"routeId": "00000000-0000-0000-0000-000000000001", "plannedDate": null}"#,
        )
        .unwrap();
        assert_eq!(req.planned_date, Some(None));
        assert!(req.name.is_none());
    }

    #[test]
    fn test_route_serializes_null_aggregates() {
        let route = Route {
            id: Uuid::nil(),
            name: "Tuesday north loop".to_string(),
            status: RouteStatus::Planned,
            optimization_mode: Some(OptimizationMode::StrictTimeWindows),
            total_distance_meters: None,
            total_duration_seconds: None,
            planned_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&route).unwrap();
        assert!(json.contains("\"totalDistanceMeters\":null"));
        assert!(json.contains("\"optimizationMode\":\"strict_time_windows\""));
        assert!(json.contains("\"status\":\"planned\""));
    }
}
