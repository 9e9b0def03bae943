//! Route stop types

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::contact::Coordinates;
use super::messages::{deserialize_patch, deserialize_patch_time};

/// A planned visit on a route, joined with its contact's location
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Uuid,
    pub route_id: Uuid,
    pub contact_id: Uuid,
    pub stop_order: i32,
    pub status: StopStatus,
    pub priority: StopPriority,
    pub time_window_start: Option<NaiveTime>,
    pub time_window_end: Option<NaiveTime>,
    pub expected_duration_min: i32,
    pub visit_notes: Option<String>,
    pub visit_outcome: Option<VisitOutcome>,
    pub visited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Increases with every inserted stop; never changes afterwards
    #[serde(skip)]
    pub insertion_seq: i64,

    // Joined contact data
    pub contact_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Stop {
    /// Coordinates if the contact has been geocoded
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

/// Stop lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "stop_status", rename_all = "snake_case")]
pub enum StopStatus {
    #[default]
    Pending,
    Visited,
    Skipped,
}

impl StopStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopStatus::Pending => "pending",
            StopStatus::Visited => "visited",
            StopStatus::Skipped => "skipped",
        }
    }
}

/// Stop priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "stop_priority", rename_all = "snake_case")]
pub enum StopPriority {
    MustVisit,
    #[default]
    NiceToVisit,
}

/// Outcome recorded after a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "visit_outcome", rename_all = "snake_case")]
pub enum VisitOutcome {
    Interested,
    NotInterested,
    FollowUp,
    Booked,
    NoAnswer,
    LeftInfo,
}

/// Request to change a stop's status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStopStatusRequest {
    pub route_id: Uuid,
    pub stop_id: Uuid,
    pub status: StopStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to patch stop metadata; never touches status or order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStopMetaRequest {
    pub route_id: Uuid,
    pub stop_id: Uuid,
    #[serde(flatten)]
    pub patch: StopMetaPatch,
}

/// Partial stop metadata. `None` leaves a field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopMetaPatch {
    #[serde(default)]
    pub priority: Option<StopPriority>,
    #[serde(default, deserialize_with = "deserialize_patch_time")]
    pub time_window_start: Option<Option<NaiveTime>>,
    #[serde(default, deserialize_with = "deserialize_patch_time")]
    pub time_window_end: Option<Option<NaiveTime>>,
    #[serde(default)]
    pub expected_duration_min: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub visit_outcome: Option<Option<VisitOutcome>>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub visit_notes: Option<Option<String>>,
}

/// Request addressing a single stop of a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopIdRequest {
    pub route_id: Uuid,
    pub stop_id: Uuid,
}
