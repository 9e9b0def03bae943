//! Stop status transitions and metadata edits

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{RouteStore, StatusChange, WindowOrderViolation};
use crate::defaults::MAX_VISIT_NOTES_LEN;
use crate::error::StopError;
use crate::services::activity::{ActivityLog, VisitActivity};
use crate::types::{Stop, StopMetaPatch, StopStatus};

pub struct StopLifecycle {
    store: Arc<dyn RouteStore>,
    activity: Arc<dyn ActivityLog>,
}

impl StopLifecycle {
    pub fn new(store: Arc<dyn RouteStore>, activity: Arc<dyn ActivityLog>) -> Self {
        Self { store, activity }
    }

    /// Move a stop to `status`. Any state may move to any other; repeating a
    /// transition is harmless apart from refreshing `visited_at`.
    pub async fn set_status(
        &self,
        route_id: Uuid,
        stop_id: Uuid,
        status: StopStatus,
        notes: Option<String>,
    ) -> Result<Stop, StopError> {
        if let Some(notes) = &notes {
            validate_notes(notes)?;
        }

        let change = StatusChange {
            status,
            notes,
            visited_at: (status == StopStatus::Visited).then(Utc::now),
        };

        let stop = self
            .store
            .set_stop_status(route_id, stop_id, &change)
            .await?
            .ok_or(StopError::NotFound { route_id, stop_id })?;

        info!("Stop {} on route {} is now {}", stop_id, route_id, status.as_str());

        if status == StopStatus::Visited {
            self.log_visit(&stop);
        }

        Ok(stop)
    }

    /// Apply a metadata patch; status and order are never touched
    pub async fn update_meta(&self, route_id: Uuid, stop_id: Uuid, patch: StopMetaPatch) -> Result<Stop, StopError> {
        if let Some(minutes) = patch.expected_duration_min {
            if minutes < 1 {
                return Err(StopError::InvalidInput(format!(
                    "expectedDurationMin must be at least 1, got {}",
                    minutes
                )));
            }
        }
        if let Some(Some(notes)) = &patch.visit_notes {
            validate_notes(notes)?;
        }

        // Window bounds are checked against what the stop will hold afterwards
        if patch.time_window_start.is_some() || patch.time_window_end.is_some() {
            let current = self
                .store
                .get_stop(route_id, stop_id)
                .await?
                .ok_or(StopError::NotFound { route_id, stop_id })?;
            let start = patch.time_window_start.unwrap_or(current.time_window_start);
            let end = patch.time_window_end.unwrap_or(current.time_window_end);
            if let (Some(start), Some(end)) = (start, end) {
                if start > end {
                    return Err(StopError::InvalidInput(format!(
                        "time window start {} is after end {}",
                        start.format("%H:%M"),
                        end.format("%H:%M")
                    )));
                }
            }
        }

        // A concurrent patch can still reverse the window before this write lands
        let stop = match self.store.update_stop_meta(route_id, stop_id, &patch).await {
            Ok(stop) => stop.ok_or(StopError::NotFound { route_id, stop_id })?,
            Err(e) if e.is::<WindowOrderViolation>() => {
                return Err(StopError::InvalidInput(
                    "time window start would be after its end".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Stop {} on route {} metadata updated", stop_id, route_id);
        Ok(stop)
    }

    /// Record the visit on the contact timeline without holding up the caller
    fn log_visit(&self, stop: &Stop) {
        let activity = self.activity.clone();
        let visit = VisitActivity {
            contact_id: stop.contact_id,
            route_id: stop.route_id,
            stop_id: stop.id,
            notes: stop.visit_notes.clone(),
        };

        tokio::spawn(async move {
            if let Err(e) = activity.log_visit(&visit).await {
                warn!("Failed to log visit activity for stop {}: {:#}", visit.stop_id, e);
            }
        });
    }
}

fn validate_notes(notes: &str) -> Result<(), StopError> {
    let length = notes.chars().count();
    if length > MAX_VISIT_NOTES_LEN {
        return Err(StopError::InvalidInput(format!(
            "visit notes are limited to {} characters, got {}",
            MAX_VISIT_NOTES_LEN, length
        )));
    }
    Ok(())
}
