//! In-memory `RouteStore` for service tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::defaults::DEFAULT_EXPECTED_DURATION_MIN;
use crate::types::{Route, RouteStatus, Stop, StopMetaPatch, StopPriority, StopStatus};

use super::store::{RouteAggregates, RouteStore, RouteWithStops, StatusChange, WindowOrderViolation};

#[derive(Default)]
struct State {
    routes: HashMap<Uuid, Route>,
    stops: HashMap<Uuid, Stop>,
    next_seq: i64,
}

#[derive(Default)]
pub struct MemoryRouteStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail without changing anything
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn insert_route(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: RouteStatus::Planned,
            optimization_mode: None,
            total_distance_meters: None,
            total_duration_seconds: None,
            planned_date: None,
            created_at: now,
            updated_at: now,
        };
        let id = route.id;
        self.state.lock().routes.insert(id, route);
        id
    }

    /// Append a stop at the end of the route
    pub fn add_stop(&self, route_id: Uuid, location: Option<(f64, f64)>) -> Uuid {
        let mut state = self.state.lock();
        let next_order = state.stops.values().filter(|s| s.route_id == route_id).count() as i32;
        state.next_seq += 1;
        let stop = Stop {
            id: Uuid::new_v4(),
            route_id,
            contact_id: Uuid::new_v4(),
            stop_order: next_order,
            status: StopStatus::Pending,
            priority: StopPriority::NiceToVisit,
            time_window_start: None,
            time_window_end: None,
            expected_duration_min: DEFAULT_EXPECTED_DURATION_MIN,
            visit_notes: None,
            visit_outcome: None,
            visited_at: None,
            created_at: Utc::now(),
            insertion_seq: state.next_seq,
            contact_name: Some(format!("Contact {}", next_order)),
            latitude: location.map(|(lat, _)| lat),
            longitude: location.map(|(_, lng)| lng),
        };
        let id = stop.id;
        state.stops.insert(id, stop);
        id
    }

    /// Edit a stored stop directly
    pub fn edit_stop(&self, stop_id: Uuid, edit: impl FnOnce(&mut Stop)) {
        if let Some(stop) = self.state.lock().stops.get_mut(&stop_id) {
            edit(stop);
        }
    }

    pub fn route(&self, route_id: Uuid) -> Option<Route> {
        self.state.lock().routes.get(&route_id).cloned()
    }

    pub fn stop(&self, stop_id: Uuid) -> Option<Stop> {
        self.state.lock().stops.get(&stop_id).cloned()
    }

    /// Stops of a route by `stop_order`
    pub fn stops(&self, route_id: Uuid) -> Vec<Stop> {
        let state = self.state.lock();
        sorted_stops(&state, route_id)
    }

    pub fn stop_ids(&self, route_id: Uuid) -> Vec<Uuid> {
        self.stops(route_id).into_iter().map(|s| s.id).collect()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        Ok(())
    }
}

fn sorted_stops(state: &State, route_id: Uuid) -> Vec<Stop> {
    let mut stops: Vec<Stop> = state
        .stops
        .values()
        .filter(|s| s.route_id == route_id)
        .cloned()
        .collect();
    stops.sort_by_key(|s| s.stop_order);
    stops
}

fn stop_on_route<'a>(state: &'a mut State, route_id: Uuid, stop_id: Uuid) -> Option<&'a mut Stop> {
    state.stops.get_mut(&stop_id).filter(|s| s.route_id == route_id)
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn load_route_with_stops(&self, route_id: Uuid) -> Result<Option<RouteWithStops>> {
        let state = self.state.lock();
        Ok(state.routes.get(&route_id).map(|route| RouteWithStops {
            route: route.clone(),
            stops: sorted_stops(&state, route_id),
        }))
    }

    async fn apply_optimization(
        &self,
        route_id: Uuid,
        orders: &[(Uuid, i32)],
        aggregates: &RouteAggregates,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock();

        if !state.routes.contains_key(&route_id) {
            anyhow::bail!("route {} missing", route_id);
        }
        for (stop_id, _) in orders {
            if !state.stops.get(stop_id).is_some_and(|s| s.route_id == route_id) {
                anyhow::bail!("stop {} missing", stop_id);
            }
        }

        // Same check the deferred unique constraint makes at commit
        let mut updated = state.stops.clone();
        for (stop_id, order) in orders {
            if let Some(stop) = updated.get_mut(stop_id) {
                stop.stop_order = *order;
            }
        }
        let mut final_orders: Vec<i32> = updated
            .values()
            .filter(|s| s.route_id == route_id)
            .map(|s| s.stop_order)
            .collect();
        final_orders.sort_unstable();
        if final_orders != (0..final_orders.len() as i32).collect::<Vec<_>>() {
            anyhow::bail!("stop orders of route {} are not dense", route_id);
        }

        state.stops = updated;
        if let Some(route) = state.routes.get_mut(&route_id) {
            route.optimization_mode = Some(aggregates.mode);
            route.total_distance_meters = aggregates.total_distance_meters;
            route.total_duration_seconds = aggregates.total_duration_seconds;
            route.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_stop(&self, route_id: Uuid, stop_id: Uuid) -> Result<Option<Stop>> {
        let mut state = self.state.lock();
        Ok(stop_on_route(&mut state, route_id, stop_id).map(|s| s.clone()))
    }

    async fn set_stop_status(&self, route_id: Uuid, stop_id: Uuid, change: &StatusChange) -> Result<Option<Stop>> {
        self.check_writable()?;
        let mut state = self.state.lock();
        let Some(stop) = stop_on_route(&mut state, route_id, stop_id) else {
            return Ok(None);
        };

        stop.status = change.status;
        if let Some(visited_at) = change.visited_at {
            stop.visited_at = Some(visited_at);
        }
        if let Some(notes) = &change.notes {
            stop.visit_notes = Some(notes.clone());
        }
        Ok(Some(stop.clone()))
    }

    async fn update_stop_meta(&self, route_id: Uuid, stop_id: Uuid, patch: &StopMetaPatch) -> Result<Option<Stop>> {
        self.check_writable()?;
        let mut state = self.state.lock();
        let Some(stop) = stop_on_route(&mut state, route_id, stop_id) else {
            return Ok(None);
        };

        // Same check as the window-order constraint
        let start = patch.time_window_start.unwrap_or(stop.time_window_start);
        let end = patch.time_window_end.unwrap_or(stop.time_window_end);
        if matches!((start, end), (Some(start), Some(end)) if start > end) {
            return Err(WindowOrderViolation(stop_id).into());
        }

        if let Some(priority) = patch.priority {
            stop.priority = priority;
        }
        if let Some(start) = patch.time_window_start {
            stop.time_window_start = start;
        }
        if let Some(end) = patch.time_window_end {
            stop.time_window_end = end;
        }
        if let Some(minutes) = patch.expected_duration_min {
            stop.expected_duration_min = minutes;
        }
        if let Some(outcome) = patch.visit_outcome {
            stop.visit_outcome = outcome;
        }
        if let Some(notes) = &patch.visit_notes {
            stop.visit_notes = notes.clone();
        }
        Ok(Some(stop.clone()))
    }
}
