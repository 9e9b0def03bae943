//! Route/stop record store used by the optimizer and the stop lifecycle

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::types::{OptimizationMode, Route, Stop, StopMetaPatch, StopStatus};

/// A route with its stops ordered by `stop_order`
#[derive(Debug, Clone)]
pub struct RouteWithStops {
    pub route: Route,
    pub stops: Vec<Stop>,
}

/// A metadata write would leave a stop's window start after its end
#[derive(Debug, thiserror::Error)]
#[error("time window start is after end for stop {0}")]
pub struct WindowOrderViolation(pub Uuid);

/// Route-level fields written by an optimization run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteAggregates {
    pub mode: OptimizationMode,
    pub total_distance_meters: Option<f64>,
    pub total_duration_seconds: Option<i64>,
}

/// Field-execution update of one stop
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: StopStatus,
    /// Replaces `visit_notes` when present
    pub notes: Option<String>,
    /// Written only when present; otherwise the stored timestamp is kept
    pub visited_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn load_route_with_stops(&self, route_id: Uuid) -> Result<Option<RouteWithStops>>;

    /// Write `(stop_id, stop_order)` pairs in the given sequence, then the
    /// route aggregates. All or nothing.
    async fn apply_optimization(
        &self,
        route_id: Uuid,
        orders: &[(Uuid, i32)],
        aggregates: &RouteAggregates,
    ) -> Result<()>;

    async fn get_stop(&self, route_id: Uuid, stop_id: Uuid) -> Result<Option<Stop>>;

    /// `None` when the stop does not exist on that route
    async fn set_stop_status(&self, route_id: Uuid, stop_id: Uuid, change: &StatusChange) -> Result<Option<Stop>>;

    /// `None` when the stop does not exist on that route. Fails with
    /// [`WindowOrderViolation`] when the stored window would be reversed.
    async fn update_stop_meta(&self, route_id: Uuid, stop_id: Uuid, patch: &StopMetaPatch) -> Result<Option<Stop>>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgRouteStore {
    pool: PgPool,
}

impl PgRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteStore for PgRouteStore {
    async fn load_route_with_stops(&self, route_id: Uuid) -> Result<Option<RouteWithStops>> {
        let Some(route) = queries::route::get_route(&self.pool, route_id).await? else {
            return Ok(None);
        };
        let stops = queries::stop::list_route_stops(&self.pool, route_id).await?;
        Ok(Some(RouteWithStops { route, stops }))
    }

    async fn apply_optimization(
        &self,
        route_id: Uuid,
        orders: &[(Uuid, i32)],
        aggregates: &RouteAggregates,
    ) -> Result<()> {
        queries::stop::apply_stop_orders(&self.pool, route_id, orders, aggregates).await
    }

    async fn get_stop(&self, route_id: Uuid, stop_id: Uuid) -> Result<Option<Stop>> {
        queries::stop::get_stop(&self.pool, route_id, stop_id).await
    }

    async fn set_stop_status(&self, route_id: Uuid, stop_id: Uuid, change: &StatusChange) -> Result<Option<Stop>> {
        queries::stop::set_stop_status(&self.pool, route_id, stop_id, change).await
    }

    async fn update_stop_meta(&self, route_id: Uuid, stop_id: Uuid, patch: &StopMetaPatch) -> Result<Option<Stop>> {
        queries::stop::update_stop_meta(&self.pool, route_id, stop_id, patch).await
    }
}
