//! Route stop database queries
//!
//! Order writes touch only `stop_order`; status and metadata writes never do.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::store::{RouteAggregates, StatusChange, WindowOrderViolation};
use crate::types::{Stop, StopMetaPatch};

/// Reads the updated/selected `s` rows back with their contact data
const STOP_WITH_CONTACT: &str = r#"
    SELECT
        s.id, s.route_id, s.contact_id, s.stop_order, s.status, s.priority,
        s.time_window_start, s.time_window_end, s.expected_duration_min,
        s.visit_notes, s.visit_outcome, s.visited_at, s.created_at,
        s.insertion_seq,
        c.display_name AS contact_name, c.latitude, c.longitude
    FROM s
    LEFT JOIN contacts c ON c.id = s.contact_id
"#;

/// Get all stops of a route in visiting order
pub async fn list_route_stops(pool: &PgPool, route_id: Uuid) -> Result<Vec<Stop>> {
    let sql = format!(
        "WITH s AS (SELECT * FROM route_stops WHERE route_id = $1) {} ORDER BY s.stop_order ASC",
        STOP_WITH_CONTACT
    );
    let stops = sqlx::query_as::<_, Stop>(&sql)
        .bind(route_id)
        .fetch_all(pool)
        .await?;

    Ok(stops)
}

/// Get one stop, scoped to its route
pub async fn get_stop(pool: &PgPool, route_id: Uuid, stop_id: Uuid) -> Result<Option<Stop>> {
    let sql = format!(
        "WITH s AS (SELECT * FROM route_stops WHERE id = $1 AND route_id = $2) {}",
        STOP_WITH_CONTACT
    );
    let stop = sqlx::query_as::<_, Stop>(&sql)
        .bind(stop_id)
        .bind(route_id)
        .fetch_optional(pool)
        .await?;

    Ok(stop)
}

/// Rewrite stop orders and route aggregates in one transaction.
///
/// The `(route_id, stop_order)` uniqueness check is deferred to commit, so
/// intermediate states may collide.
pub async fn apply_stop_orders(
    pool: &PgPool,
    route_id: Uuid,
    orders: &[(Uuid, i32)],
    aggregates: &RouteAggregates,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (stop_id, stop_order) in orders {
        let result = sqlx::query(
            "UPDATE route_stops SET stop_order = $1 WHERE id = $2 AND route_id = $3"
        )
        .bind(stop_order)
        .bind(stop_id)
        .bind(route_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Stop {} disappeared from route {} during optimization", stop_id, route_id);
        }
    }

    sqlx::query(
        r#"
        UPDATE routes SET
            total_distance_meters = $2,
            total_duration_seconds = $3,
            optimization_mode = $4,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(route_id)
    .bind(aggregates.total_distance_meters)
    .bind(aggregates.total_duration_seconds)
    .bind(aggregates.mode)
    .execute(&mut *tx)
    .await?;

    tx.commit().await.context("Failed to commit stop order")?;

    Ok(())
}

/// Set a stop's status; `visited_at` and notes are written only when given
pub async fn set_stop_status(
    pool: &PgPool,
    route_id: Uuid,
    stop_id: Uuid,
    change: &StatusChange,
) -> Result<Option<Stop>> {
    let sql = format!(
        r#"
        WITH s AS (
            UPDATE route_stops SET
                status = $3,
                visited_at = COALESCE($4, visited_at),
                visit_notes = COALESCE($5, visit_notes)
            WHERE id = $1 AND route_id = $2
            RETURNING *
        )
        {}
        "#,
        STOP_WITH_CONTACT
    );
    let stop = sqlx::query_as::<_, Stop>(&sql)
        .bind(stop_id)
        .bind(route_id)
        .bind(change.status)
        .bind(change.visited_at)
        .bind(change.notes.as_deref())
        .fetch_optional(pool)
        .await?;

    Ok(stop)
}

/// Patch stop metadata. Nullable fields carry a "present" flag so an explicit
/// null clears the column while an absent field leaves it alone.
pub async fn update_stop_meta(
    pool: &PgPool,
    route_id: Uuid,
    stop_id: Uuid,
    patch: &StopMetaPatch,
) -> Result<Option<Stop>> {
    let sql = format!(
        r#"
        WITH s AS (
            UPDATE route_stops SET
                priority = COALESCE($3, priority),
                time_window_start = CASE WHEN $4 THEN $5 ELSE time_window_start END,
                time_window_end = CASE WHEN $6 THEN $7 ELSE time_window_end END,
                expected_duration_min = COALESCE($8, expected_duration_min),
                visit_outcome = CASE WHEN $9 THEN $10 ELSE visit_outcome END,
                visit_notes = CASE WHEN $11 THEN $12 ELSE visit_notes END
            WHERE id = $1 AND route_id = $2
            RETURNING *
        )
        {}
        "#,
        STOP_WITH_CONTACT
    );
    let stop = sqlx::query_as::<_, Stop>(&sql)
        .bind(stop_id)
        .bind(route_id)
        .bind(patch.priority)
        .bind(patch.time_window_start.is_some())
        .bind(patch.time_window_start.flatten())
        .bind(patch.time_window_end.is_some())
        .bind(patch.time_window_end.flatten())
        .bind(patch.expected_duration_min)
        .bind(patch.visit_outcome.is_some())
        .bind(patch.visit_outcome.flatten())
        .bind(patch.visit_notes.is_some())
        .bind(patch.visit_notes.clone().flatten())
        .fetch_optional(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("route_stops_window_order") => {
                anyhow::Error::new(WindowOrderViolation(stop_id))
            }
            _ => anyhow::Error::new(e),
        })?;

    Ok(stop)
}

/// Remove a stop and close the gap it leaves in the order
pub async fn delete_stop(pool: &PgPool, route_id: Uuid, stop_id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let removed: Option<(i32,)> = sqlx::query_as(
        "DELETE FROM route_stops WHERE id = $1 AND route_id = $2 RETURNING stop_order"
    )
    .bind(stop_id)
    .bind(route_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((removed_order,)) = removed else {
        return Ok(false);
    };

    sqlx::query(
        "UPDATE route_stops SET stop_order = stop_order - 1 WHERE route_id = $1 AND stop_order > $2"
    )
    .bind(route_id)
    .bind(removed_order)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE routes SET updated_at = NOW() WHERE id = $1")
        .bind(route_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}
