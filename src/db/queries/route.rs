//! Route database queries

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::defaults::DEFAULT_EXPECTED_DURATION_MIN;
use crate::types::{Route, RouteStatus, RouteSummary};

const ROUTE_COLUMNS: &str = r#"
    id, name, status, optimization_mode,
    total_distance_meters, total_duration_seconds,
    planned_date, created_at, updated_at
"#;

/// Create a route and its stops, one per contact, in the given order
pub async fn create_route(
    pool: &PgPool,
    name: &str,
    planned_date: Option<NaiveDate>,
    contact_ids: &[Uuid],
) -> Result<Route> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO routes (id, name, status, planned_date, created_at, updated_at)
        VALUES ($1, $2, 'planned', $3, NOW(), NOW())
        RETURNING {}
        "#,
        ROUTE_COLUMNS
    );
    let route = sqlx::query_as::<_, Route>(&sql)
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(planned_date)
        .fetch_one(&mut *tx)
        .await?;

    for (index, contact_id) in contact_ids.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO route_stops (id, route_id, contact_id, stop_order, expected_duration_min, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#
        )
        .bind(Uuid::new_v4())
        .bind(route.id)
        .bind(contact_id)
        .bind(index as i32)
        .bind(DEFAULT_EXPECTED_DURATION_MIN)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(route)
}

/// Get a route by id
pub async fn get_route(pool: &PgPool, route_id: Uuid) -> Result<Option<Route>> {
    let sql = format!("SELECT {} FROM routes WHERE id = $1", ROUTE_COLUMNS);
    let route = sqlx::query_as::<_, Route>(&sql)
        .bind(route_id)
        .fetch_optional(pool)
        .await?;

    Ok(route)
}

/// List routes with stop counts, newest first
pub async fn list_routes(pool: &PgPool, limit: i64, offset: i64) -> Result<(Vec<RouteSummary>, i64)> {
    let routes = sqlx::query_as::<_, RouteSummary>(
        r#"
        SELECT
            r.id, r.name, r.status, r.optimization_mode,
            r.total_distance_meters, r.total_duration_seconds,
            r.planned_date,
            COUNT(rs.id) AS stops_count,
            r.created_at, r.updated_at
        FROM routes r
        LEFT JOIN route_stops rs ON rs.route_id = r.id
        GROUP BY r.id
        ORDER BY r.created_at DESC, r.id
        LIMIT $1 OFFSET $2
        "#
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM routes")
        .fetch_one(pool)
        .await?;

    Ok((routes, total))
}

/// Update route header fields
pub async fn update_route(
    pool: &PgPool,
    route_id: Uuid,
    name: Option<&str>,
    status: Option<RouteStatus>,
    planned_date: Option<Option<NaiveDate>>,
) -> Result<Option<Route>> {
    let sql = format!(
        r#"
        UPDATE routes SET
            name = COALESCE($2, name),
            status = COALESCE($3, status),
            planned_date = CASE WHEN $4 THEN $5 ELSE planned_date END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ROUTE_COLUMNS
    );
    let route = sqlx::query_as::<_, Route>(&sql)
        .bind(route_id)
        .bind(name)
        .bind(status)
        .bind(planned_date.is_some())
        .bind(planned_date.flatten())
        .fetch_optional(pool)
        .await?;

    Ok(route)
}

/// Delete a route; its stops go with it
pub async fn delete_route(pool: &PgPool, route_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM routes WHERE id = $1")
        .bind(route_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
