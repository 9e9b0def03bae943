//! Contact activity queries

use anyhow::Result;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::activity::VisitActivity;

/// Record a visit on the contact's activity timeline
pub async fn insert_visit_activity(pool: &PgPool, visit: &VisitActivity) -> Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO contact_activities (id, contact_id, activity_type, title, content, metadata, created_at)
        VALUES ($1, $2, 'visit', 'Visited', $3, $4, NOW())
        RETURNING id
        "#
    )
    .bind(Uuid::new_v4())
    .bind(visit.contact_id)
    .bind(visit.notes.as_deref())
    .bind(json!({ "route_id": visit.route_id, "stop_id": visit.stop_id }))
    .fetch_one(pool)
    .await?;

    Ok(id)
}
