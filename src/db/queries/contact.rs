//! Contact database queries (read-only; contacts are owned by CRM sync)

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::geo::BoundingBox;
use crate::types::ContactLocation;

/// Geocoded contacts inside a bounding box
pub async fn list_geocoded_in_box(pool: &PgPool, bounds: &BoundingBox) -> Result<Vec<ContactLocation>> {
    let contacts = sqlx::query_as::<_, ContactLocation>(
        r#"
        SELECT id, display_name, account_name, latitude, longitude
        FROM contacts
        WHERE latitude IS NOT NULL AND longitude IS NOT NULL
          AND latitude BETWEEN $1 AND $2
          AND longitude BETWEEN $3 AND $4
        ORDER BY display_name, id
        "#
    )
    .bind(bounds.min_lat)
    .bind(bounds.max_lat)
    .bind(bounds.min_lng)
    .bind(bounds.max_lng)
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}

/// Which of `ids` have no contact row
pub async fn find_missing(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let missing: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT wanted.id
        FROM UNNEST($1::uuid[]) AS wanted(id)
        LEFT JOIN contacts c ON c.id = wanted.id
        WHERE c.id IS NULL
        "#
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(missing.into_iter().map(|(id,)| id).collect())
}
