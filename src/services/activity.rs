//! Contact activity logging

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;

/// A completed visit, as recorded on the contact's timeline
#[derive(Debug, Clone, PartialEq)]
pub struct VisitActivity {
    pub contact_id: Uuid,
    pub route_id: Uuid,
    pub stop_id: Uuid,
    pub notes: Option<String>,
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn log_visit(&self, visit: &VisitActivity) -> Result<()>;
}

/// Writes activities to `contact_activities`
pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn log_visit(&self, visit: &VisitActivity) -> Result<()> {
        queries::activity::insert_visit_activity(&self.pool, visit).await?;
        Ok(())
    }
}
