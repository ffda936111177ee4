// src/services/report_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{EventRepository, ReportRepository},
    models::reports::{ReviewSummary, SchedulingSummary},
};

#[derive(Clone)]
pub struct ReportService {
    repo: ReportRepository,
    event_repo: EventRepository,
    clock: Clock,
    pool: PgPool,
}

impl ReportService {
    pub fn new(repo: ReportRepository, event_repo: EventRepository, clock: Clock, pool: PgPool) -> Self {
        Self { repo, event_repo, clock, pool }
    }

    pub async fn scheduling_summary(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<SchedulingSummary, AppError> {
        self.event_repo
            .find_event(&self.pool, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        self.repo
            .scheduling_summary(&self.pool, tenant_id, event_id, self.clock.now())
            .await
    }

    pub async fn review_summary(&self, tenant_id: Uuid, event_id: Uuid) -> Result<ReviewSummary, AppError> {
        self.event_repo
            .find_event(&self.pool, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        self.repo.review_summary(&self.pool, tenant_id, event_id).await
    }
}
