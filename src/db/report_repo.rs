// src/db/report_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::{
        reports::{ReviewSummary, ReviewerLoad, SchedulingSummary, StatusCount},
        scheduling::BookingStatus,
    },
};

#[derive(sqlx::FromRow)]
struct ReviewerLoadRow {
    reviewer_id: Uuid,
    full_name: String,
    assigned: i64,
    completed: i64,
    max_assignments: i32,
}

#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Resumo do agendamento de visitas
    pub async fn scheduling_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SchedulingSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Snapshot consistente de todos os números
        let mut tx = executor.begin().await?;

        // A. Horários e vagas
        let (slots, total_capacity, available_seats) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_capacity), 0)::BIGINT,
                   COALESCE(SUM(available_seats), 0)::BIGINT
            FROM visit_slots
            WHERE tenant_id = $1 AND event_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        // B. Agendamentos por status
        let by_status = sqlx::query_as::<_, (BookingStatus, i64, i64)>(
            r#"
            SELECT b.status, COUNT(*), COALESCE(SUM(b.student_count), 0)::BIGINT
            FROM visit_bookings b
            JOIN visit_slots s ON s.id = b.slot_id
            WHERE b.tenant_id = $1 AND s.event_id = $2
            GROUP BY b.status
            ORDER BY b.status
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(status, bookings, students)| StatusCount { status, bookings, students })
        .collect();

        // C. Check-ins realizados
        let checkins = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM visit_bookings b
            JOIN visit_slots s ON s.id = b.slot_id
            WHERE b.tenant_id = $1 AND s.event_id = $2 AND b.checked_in = TRUE
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        // D. Professores bloqueados neste momento
        let active_blocks = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM teacher_blocks
            WHERE tenant_id = $1 AND event_id = $2 AND blocked_until > $3
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SchedulingSummary {
            event_id,
            slots,
            total_capacity,
            available_seats,
            occupancy_percent: SchedulingSummary::occupancy(total_capacity, available_seats),
            by_status,
            checkins,
            active_blocks,
        })
    }

    // 2. Resumo da revisão de trabalhos
    pub async fn review_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<ReviewSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let (submitted, under_review, reviewed) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'SUBMITTED'),
                   COUNT(*) FILTER (WHERE status = 'UNDER_REVIEW'),
                   COUNT(*) FILTER (WHERE status = 'REVIEWED')
            FROM submissions
            WHERE tenant_id = $1 AND event_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        let (assignments_completed, assignments_pending) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE a.completed),
                   COUNT(*) FILTER (WHERE NOT a.completed)
            FROM review_assignments a
            JOIN submissions s ON s.id = a.submission_id
            WHERE a.tenant_id = $1 AND s.event_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        let reviewers = sqlx::query_as::<_, ReviewerLoadRow>(
            r#"
            SELECT r.id AS reviewer_id,
                   r.full_name,
                   COUNT(a.id) AS assigned,
                   COUNT(a.id) FILTER (WHERE a.completed) AS completed,
                   r.max_assignments
            FROM reviewers r
            LEFT JOIN review_assignments a ON a.reviewer_id = r.id
            WHERE r.tenant_id = $1 AND r.event_id = $2
            GROUP BY r.id, r.full_name, r.max_assignments
            ORDER BY r.full_name
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| ReviewerLoad {
            reviewer_id: row.reviewer_id,
            full_name: row.full_name,
            assigned: row.assigned,
            completed: row.completed,
            max_assignments: row.max_assignments,
        })
        .collect();

        tx.commit().await?;

        Ok(ReviewSummary {
            event_id,
            submitted,
            under_review,
            reviewed,
            assignments_completed,
            assignments_pending,
            reviewers,
        })
    }
}
