// src/services/review_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        review_repo::{NewReviewer, NewSubmission},
        EventRepository, ReviewRepository, UserRepository,
    },
    models::{
        auth::UserRole,
        review::{
            AssignmentKind, CreateReviewerPayload, CreateSubmissionPayload, DistributePayload,
            DistributionReport, ManualAssignmentPayload, Review, ReviewAssignment, Reviewer,
            Submission, SubmissionStatus, SubmitReviewPayload,
        },
    },
    services::distribution::{check_manual_assignment, plan_distribution},
};

#[derive(Clone)]
pub struct ReviewService {
    review_repo: ReviewRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl ReviewService {
    pub fn new(
        review_repo: ReviewRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
        pool: PgPool,
    ) -> Self {
        Self { review_repo, event_repo, user_repo, pool }
    }

    async fn ensure_event(&self, tenant_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
        self.event_repo
            .find_event(&self.pool, tenant_id, event_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))
    }

    // =========================================================================
    //  CADASTROS
    // =========================================================================

    pub async fn create_submission(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        payload: &CreateSubmissionPayload,
    ) -> Result<Submission, AppError> {
        self.ensure_event(tenant_id, event_id).await?;

        let keywords: Vec<String> = payload
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let submission = self
            .review_repo
            .create_submission(
                &self.pool,
                tenant_id,
                event_id,
                &NewSubmission {
                    title: payload.title.trim(),
                    abstract_text: payload.abstract_text.as_deref(),
                    thematic_area: payload.thematic_area.trim(),
                    keywords: &keywords,
                    authors: &payload.authors,
                },
            )
            .await?;

        tracing::info!("📄 Trabalho {} submetido no evento {}", submission.id, event_id);
        Ok(submission)
    }

    pub async fn list_submissions(&self, tenant_id: Uuid, event_id: Uuid) -> Result<Vec<Submission>, AppError> {
        self.ensure_event(tenant_id, event_id).await?;
        self.review_repo.list_submissions(&self.pool, tenant_id, event_id).await
    }

    /// Cadastra o revisor. Se já existir uma conta REVIEWER com o mesmo
    /// e-mail, ela é vinculada para que o revisor veja suas atribuições.
    pub async fn create_reviewer(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        payload: &CreateReviewerPayload,
    ) -> Result<Reviewer, AppError> {
        self.ensure_event(tenant_id, event_id).await?;

        let email = payload.email.trim().to_lowercase();
        let user_id = self
            .user_repo
            .find_by_email(&email)
            .await?
            .filter(|user| user.role == UserRole::Reviewer)
            .map(|user| user.id);

        let areas: Vec<String> = payload
            .areas
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let reviewer = self
            .review_repo
            .create_reviewer(
                &self.pool,
                tenant_id,
                event_id,
                &NewReviewer {
                    user_id,
                    full_name: payload.full_name.trim(),
                    email: &email,
                    areas: &areas,
                    max_assignments: payload.max_assignments,
                },
            )
            .await?;

        tracing::info!(
            "🧑‍🏫 Revisor {} cadastrado no evento {} (conta vinculada: {})",
            reviewer.id,
            event_id,
            reviewer.user_id.is_some()
        );
        Ok(reviewer)
    }

    pub async fn list_reviewers(&self, tenant_id: Uuid, event_id: Uuid) -> Result<Vec<Reviewer>, AppError> {
        self.ensure_event(tenant_id, event_id).await?;
        self.review_repo.list_reviewers(&self.pool, tenant_id, event_id).await
    }

    pub async fn set_reviewer_active(
        &self,
        tenant_id: Uuid,
        reviewer_id: Uuid,
        is_active: bool,
    ) -> Result<Reviewer, AppError> {
        self.review_repo
            .set_reviewer_active(&self.pool, tenant_id, reviewer_id, is_active)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("revisor".into()))
    }

    // =========================================================================
    //  DISTRIBUIÇÃO
    // =========================================================================

    /// Distribuição automática. Reexecutar não duplica pares: o que já existe
    /// conta para a cobertura de cada trabalho.
    pub async fn distribute(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        payload: &DistributePayload,
    ) -> Result<DistributionReport, AppError> {
        let mut tx = self.pool.begin().await?;

        self.event_repo
            .find_event(&mut *tx, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        // Serializa distribuições e atribuições manuais do mesmo evento:
        // a carga lida abaixo vale até o commit.
        self.review_repo.lock_event_assignments(&mut *tx, event_id).await?;

        let submissions = self.review_repo.list_submissions(&mut *tx, tenant_id, event_id).await?;
        let reviewers = self.review_repo.list_reviewers(&mut *tx, tenant_id, event_id).await?;
        let existing = self
            .review_repo
            .list_assignments_for_event(&mut *tx, tenant_id, event_id)
            .await?;

        let plan = plan_distribution(&submissions, &reviewers, &existing, payload.reviewers_per_submission);

        let mut created = Vec::with_capacity(plan.assignments.len());
        for planned in &plan.assignments {
            if let Some(assignment) = self
                .review_repo
                .create_assignment(
                    &mut *tx,
                    tenant_id,
                    planned.submission_id,
                    planned.reviewer_id,
                    planned.score,
                    AssignmentKind::Automatic,
                    payload.due_date,
                )
                .await?
            {
                created.push(assignment);
            }
        }

        // Trabalhos que receberam revisores passam para UNDER_REVIEW
        for submission in &submissions {
            let touched = created.iter().any(|a| a.submission_id == submission.id);
            if !touched {
                continue;
            }
            if let Some(next) = submission.status.after_new_assignment() {
                self.review_repo
                    .set_submission_status(&mut *tx, submission.id, next)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "🎯 Distribuição do evento {}: {} atribuições novas, {} trabalhos pendentes",
            event_id,
            created.len(),
            plan.pending.len()
        );
        if !plan.pending.is_empty() {
            tracing::warn!("⚠️ {} trabalhos sem revisores suficientes", plan.pending.len());
        }

        Ok(DistributionReport { created, pending: plan.pending })
    }

    pub async fn assign_manually(
        &self,
        tenant_id: Uuid,
        payload: &ManualAssignmentPayload,
    ) -> Result<ReviewAssignment, AppError> {
        let mut tx = self.pool.begin().await?;

        let submission = self
            .review_repo
            .find_submission(&mut *tx, tenant_id, payload.submission_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("trabalho".into()))?;

        let reviewer = self
            .review_repo
            .find_reviewer(&mut *tx, tenant_id, payload.reviewer_id)
            .await?
            .filter(|r| r.event_id == submission.event_id)
            .ok_or_else(|| AppError::ResourceNotFound("revisor".into()))?;

        self.review_repo
            .lock_event_assignments(&mut *tx, submission.event_id)
            .await?;

        if self
            .review_repo
            .pair_exists(&mut *tx, submission.id, reviewer.id)
            .await?
        {
            return Err(AppError::UniqueConstraintViolation("atribuição".into()));
        }

        let load = self.review_repo.reviewer_load(&mut *tx, reviewer.id).await?;
        let score = check_manual_assignment(&reviewer, &submission, load)?;

        let assignment = self
            .review_repo
            .create_assignment(
                &mut *tx,
                tenant_id,
                submission.id,
                reviewer.id,
                score,
                AssignmentKind::Manual,
                payload.due_date,
            )
            .await?
            .ok_or_else(|| AppError::UniqueConstraintViolation("atribuição".into()))?;

        // Trabalho já revisado volta para revisão com a nova atribuição aberta
        if let Some(next) = submission.status.after_new_assignment() {
            self.review_repo
                .set_submission_status(&mut *tx, submission.id, next)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "✍️ Atribuição manual: trabalho {} -> revisor {}",
            submission.id,
            reviewer.id
        );
        Ok(assignment)
    }

    // =========================================================================
    //  REVISOR
    // =========================================================================

    pub async fn my_assignments(&self, user_id: Uuid) -> Result<Vec<ReviewAssignment>, AppError> {
        self.review_repo.list_assignments_for_user(&self.pool, user_id).await
    }

    /// Envia o parecer. Quando todas as atribuições do trabalho estão
    /// concluídas, ele passa para REVIEWED.
    pub async fn submit_review(
        &self,
        user_id: Uuid,
        assignment_id: Uuid,
        payload: &SubmitReviewPayload,
    ) -> Result<Review, AppError> {
        let mut tx = self.pool.begin().await?;

        let assignment = self
            .review_repo
            .find_assignment_for_update(&mut *tx, assignment_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("atribuição".into()))?;

        self.review_repo
            .find_reviewer_by_id(&mut *tx, assignment.reviewer_id)
            .await?
            .filter(|r| r.user_id == Some(user_id))
            .ok_or_else(|| AppError::ResourceNotFound("atribuição".into()))?;

        if assignment.completed {
            return Err(AppError::AssignmentAlreadyCompleted);
        }

        let review = self
            .review_repo
            .create_review(
                &mut *tx,
                assignment.id,
                payload.grade,
                payload.recommendation,
                payload.opinion.trim(),
            )
            .await?;

        self.review_repo
            .mark_assignment_completed(&mut *tx, assignment.id)
            .await?;

        let open = self
            .review_repo
            .count_open_assignments(&mut *tx, assignment.submission_id)
            .await?;
        let status = if open == 0 {
            SubmissionStatus::Reviewed
        } else {
            SubmissionStatus::UnderReview
        };
        self.review_repo
            .set_submission_status(&mut *tx, assignment.submission_id, status)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📝 Parecer enviado para a atribuição {} (trabalho {:?})",
            assignment.id,
            status
        );
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::fixtures,
        models::review::ReviewRecommendation,
    };

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn manual_assignment_reopens_a_reviewed_submission(pool: PgPool) {
        let service = fixtures::review_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let account = fixtures::user(&pool, UserRole::Reviewer).await;

        let submission = service
            .create_submission(tenant_id, event.id, &fixtures::submission_payload("Eclipses", "Ana Lima"))
            .await
            .unwrap();
        let first = service
            .create_reviewer(
                tenant_id,
                event.id,
                &fixtures::reviewer_payload("Bruno Reis", &account.email, 3),
            )
            .await
            .unwrap();
        let second = service
            .create_reviewer(tenant_id, event.id, &fixtures::reviewer_payload("Carla Souza", "carla@uni.br", 3))
            .await
            .unwrap();

        let assignment = service
            .assign_manually(
                tenant_id,
                &ManualAssignmentPayload { submission_id: submission.id, reviewer_id: first.id, due_date: None },
            )
            .await
            .unwrap();
        service
            .submit_review(
                account.id,
                assignment.id,
                &SubmitReviewPayload {
                    grade: 9,
                    recommendation: ReviewRecommendation::Accept,
                    opinion: "Trabalho consistente.".to_string(),
                },
            )
            .await
            .unwrap();

        let repo = ReviewRepository::new();
        let reviewed = repo.find_submission(&pool, tenant_id, submission.id).await.unwrap().unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Reviewed);

        service
            .assign_manually(
                tenant_id,
                &ManualAssignmentPayload { submission_id: submission.id, reviewer_id: second.id, due_date: None },
            )
            .await
            .unwrap();

        let reopened = repo.find_submission(&pool, tenant_id, submission.id).await.unwrap().unwrap();
        assert_eq!(reopened.status, SubmissionStatus::UnderReview);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn concurrent_assignments_respect_reviewer_limit(pool: PgPool) {
        let service = fixtures::review_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;

        service
            .create_submission(tenant_id, event.id, &fixtures::submission_payload("Eclipses", "Ana Lima"))
            .await
            .unwrap();
        let late = service
            .create_submission(tenant_id, event.id, &fixtures::submission_payload("Cometas", "Davi Rocha"))
            .await
            .unwrap();
        let reviewer = service
            .create_reviewer(tenant_id, event.id, &fixtures::reviewer_payload("Bruno Reis", "bruno@uni.br", 1))
            .await
            .unwrap();

        let distribute = DistributePayload { reviewers_per_submission: 1, due_date: None };
        let manual = ManualAssignmentPayload { submission_id: late.id, reviewer_id: reviewer.id, due_date: None };

        let (auto, by_hand) = tokio::join!(
            service.distribute(tenant_id, event.id, &distribute),
            service.assign_manually(tenant_id, &manual),
        );
        auto.unwrap();
        if let Err(err) = by_hand {
            assert!(matches!(err, AppError::ReviewerOverloaded));
        }

        let load = ReviewRepository::new().reviewer_load(&pool, reviewer.id).await.unwrap();
        assert_eq!(load, 1);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn rerunning_distribution_creates_nothing_new(pool: PgPool) {
        let service = fixtures::review_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;

        service
            .create_submission(tenant_id, event.id, &fixtures::submission_payload("Eclipses", "Ana Lima"))
            .await
            .unwrap();
        service
            .create_reviewer(tenant_id, event.id, &fixtures::reviewer_payload("Bruno Reis", "bruno@uni.br", 5))
            .await
            .unwrap();

        let payload = DistributePayload { reviewers_per_submission: 1, due_date: None };
        let first = service.distribute(tenant_id, event.id, &payload).await.unwrap();
        assert_eq!(first.created.len(), 1);

        let second = service.distribute(tenant_id, event.id, &payload).await.unwrap();
        assert!(second.created.is_empty());
        assert!(second.pending.is_empty());
    }
}
