// src/db/review_repo.rs

use chrono::NaiveDate;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::review::{
        AssignmentKind, Author, Review, ReviewAssignment, ReviewRecommendation, Reviewer,
        Submission, SubmissionStatus,
    },
};

pub struct NewSubmission<'a> {
    pub title: &'a str,
    pub abstract_text: Option<&'a str>,
    pub thematic_area: &'a str,
    pub keywords: &'a [String],
    pub authors: &'a [Author],
}

pub struct NewReviewer<'a> {
    pub user_id: Option<Uuid>,
    pub full_name: &'a str,
    pub email: &'a str,
    pub areas: &'a [String],
    pub max_assignments: i32,
}

#[derive(Clone, Default)]
pub struct ReviewRepository;

impl ReviewRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  TRABALHOS
    // =========================================================================

    pub async fn create_submission<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        input: &NewSubmission<'_>,
    ) -> Result<Submission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                tenant_id, event_id, title, abstract_text, thematic_area, keywords, authors
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(input.title)
        .bind(input.abstract_text)
        .bind(input.thematic_area)
        .bind(input.keywords)
        .bind(Json(input.authors))
        .fetch_one(executor)
        .await?;
        Ok(submission)
    }

    // Ordem de criação: é a ordem em que a distribuição percorre os trabalhos
    pub async fn list_submissions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<Submission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE tenant_id = $1 AND event_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(submissions)
    }

    pub async fn find_submission<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        submission_id: Uuid,
    ) -> Result<Option<Submission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let submission = sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(submission_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(submission)
    }

    pub async fn set_submission_status<'e, E>(
        &self,
        executor: E,
        submission_id: Uuid,
        status: SubmissionStatus,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE submissions SET status = $2 WHERE id = $1")
            .bind(submission_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  REVISORES
    // =========================================================================

    pub async fn create_reviewer<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        input: &NewReviewer<'_>,
    ) -> Result<Reviewer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Reviewer>(
            r#"
            INSERT INTO reviewers (
                tenant_id, event_id, user_id, full_name, email, areas, max_assignments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(input.user_id)
        .bind(input.full_name)
        .bind(input.email)
        .bind(input.areas)
        .bind(input.max_assignments)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!("revisor '{}'", input.email));
                }
            }
            e.into()
        })
    }

    /// Vincula a conta recém-criada aos cadastros de revisor com o mesmo
    /// e-mail que ainda não têm usuário. Devolve quantos foram vinculados.
    pub async fn link_reviewer_accounts<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        email: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE reviewers SET user_id = $1 WHERE lower(email) = lower($2) AND user_id IS NULL",
        )
        .bind(user_id)
        .bind(email)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_reviewers<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<Reviewer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reviewers = sqlx::query_as::<_, Reviewer>(
            r#"
            SELECT * FROM reviewers
            WHERE tenant_id = $1 AND event_id = $2
            ORDER BY full_name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(reviewers)
    }

    pub async fn find_reviewer<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<Reviewer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reviewer = sqlx::query_as::<_, Reviewer>(
            "SELECT * FROM reviewers WHERE id = $1 AND tenant_id = $2",
        )
        .bind(reviewer_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(reviewer)
    }

    pub async fn set_reviewer_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reviewer_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Reviewer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reviewer = sqlx::query_as::<_, Reviewer>(
            "UPDATE reviewers SET is_active = $3 WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(reviewer_id)
        .bind(tenant_id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(reviewer)
    }

    // =========================================================================
    //  ATRIBUIÇÕES
    // =========================================================================

    pub async fn list_assignments_for_event<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<ReviewAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignments = sqlx::query_as::<_, ReviewAssignment>(
            r#"
            SELECT a.* FROM review_assignments a
            JOIN submissions s ON s.id = a.submission_id
            WHERE a.tenant_id = $1 AND s.event_id = $2
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(assignments)
    }

    // Trava transacional por evento (liberada no commit/rollback)
    pub async fn lock_event_assignments<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(event_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Carga do revisor: todas as atribuições, concluídas ou não
    pub async fn reviewer_load<'e, E>(
        &self,
        executor: E,
        reviewer_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let load = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM review_assignments WHERE reviewer_id = $1",
        )
        .bind(reviewer_id)
        .fetch_one(executor)
        .await?;
        Ok(load)
    }

    pub async fn pair_exists<'e, E>(
        &self,
        executor: E,
        submission_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM review_assignments WHERE submission_id = $1 AND reviewer_id = $2
            )
            "#,
        )
        .bind(submission_id)
        .bind(reviewer_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Cria a atribuição; se o par já existir devolve `None` (reexecução idempotente).
    pub async fn create_assignment<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        submission_id: Uuid,
        reviewer_id: Uuid,
        score: f64,
        kind: AssignmentKind,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<ReviewAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignment = sqlx::query_as::<_, ReviewAssignment>(
            r#"
            INSERT INTO review_assignments (
                tenant_id, submission_id, reviewer_id, score, kind, due_date
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (submission_id, reviewer_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(submission_id)
        .bind(reviewer_id)
        .bind(score)
        .bind(kind)
        .bind(due_date)
        .fetch_optional(executor)
        .await?;
        Ok(assignment)
    }

    pub async fn find_assignment_for_update<'e, E>(
        &self,
        executor: E,
        assignment_id: Uuid,
    ) -> Result<Option<ReviewAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignment = sqlx::query_as::<_, ReviewAssignment>(
            "SELECT * FROM review_assignments WHERE id = $1 FOR UPDATE",
        )
        .bind(assignment_id)
        .fetch_optional(executor)
        .await?;
        Ok(assignment)
    }

    pub async fn find_reviewer_by_id<'e, E>(
        &self,
        executor: E,
        reviewer_id: Uuid,
    ) -> Result<Option<Reviewer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reviewer = sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE id = $1")
            .bind(reviewer_id)
            .fetch_optional(executor)
            .await?;
        Ok(reviewer)
    }

    // Atribuições do usuário logado (revisor vinculado a uma conta)
    pub async fn list_assignments_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<ReviewAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignments = sqlx::query_as::<_, ReviewAssignment>(
            r#"
            SELECT a.* FROM review_assignments a
            JOIN reviewers r ON r.id = a.reviewer_id
            WHERE r.user_id = $1
            ORDER BY a.completed ASC, a.due_date ASC NULLS LAST, a.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(assignments)
    }

    pub async fn mark_assignment_completed<'e, E>(
        &self,
        executor: E,
        assignment_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE review_assignments SET completed = TRUE WHERE id = $1")
            .bind(assignment_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_open_assignments<'e, E>(
        &self,
        executor: E,
        submission_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let open = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM review_assignments WHERE submission_id = $1 AND completed = FALSE",
        )
        .bind(submission_id)
        .fetch_one(executor)
        .await?;
        Ok(open)
    }

    // =========================================================================
    //  PARECERES
    // =========================================================================

    pub async fn create_review<'e, E>(
        &self,
        executor: E,
        assignment_id: Uuid,
        grade: i32,
        recommendation: ReviewRecommendation,
        opinion: &str,
    ) -> Result<Review, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (assignment_id, grade, recommendation, opinion)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(grade)
        .bind(recommendation)
        .bind(opinion)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::AssignmentAlreadyCompleted;
                }
            }
            e.into()
        })
    }
}
