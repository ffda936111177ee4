// src/models/review.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "submission_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    UnderReview,
    Reviewed,
}

impl SubmissionStatus {
    /// Status depois de o trabalho ganhar uma atribuição aberta. Um trabalho
    /// já REVIEWED volta para UNDER_REVIEW. `None` quando nada muda.
    pub fn after_new_assignment(self) -> Option<SubmissionStatus> {
        (self != SubmissionStatus::UnderReview).then_some(SubmissionStatus::UnderReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[schema(example = "Ana Lima")]
    pub name: String,
    #[schema(example = "ana@universidade.br")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub abstract_text: Option<String>,
    #[schema(example = "Ensino de Ciências")]
    pub thematic_area: String,
    pub keywords: Vec<String>,
    #[schema(value_type = Vec<Author>)]
    pub authors: Json<Vec<Author>>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    #[schema(example = json!(["ensino de ciências", "astronomia"]))]
    pub areas: Vec<String>,
    #[schema(example = 5)]
    pub max_assignments: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assignment_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentKind {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAssignment {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    #[schema(example = 0.75)]
    pub score: f64,
    pub kind: AssignmentKind,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "review_recommendation", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewRecommendation {
    Accept,
    AcceptWithChanges,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub assignment_id: Uuid,
    #[schema(example = 8)]
    pub grade: i32,
    pub recommendation: ReviewRecommendation,
    pub opinion: String,
    pub created_at: DateTime<Utc>,
}

// Trabalho que ficou sem revisores suficientes na distribuição
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub submission_id: Uuid,
    pub missing_reviewers: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReport {
    pub created: Vec<ReviewAssignment>,
    pub pending: Vec<PendingSubmission>,
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionPayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    pub abstract_text: Option<String>,
    #[validate(length(min = 1, message = "A área temática é obrigatória."))]
    #[schema(example = "Ensino de Ciências")]
    pub thematic_area: String,
    #[serde(default)]
    #[schema(example = json!(["astronomia", "ensino médio"]))]
    pub keywords: Vec<String>,
    #[validate(length(min = 1, message = "Informe ao menos um autor."))]
    pub authors: Vec<Author>,
}

fn default_max_assignments() -> i32 {
    5
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewerPayload {
    #[validate(length(min = 1, message = "O nome do revisor é obrigatório."))]
    pub full_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default = "default_max_assignments")]
    #[validate(range(min = 1, message = "O limite de trabalhos deve ser positivo."))]
    pub max_assignments: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerStatusPayload {
    pub is_active: bool,
}

fn default_reviewers_per_submission() -> usize {
    2
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributePayload {
    #[serde(default = "default_reviewers_per_submission")]
    #[validate(range(min = 1, max = 10, message = "Use de 1 a 10 revisores por trabalho."))]
    #[schema(example = 2)]
    pub reviewers_per_submission: usize,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignmentPayload {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewPayload {
    #[validate(range(min = 0, max = 10, message = "A nota vai de 0 a 10."))]
    #[schema(example = 8)]
    pub grade: i32,
    pub recommendation: ReviewRecommendation,
    #[validate(length(min = 1, message = "O parecer é obrigatório."))]
    pub opinion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assignment_puts_submission_under_review() {
        assert_eq!(
            SubmissionStatus::Submitted.after_new_assignment(),
            Some(SubmissionStatus::UnderReview)
        );
        assert_eq!(SubmissionStatus::UnderReview.after_new_assignment(), None);
    }

    #[test]
    fn new_assignment_reopens_a_reviewed_submission() {
        assert_eq!(
            SubmissionStatus::Reviewed.after_new_assignment(),
            Some(SubmissionStatus::UnderReview)
        );
    }
}
