// src/handlers/review.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{localize, ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, ReviewerOnly, Staff},
        tenancy::TenantContext,
    },
    models::review::{
        CreateReviewerPayload, CreateSubmissionPayload, DistributePayload, DistributionReport,
        ManualAssignmentPayload, Review, ReviewAssignment, Reviewer, ReviewerStatusPayload,
        Submission, SubmitReviewPayload,
    },
};

// =============================================================================
//  TRABALHOS E REVISORES (EQUIPE)
// =============================================================================

// POST /api/gestao/eventos/{event_id}/submissoes
#[utoipa::path(
    post,
    path = "/api/gestao/eventos/{event_id}/submissoes",
    tag = "Review",
    request_body = CreateSubmissionPayload,
    responses((status = 201, description = "Trabalho registrado", body = Submission)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_submission(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CreateSubmissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let submission = app_state
        .review_service
        .create_submission(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(submission)))
}

// GET /api/gestao/eventos/{event_id}/submissoes
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/submissoes",
    tag = "Review",
    responses((status = 200, description = "Trabalhos do evento", body = Vec<Submission>)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_submissions(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let submissions = app_state
        .review_service
        .list_submissions(tenant.0, event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(submissions)))
}

// POST /api/gestao/eventos/{event_id}/revisores
#[utoipa::path(
    post,
    path = "/api/gestao/eventos/{event_id}/revisores",
    tag = "Review",
    request_body = CreateReviewerPayload,
    responses(
        (status = 201, description = "Revisor cadastrado", body = Reviewer),
        (status = 409, description = "E-mail já cadastrado no evento")
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reviewer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CreateReviewerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reviewer = app_state
        .review_service
        .create_reviewer(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(reviewer)))
}

// GET /api/gestao/eventos/{event_id}/revisores
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/revisores",
    tag = "Review",
    responses((status = 200, description = "Revisores do evento", body = Vec<Reviewer>)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_reviewers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reviewers = app_state
        .review_service
        .list_reviewers(tenant.0, event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(reviewers)))
}

// PATCH /api/gestao/revisores/{reviewer_id}/status
#[utoipa::path(
    patch,
    path = "/api/gestao/revisores/{reviewer_id}/status",
    tag = "Review",
    request_body = ReviewerStatusPayload,
    responses((status = 200, description = "Revisor ativado/desativado", body = Reviewer)),
    params(
        ("reviewer_id" = Uuid, Path, description = "ID do Revisor"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_reviewer_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(reviewer_id): Path<Uuid>,
    Json(payload): Json<ReviewerStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let reviewer = app_state
        .review_service
        .set_reviewer_active(tenant.0, reviewer_id, payload.is_active)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(reviewer)))
}

// =============================================================================
//  DISTRIBUIÇÃO
// =============================================================================

// POST /api/gestao/eventos/{event_id}/distribuicao
#[utoipa::path(
    post,
    path = "/api/gestao/eventos/{event_id}/distribuicao",
    tag = "Review",
    request_body = DistributePayload,
    responses((status = 200, description = "Atribuições criadas e trabalhos pendentes", body = DistributionReport)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn distribute(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<DistributePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .review_service
        .distribute(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// POST /api/gestao/atribuicoes
#[utoipa::path(
    post,
    path = "/api/gestao/atribuicoes",
    tag = "Review",
    request_body = ManualAssignmentPayload,
    responses(
        (status = 201, description = "Atribuição manual criada", body = ReviewAssignment),
        (status = 409, description = "Conflito de interesse, revisor sem capacidade ou par já existente")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn assign_manually(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Json(payload): Json<ManualAssignmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let assignment = app_state
        .review_service
        .assign_manually(tenant.0, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

// =============================================================================
//  REVISOR
// =============================================================================

// GET /api/revisao/minhas-atribuicoes
#[utoipa::path(
    get,
    path = "/api/revisao/minhas-atribuicoes",
    tag = "Review",
    responses((status = 200, description = "Atribuições do revisor logado", body = Vec<ReviewAssignment>)),
    security(("api_jwt" = []))
)]
pub async fn my_assignments(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ReviewerOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let assignments = app_state
        .review_service
        .my_assignments(user.id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(assignments)))
}

// POST /api/revisao/atribuicoes/{assignment_id}/review
#[utoipa::path(
    post,
    path = "/api/revisao/atribuicoes/{assignment_id}/review",
    tag = "Review",
    request_body = SubmitReviewPayload,
    responses(
        (status = 201, description = "Parecer registrado", body = Review),
        (status = 409, description = "Atribuição já concluída")
    ),
    params(("assignment_id" = Uuid, Path, description = "ID da Atribuição")),
    security(("api_jwt" = []))
)]
pub async fn submit_review(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ReviewerOnly>,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let review = app_state
        .review_service
        .submit_review(user.id, assignment_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(review)))
}
