// src/handlers/bookings.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{localize, ApiError, AppError},
    config::AppState,
    db::booking_repo::BookingFilter,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, Staff, TeacherOnly},
        tenancy::TenantContext,
    },
    models::scheduling::{
        BookingDetail, BookingStatus, CancellationResult, CheckinResult, CreateBookingPayload,
        StudentPresencePayload, UpdateBookingStatusPayload, VisitBooking, VisitingStudent,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub event_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

// =============================================================================
//  PROFESSOR
// =============================================================================

// POST /api/agendamentos
#[utoipa::path(
    post,
    path = "/api/agendamentos",
    tag = "Bookings",
    request_body = CreateBookingPayload,
    responses(
        (status = 201, description = "Visita agendada", body = BookingDetail),
        (status = 409, description = "Sem vagas, horário no passado ou professor bloqueado"),
        (status = 403, description = "Apenas professores agendam visitas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<TeacherOnly>,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .booking_service
        .create_booking(user.id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/agendamentos/meus
#[utoipa::path(
    get,
    path = "/api/agendamentos/meus",
    tag = "Bookings",
    responses((status = 200, description = "Agendamentos do professor logado", body = Vec<VisitBooking>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_bookings(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<TeacherOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = app_state
        .booking_service
        .list_teacher_bookings(user.id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/agendamentos/{booking_id}
#[utoipa::path(
    get,
    path = "/api/agendamentos/{booking_id}",
    tag = "Bookings",
    responses(
        (status = 200, description = "Agendamento com alunos e materiais", body = BookingDetail),
        (status = 404, description = "Agendamento não encontrado")
    ),
    params(("booking_id" = Uuid, Path, description = "ID do Agendamento")),
    security(("api_jwt" = []))
)]
pub async fn get_my_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<TeacherOnly>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .booking_service
        .teacher_booking_detail(user.id, booking_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// POST /api/agendamentos/{booking_id}/cancelar
#[utoipa::path(
    post,
    path = "/api/agendamentos/{booking_id}/cancelar",
    tag = "Bookings",
    responses(
        (status = 200, description = "Agendamento cancelado; traz o bloqueio se foi fora do prazo", body = CancellationResult),
        (status = 409, description = "Transição de status inválida")
    ),
    params(("booking_id" = Uuid, Path, description = "ID do Agendamento")),
    security(("api_jwt" = []))
)]
pub async fn cancel_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<TeacherOnly>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .booking_service
        .cancel_by_teacher(user.id, booking_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}

// GET /api/agendamentos/{booking_id}/qrcode
#[utoipa::path(
    get,
    path = "/api/agendamentos/{booking_id}/qrcode",
    tag = "Bookings",
    responses(
        (status = 200, description = "QR Code do check-in", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "Agendamento não encontrado ou sem vagas reservadas")
    ),
    params(("booking_id" = Uuid, Path, description = "ID do Agendamento")),
    security(("api_jwt" = []))
)]
pub async fn booking_qrcode(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<TeacherOnly>,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let png = app_state
        .booking_service
        .checkin_qrcode(user.id, booking_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"agendamento_{}.png\"", booking_id),
        ),
    ];

    Ok((headers, png).into_response())
}

// =============================================================================
//  EQUIPE DO CLIENTE
// =============================================================================

// GET /api/gestao/agendamentos
#[utoipa::path(
    get,
    path = "/api/gestao/agendamentos",
    tag = "Bookings",
    responses((status = 200, description = "Agendamentos do cliente", body = Vec<VisitBooking>)),
    params(
        BookingListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_bookings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Query(query): Query<BookingListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BookingFilter {
        event_id: query.event_id,
        status: query.status,
    };

    let bookings = app_state
        .booking_service
        .list_bookings(tenant.0, filter)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/gestao/agendamentos/{booking_id}
#[utoipa::path(
    get,
    path = "/api/gestao/agendamentos/{booking_id}",
    tag = "Bookings",
    responses(
        (status = 200, description = "Agendamento com alunos e materiais", body = BookingDetail),
        (status = 404, description = "Agendamento não encontrado")
    ),
    params(
        ("booking_id" = Uuid, Path, description = "ID do Agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .booking_service
        .booking_detail(tenant.0, booking_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PATCH /api/gestao/agendamentos/{booking_id}/status
#[utoipa::path(
    patch,
    path = "/api/gestao/agendamentos/{booking_id}/status",
    tag = "Bookings",
    request_body = UpdateBookingStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = VisitBooking),
        (status = 409, description = "Transição de status inválida")
    ),
    params(
        ("booking_id" = Uuid, Path, description = "ID do Agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_booking_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = app_state
        .booking_service
        .update_status(tenant.0, booking_id, payload.status)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(booking)))
}

// PATCH /api/gestao/agendamentos/{booking_id}/alunos/{student_id}/presenca
#[utoipa::path(
    patch,
    path = "/api/gestao/agendamentos/{booking_id}/alunos/{student_id}/presenca",
    tag = "Bookings",
    request_body = StudentPresencePayload,
    responses((status = 200, description = "Presença registrada", body = VisitingStudent)),
    params(
        ("booking_id" = Uuid, Path, description = "ID do Agendamento"),
        ("student_id" = Uuid, Path, description = "ID do Aluno"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_student_presence(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path((booking_id, student_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<StudentPresencePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let student = app_state
        .booking_service
        .set_student_presence(tenant.0, booking_id, student_id, payload.present)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(student)))
}

// POST /api/gestao/checkin/{token}
#[utoipa::path(
    post,
    path = "/api/gestao/checkin/{token}",
    tag = "Bookings",
    responses(
        (status = 200, description = "Check-in registrado (repetir o token devolve o mesmo registro)", body = CheckinResult),
        (status = 404, description = "Token desconhecido"),
        (status = 409, description = "Agendamento não está confirmado")
    ),
    params(
        ("token" = String, Path, description = "Token lido do QR Code"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn checkin(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .booking_service
        .checkin(tenant.0, &token)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}
