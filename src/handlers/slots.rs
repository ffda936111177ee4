// src/handlers/slots.rs

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
        rbac::{RequireRole, Staff},
        tenancy::TenantContext,
    },
    models::scheduling::{GenerateSlotsPayload, ResizeSlotPayload, SlotGenerationResult, VisitSlot},
};

// POST /api/gestao/eventos/{event_id}/horarios/gerar
#[utoipa::path(
    post,
    path = "/api/gestao/eventos/{event_id}/horarios/gerar",
    tag = "Slots",
    request_body = GenerateSlotsPayload,
    responses(
        (status = 201, description = "Horários criados e quantos foram pulados por sobreposição", body = SlotGenerationResult),
        (status = 400, description = "Período, janela, duração ou capacidade inválidos")
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_slots(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<GenerateSlotsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .scheduling_service
        .generate_slots(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(result)))
}

// GET /api/gestao/eventos/{event_id}/horarios
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/horarios",
    tag = "Slots",
    responses((status = 200, description = "Todos os horários do evento", body = Vec<VisitSlot>)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_slots(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let slots = app_state
        .scheduling_service
        .list_slots(tenant.0, event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(slots)))
}

// GET /api/eventos/{event_id}/horarios
#[utoipa::path(
    get,
    path = "/api/eventos/{event_id}/horarios",
    tag = "Slots",
    responses(
        (status = 200, description = "Horários futuros com vagas", body = Vec<VisitSlot>),
        (status = 404, description = "Evento não encontrado ou não público")
    ),
    params(("event_id" = Uuid, Path, description = "ID do Evento")),
    security(("api_jwt" = []))
)]
pub async fn list_open_slots(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let slots = app_state
        .scheduling_service
        .list_open_slots(event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(slots)))
}

// PATCH /api/gestao/horarios/{slot_id}/capacidade
#[utoipa::path(
    patch,
    path = "/api/gestao/horarios/{slot_id}/capacidade",
    tag = "Slots",
    request_body = ResizeSlotPayload,
    responses(
        (status = 200, description = "Capacidade ajustada", body = VisitSlot),
        (status = 400, description = "Nova capacidade menor que as vagas já ocupadas")
    ),
    params(
        ("slot_id" = Uuid, Path, description = "ID do Horário"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn resize_slot(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(slot_id): Path<Uuid>,
    Json(payload): Json<ResizeSlotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let slot = app_state
        .scheduling_service
        .resize_slot(tenant.0, slot_id, payload.total_capacity)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(slot)))
}

// DELETE /api/gestao/horarios/{slot_id}
#[utoipa::path(
    delete,
    path = "/api/gestao/horarios/{slot_id}",
    tag = "Slots",
    responses(
        (status = 204, description = "Horário removido"),
        (status = 409, description = "Horário ainda tem agendamentos ativos")
    ),
    params(
        ("slot_id" = Uuid, Path, description = "ID do Horário"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_slot(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(slot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .scheduling_service
        .remove_slot(tenant.0, slot_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
