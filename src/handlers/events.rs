// src/handlers/events.rs

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
        i18n::Locale,
        rbac::{RequireRole, Staff},
        tenancy::TenantContext,
    },
    models::{
        events::{CreateEventPayload, Event, EventToggles},
        scheduling::{SchedulingSettings, SchedulingSettingsPayload},
    },
};

// GET /api/eventos/publicos
#[utoipa::path(
    get,
    path = "/api/eventos/publicos",
    tag = "Events",
    responses(
        (status = 200, description = "Eventos públicos que ainda não terminaram", body = Vec<Event>)
    )
)]
pub async fn list_public_events(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let events = app_state
        .event_service
        .list_public_events()
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(events)))
}

// POST /api/gestao/eventos
#[utoipa::path(
    post,
    path = "/api/gestao/eventos",
    tag = "Events",
    request_body = CreateEventPayload,
    responses(
        (status = 201, description = "Evento criado", body = Event),
        (status = 400, description = "Período inválido")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn create_event(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let event = app_state
        .event_service
        .create_event(tenant.0, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/gestao/eventos
#[utoipa::path(
    get,
    path = "/api/gestao/eventos",
    tag = "Events",
    responses((status = 200, description = "Eventos do cliente", body = Vec<Event>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn list_events(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
) -> Result<impl IntoResponse, ApiError> {
    let events = app_state
        .event_service
        .list_events(tenant.0)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(events)))
}

// GET /api/gestao/eventos/{event_id}
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}",
    tag = "Events",
    responses(
        (status = 200, description = "Evento", body = Event),
        (status = 404, description = "Evento não encontrado")
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_event(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = app_state
        .event_service
        .get_event(tenant.0, event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(event)))
}

// PATCH /api/gestao/eventos/{event_id}/toggles
#[utoipa::path(
    patch,
    path = "/api/gestao/eventos/{event_id}/toggles",
    tag = "Events",
    request_body = EventToggles,
    responses((status = 200, description = "Flags atualizadas", body = Event)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_toggles(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventToggles>,
) -> Result<impl IntoResponse, ApiError> {
    let event = app_state
        .event_service
        .update_toggles(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(event)))
}

// GET /api/gestao/eventos/{event_id}/configuracao
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/configuracao",
    tag = "Events",
    responses((status = 200, description = "Configuração de agendamento (ou o padrão)", body = SchedulingSettings)),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .event_service
        .get_settings(tenant.0, event_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/gestao/eventos/{event_id}/configuracao
#[utoipa::path(
    put,
    path = "/api/gestao/eventos/{event_id}/configuracao",
    tag = "Events",
    request_body = SchedulingSettingsPayload,
    responses(
        (status = 200, description = "Configuração salva", body = SchedulingSettings),
        (status = 400, description = "Janela ou dias da semana inválidos")
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<SchedulingSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let settings = app_state
        .event_service
        .update_settings(tenant.0, event_id, &payload)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}
