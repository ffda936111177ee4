// src/handlers/reports.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, Staff},
        tenancy::TenantContext,
    },
    models::reports::{ReviewSummary, SchedulingSummary},
};

// GET /api/gestao/eventos/{event_id}/relatorios/agendamentos
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/relatorios/agendamentos",
    tag = "Reports",
    responses(
        (status = 200, description = "Ocupação, agendamentos por status e check-ins", body = SchedulingSummary)
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn scheduling_report(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .report_service
        .scheduling_summary(tenant.0, event_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/gestao/eventos/{event_id}/relatorios/revisao
#[utoipa::path(
    get,
    path = "/api/gestao/eventos/{event_id}/relatorios/revisao",
    tag = "Reports",
    responses(
        (status = 200, description = "Trabalhos por status, atribuições e carga dos revisores", body = ReviewSummary)
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do Evento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn review_report(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .report_service
        .review_summary(tenant.0, event_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}
