// src/handlers/blocks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::{localize, ApiError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, Staff},
        tenancy::TenantContext,
    },
    models::scheduling::TeacherBlock,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BlockListQuery {
    pub event_id: Option<Uuid>,
    /// Só bloqueios ainda em vigor
    #[serde(default)]
    pub only_active: bool,
}

// GET /api/gestao/bloqueios
#[utoipa::path(
    get,
    path = "/api/gestao/bloqueios",
    tag = "Blocks",
    responses((status = 200, description = "Bloqueios de professores", body = Vec<TeacherBlock>)),
    params(
        BlockListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_blocks(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Query(query): Query<BlockListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let blocks = app_state
        .booking_service
        .list_blocks(tenant.0, query.event_id, query.only_active)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(blocks)))
}

// POST /api/gestao/bloqueios/{block_id}/desbloquear
#[utoipa::path(
    post,
    path = "/api/gestao/bloqueios/{block_id}/desbloquear",
    tag = "Blocks",
    responses(
        (status = 200, description = "Bloqueio encerrado agora", body = TeacherBlock),
        (status = 404, description = "Bloqueio não encontrado")
    ),
    params(
        ("block_id" = Uuid, Path, description = "ID do Bloqueio"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn lift_block(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Path(block_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let block = app_state
        .booking_service
        .lift_block(tenant.0, block_id)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(block)))
}
